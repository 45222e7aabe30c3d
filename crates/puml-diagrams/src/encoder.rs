//! `PlantUML` text encoding for server URLs.
//!
//! A `PlantUML` server addresses a diagram by its source text, compressed and
//! packed into a URL-safe alphabet:
//!
//! 1. The source is trimmed and wrapped in `@startuml` / `@enduml` if needed
//! 2. The bytes are compressed as a raw DEFLATE stream at the best level
//! 3. The compressed bytes are packed six bits at a time, most significant bit
//!    first, into the alphabet `0-9A-Za-z-_`
//!
//! Unlike standard base64 there is no padding: trailing bits are shifted into
//! one final zero-filled symbol.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use crate::consts::{END_MARKER, START_MARKER};

/// Symbols in value order.
const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

/// Error decoding an encoded diagram back to text.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A character outside the encoding alphabet.
    #[error("invalid character '{ch}' at position {position}")]
    InvalidSymbol { ch: char, position: usize },
    /// The unpacked bytes are not a valid DEFLATE stream of UTF-8 text.
    #[error("failed to inflate diagram: {0}")]
    Inflate(#[from] io::Error),
}

/// Trim the source and wrap it in start/end markers when absent.
#[must_use]
pub fn normalize(source: &str) -> String {
    let text = source.trim();
    let mut result = String::with_capacity(text.len() + START_MARKER.len() + END_MARKER.len() + 2);

    if !text.starts_with(START_MARKER) {
        result.push_str(START_MARKER);
        result.push('\n');
    }
    result.push_str(text);
    if !text.ends_with(END_MARKER) {
        result.push('\n');
        result.push_str(END_MARKER);
    }

    result
}

/// Encode diagram source into the identifier used in server URLs.
///
/// Total for any input, including the empty string. The resolver and CLI
/// call [`try_encode`] instead.
///
/// # Panics
///
/// Only if the DEFLATE compressor reports an error while writing into a
/// `Vec`, which has no I/O failure mode.
#[must_use]
pub fn encode(source: &str) -> String {
    try_encode(source).expect("in-memory DEFLATE cannot fail")
}

/// Fallible form of [`encode`].
///
/// Compression writes into memory, so an error here means the compressor
/// itself misbehaved.
pub fn try_encode(source: &str) -> io::Result<String> {
    let normalized = normalize(source);
    let compressed = deflate(normalized.as_bytes())?;
    Ok(encode64(&compressed))
}

/// Decode a server identifier back into diagram text.
///
/// Inverse of [`encode`]: the result is the normalized source.
pub fn decode(encoded: &str) -> Result<String, DecodeError> {
    let compressed = decode64(encoded)?;
    let mut text = String::new();
    DeflateDecoder::new(compressed.as_slice()).read_to_string(&mut text)?;
    Ok(text)
}

fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len()), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Pack bytes into the six-bit alphabet.
#[must_use]
pub fn encode64(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 4 / 3 + 1);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 6 {
            bits -= 6;
            result.push(symbol(buffer >> bits));
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        result.push(symbol(buffer << (6 - bits)));
    }

    result
}

/// Unpack six-bit symbols into bytes, dropping the zero fill of the last symbol.
pub fn decode64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let mut result = Vec::with_capacity(encoded.len() * 3 / 4);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for (position, ch) in encoded.chars().enumerate() {
        let value = symbol_value(ch).ok_or(DecodeError::InvalidSymbol { ch, position })?;
        buffer = (buffer << 6) | value;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            // Masked to eight bits above
            #[allow(clippy::cast_possible_truncation)]
            result.push(((buffer >> bits) & 0xFF) as u8);
        }
        buffer &= (1 << bits) - 1;
    }

    Ok(result)
}

fn symbol(value: u32) -> char {
    char::from(ALPHABET[(value & 0x3F) as usize])
}

fn symbol_value(ch: char) -> Option<u32> {
    let value = match ch {
        '0'..='9' => u32::from(ch) - u32::from('0'),
        'A'..='Z' => u32::from(ch) - u32::from('A') + 10,
        'a'..='z' => u32::from(ch) - u32::from('a') + 36,
        '-' => 62,
        '_' => 63,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_wraps_plain_source() {
        assert_eq!(
            normalize(" Alice -> Bob: hi "),
            "@startuml\nAlice -> Bob: hi\n@enduml"
        );
    }

    #[test]
    fn test_normalize_keeps_existing_markers() {
        let source = "@startuml\nAlice -> Bob\n@enduml";
        assert_eq!(normalize(source), source);
        assert_eq!(normalize(&format!("\n\n{source}\n  ")), source);
    }

    #[test]
    fn test_normalize_adds_missing_end_marker() {
        assert_eq!(normalize("@startuml\nA -> B"), "@startuml\nA -> B\n@enduml");
    }

    #[test]
    fn test_normalize_adds_missing_start_marker() {
        assert_eq!(normalize("A -> B\n@enduml"), "@startuml\nA -> B\n@enduml");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "@startuml\n\n@enduml");
        assert_eq!(normalize("  \n\t"), "@startuml\n\n@enduml");
    }

    #[test]
    fn test_encode64_full_groups() {
        // 0x000000 -> four zero symbols, 0xFFFFFF -> four '_'
        assert_eq!(encode64(&[0, 0, 0]), "0000");
        assert_eq!(encode64(&[0xFF, 0xFF, 0xFF]), "____");
    }

    #[test]
    fn test_encode64_trailing_bits_are_zero_filled() {
        // 0xFF = 111111|11 -> '_' then 11 shifted to 110000 = 48 = 'm'
        assert_eq!(encode64(&[0xFF]), "_m");
        // 0xFF 0xFF = 111111|111111|1111 -> "__" then 111100 = 60 = 'y'
        assert_eq!(encode64(&[0xFF, 0xFF]), "__y");
        // 0x04 = 000001|00 -> '1' then '0'
        assert_eq!(encode64(&[0x04]), "10");
    }

    #[test]
    fn test_encode64_msb_first() {
        // 0x10 0x83 0x10 = 000100|001000|001100|010000
        assert_eq!(encode64(&[0x10, 0x83, 0x10]), "48CG");
    }

    #[test]
    fn test_encode64_empty() {
        assert_eq!(encode64(&[]), "");
    }

    #[test]
    fn test_encode64_length_has_no_padding() {
        for len in 0..10 {
            let data = vec![0xA5; len];
            assert_eq!(encode64(&data).len(), (len * 8).div_ceil(6));
        }
    }

    #[test]
    fn test_decode64_inverts_encode64() {
        for len in 0..32 {
            let data: Vec<u8> = (0..len).map(|i| (i * 37 + 11) as u8).collect();
            assert_eq!(decode64(&encode64(&data)).unwrap(), data);
        }
    }

    #[test]
    fn test_decode64_rejects_foreign_symbols() {
        let err = decode64("ab+c").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidSymbol {
                ch: '+',
                position: 2
            }
        ));
    }

    #[test]
    fn test_encode_uses_url_safe_alphabet() {
        let encoded = encode("Alice -> Bob: hello\nBob --> Alice: ok");
        assert!(!encoded.is_empty());
        assert!(
            encoded
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );
    }

    #[test]
    fn test_encode_is_deterministic() {
        let source = "class Foo\nclass Bar\nFoo <|-- Bar";
        assert_eq!(encode(source), encode(source));
    }

    #[test]
    fn test_encode_ignores_surrounding_whitespace() {
        assert_eq!(encode("  A -> B \n"), encode("A -> B"));
        assert_eq!(encode("A -> B"), encode("@startuml\nA -> B\n@enduml"));
    }

    #[test]
    fn test_round_trip() {
        let sources = [
            "",
            " Alice -> Bob: hi ",
            "@startuml\nAlice -> Bob\n@enduml",
            "@startuml\nonly start",
            "only end\n@enduml",
            "participant \"Ünïcödé\" as U\nU -> U: ✓",
            "title Long\n' comment\nA -> B: {json: [1, 2, 3]}\nnote left: <b>bold</b>",
        ];

        for source in sources {
            let decoded = decode(&encode(source)).unwrap();
            assert_eq!(decoded, normalize(source), "round trip of {source:?}");
        }
    }

    #[test]
    fn test_round_trip_large_input() {
        let source: String = (0..500).map(|i| format!("A{i} -> B{i}: msg {i}\n")).collect();
        assert_eq!(decode(&encode(&source)).unwrap(), normalize(&source));
    }

    #[test]
    fn test_decode_rejects_garbage_stream() {
        // Valid symbols, but not a DEFLATE stream
        assert!(matches!(decode("____"), Err(DecodeError::Inflate(_))));
    }

    #[test]
    fn test_try_encode_matches_encode() {
        assert_eq!(try_encode("A -> B").unwrap(), encode("A -> B"));
    }
}
