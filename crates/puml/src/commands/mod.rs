//! CLI command implementations.

pub(crate) mod decode;
pub(crate) mod encode;
pub(crate) mod generate;

pub(crate) use decode::DecodeArgs;
pub(crate) use encode::EncodeArgs;
pub(crate) use generate::GenerateArgs;

use puml_diagrams::DiagramFormat;

/// Parse a `--format` value.
fn parse_format(value: &str) -> Result<DiagramFormat, String> {
    DiagramFormat::parse(value).ok_or_else(|| format!("unknown format '{value}' (svg, png)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("svg"), Ok(DiagramFormat::Svg));
        assert_eq!(parse_format("png"), Ok(DiagramFormat::Png));
        assert!(parse_format("pdf").unwrap_err().contains("pdf"));
    }
}
