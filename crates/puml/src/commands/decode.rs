//! `puml decode` command implementation.

use clap::Args;
use puml_diagrams::decode;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the decode command.
#[derive(Args)]
pub(crate) struct DecodeArgs {
    /// Encoded diagram text, or a full diagram URL.
    encoded: String,
}

impl DecodeArgs {
    /// Execute the decode command.
    ///
    /// Prints the normalized diagram source.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid encoding.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let source = decode(encoded_part(&self.encoded))?;
        Output::new().result(&source);
        Ok(())
    }
}

/// Last path segment of a URL, or the input itself.
fn encoded_part(input: &str) -> &str {
    let trimmed = input.trim().trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_part_plain() {
        assert_eq!(
            encoded_part("  SyfFKj2rKt3CoKnELR1Io4ZDoSa70000\n"),
            "SyfFKj2rKt3CoKnELR1Io4ZDoSa70000"
        );
    }

    #[test]
    fn test_encoded_part_from_url() {
        assert_eq!(
            encoded_part("https://www.plantuml.com/plantuml/svg/SyfFKj2rKt3CoKnELR1Io4ZDoSa70000"),
            "SyfFKj2rKt3CoKnELR1Io4ZDoSa70000"
        );
    }

    #[test]
    fn test_decoded_source_round_trips() {
        let encoded = puml_diagrams::encode("Alice -> Bob: hi");
        let url = format!("http://localhost:8080/svg/{encoded}");
        assert_eq!(
            decode(encoded_part(&url)).unwrap(),
            "@startuml\nAlice -> Bob: hi\n@enduml"
        );
    }
}
