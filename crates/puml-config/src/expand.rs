//! Environment references in `server.url`.
//!
//! A `puml.toml` checked into a docs repository usually points at a
//! `PlantUML` server that differs between laptops and CI, so the URL may read
//! `http://${PLANTUML_HOST:-localhost:8080}/svg/`. An unset variable without a
//! fallback fails config loading with [`ConfigError::EnvVar`] naming the field.
//!
//! URLs without `${` are returned untouched, so a literal `$` in a plain URL
//! needs no escaping.

use crate::ConfigError;

/// Name of a variable that was referenced but not set.
struct Unset {
    var: String,
}

/// Expand `${...}` references in `value`, reporting failures against `field`.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let lookup = |var: &str| -> Result<Option<String>, Unset> {
        std::env::var(var).map(Some).map_err(|_| Unset {
            var: var.to_owned(),
        })
    };

    shellexpand::env_with_context(value, lookup)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.cause.var),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_server_url_from_env() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("PUML_TEST_SERVER_HOST", "uml.internal:8080");
        }
        let result = expand_env("http://${PUML_TEST_SERVER_HOST}/svg/", "server.url").unwrap();
        assert_eq!(result, "http://uml.internal:8080/svg/");
        unsafe {
            std::env::remove_var("PUML_TEST_SERVER_HOST");
        }
    }

    #[test]
    fn test_expand_fallback_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PUML_TEST_UNSET_SERVER");
        }
        let result = expand_env(
            "${PUML_TEST_UNSET_SERVER:-http://localhost:8080/svg/}",
            "server.url",
        )
        .unwrap();
        assert_eq!(result, "http://localhost:8080/svg/");
    }

    #[test]
    fn test_expand_value_wins_over_fallback() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("PUML_TEST_SET_SERVER", "https://a.example/");
        }
        let result = expand_env("${PUML_TEST_SET_SERVER:-https://b.example/}", "server.url").unwrap();
        assert_eq!(result, "https://a.example/");
        unsafe {
            std::env::remove_var("PUML_TEST_SET_SERVER");
        }
    }

    #[test]
    fn test_expand_unset_is_error() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PUML_TEST_MISSING");
        }
        let err = expand_env("${PUML_TEST_MISSING}", "server.url").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let msg = err.to_string();
        assert!(msg.contains("PUML_TEST_MISSING"));
        assert!(msg.contains("server.url"));
    }

    #[test]
    fn test_fallback_host_inside_url() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PUML_TEST_PLANTUML_HOST");
        }
        let result = expand_env(
            "http://${PUML_TEST_PLANTUML_HOST:-localhost:8080}/svg/",
            "server.url",
        )
        .unwrap();
        assert_eq!(result, "http://localhost:8080/svg/");
    }

    #[test]
    fn test_bare_dollar_left_alone() {
        let result = expand_env("https://example.com/$svg/", "server.url").unwrap();
        assert_eq!(result, "https://example.com/$svg/");
    }
}
