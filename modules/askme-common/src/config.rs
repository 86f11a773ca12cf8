use std::env;

use crate::AskmeError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Fails with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Result<Self, AskmeError> {
        Ok(Self {
            neo4j_uri: required_env("NEO4J_URI")?,
            neo4j_user: required_env("NEO4J_USER")?,
            neo4j_password: required_env("NEO4J_PASSWORD")?,
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parse_port(env::var("WEB_PORT").ok().as_deref())?,
        })
    }
}

fn required_env(key: &str) -> Result<String, AskmeError> {
    env::var(key).map_err(|_| AskmeError::Config(format!("{key} environment variable is required")))
}

fn parse_port(raw: Option<&str>) -> Result<u16, AskmeError> {
    match raw {
        None => Ok(8080),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AskmeError::Config(format!("WEB_PORT must be a number, got {value:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_to_8080() {
        assert_eq!(parse_port(None).unwrap(), 8080);
    }

    #[test]
    fn port_parses_trimmed_value() {
        assert_eq!(parse_port(Some(" 3000 ")).unwrap(), 3000);
    }

    #[test]
    fn non_numeric_port_is_a_config_error() {
        let err = parse_port(Some("eighty")).unwrap_err();
        assert!(matches!(err, AskmeError::Config(_)));
        assert!(err.to_string().contains("WEB_PORT"));
    }
}
