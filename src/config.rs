use std::fmt;
use std::path::PathBuf;

use teloxide::types::UserId;

const DEFAULT_DATABASE_URL: &str = "sqlite://quipbot.db";
const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is not set.
    Missing(&'static str),
    /// A variable is set but cannot be parsed.
    Invalid { var: &'static str, value: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "environment variable {var} is required"),
            Self::Invalid { var, value } => {
                write!(f, "environment variable {var} has an invalid value '{value}'")
            }
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Which text-generation backend answers `/ask` and `/translate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextGenProvider {
    Gemini { api_key: String },
    OpenRouter { api_key: String },
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// The single identifier allowed to run admin commands.
    pub admin_id: Option<UserId>,
    pub database_url: String,
    pub textgen: TextGenProvider,
    /// Model override; each provider has its own default.
    pub textgen_model: Option<String>,
    /// Port of the liveness endpoint.
    pub port: u16,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "BOT_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let admin_id = match get("ADMIN_ID") {
            Some(raw) => Some(UserId(raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: "ADMIN_ID",
                value: raw.clone(),
            })?)),
            None => None,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let textgen = if let Some(api_key) = get("GEMINI_API_KEY") {
            TextGenProvider::Gemini { api_key }
        } else if let Some(api_key) = get("OPENROUTER_API_KEY") {
            TextGenProvider::OpenRouter { api_key }
        } else {
            TextGenProvider::Disabled
        };

        Ok(Self {
            bot_token,
            admin_id,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            textgen,
            textgen_model: get("TEXTGEN_MODEL"),
            port,
            log_dir: get("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz";

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    fn assert_err(result: Result<Config, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&[("BOT_TOKEN", TOKEN)]).expect("should load minimal config");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite://quipbot.db");
        assert_eq!(config.admin_id, None);
        assert_eq!(config.textgen, TextGenProvider::Disabled);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_missing_token() {
        let err = assert_err(load(&[("ADMIN_ID", "42")]));
        assert!(matches!(err, ConfigError::Missing("BOT_TOKEN")));
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let err = assert_err(load(&[("BOT_TOKEN", "   ")]));
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["no_colon", "notanumber:ABC", "123456789:"] {
            let err = assert_err(load(&[("BOT_TOKEN", token)]));
            assert!(matches!(err, ConfigError::Validation(_)), "token {token}");
        }
    }

    #[test]
    fn test_admin_and_port() {
        let config = load(&[("BOT_TOKEN", TOKEN), ("ADMIN_ID", "777"), ("PORT", "3000")]).unwrap();
        assert_eq!(config.admin_id, Some(UserId(777)));
        assert_eq!(config.port, 3000);
        assert_eq!(config.admin_id, Some(UserId(777)));
    }

    #[test]
    fn test_invalid_admin_id() {
        let err = assert_err(load(&[("BOT_TOKEN", TOKEN), ("ADMIN_ID", "alice")]));
        assert!(matches!(err, ConfigError::Invalid { var: "ADMIN_ID", .. }));
    }

    #[test]
    fn test_invalid_port() {
        let err = assert_err(load(&[("BOT_TOKEN", TOKEN), ("PORT", "99999")]));
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn test_gemini_preferred_over_openrouter() {
        let config = load(&[
            ("BOT_TOKEN", TOKEN),
            ("GEMINI_API_KEY", "g-key"),
            ("OPENROUTER_API_KEY", "or-key"),
        ])
        .unwrap();
        assert_eq!(config.textgen, TextGenProvider::Gemini { api_key: "g-key".into() });

        let config = load(&[("BOT_TOKEN", TOKEN), ("OPENROUTER_API_KEY", "or-key")]).unwrap();
        assert_eq!(config.textgen, TextGenProvider::OpenRouter { api_key: "or-key".into() });
    }

    #[test]
    fn test_admin_is_optional() {
        let config = load(&[("BOT_TOKEN", TOKEN)]).unwrap();
        assert_eq!(config.admin_id, None);
    }
}
