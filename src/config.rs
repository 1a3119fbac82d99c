//! Runtime configuration, read from environment variables.

use crate::history::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_DIR: &str = "database";
const DEFAULT_SMTP_PORT: u16 = 465;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    NotANumber { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// SMTP settings. Mail is disabled when `SMTP_HOST` is unset.
#[derive(Debug, Clone, PartialEq)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender mailbox, e.g. `Calculator <noreply@example.com>`
    pub from: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub database_dir: PathBuf,
    pub history_page_size: usize,
    pub mail: Option<MailConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_dir: PathBuf::from(DEFAULT_DATABASE_DIR),
            history_page_size: DEFAULT_PAGE_SIZE,
            mail: None,
        }
    }
}

impl Config {
    /// Reads the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CALC_BIND_ADDR` | `127.0.0.1:3000` |
    /// | `CALC_DATABASE_DIR` | `database` |
    /// | `CALC_HISTORY_PAGE_SIZE` | `10` |
    /// | `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` | mail disabled |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let history_page_size = match lookup("CALC_HISTORY_PAGE_SIZE") {
            Some(value) => {
                let size = parse_number::<usize>("CALC_HISTORY_PAGE_SIZE", &value)?;
                if size == 0 {
                    return Err(ConfigError::Zero("CALC_HISTORY_PAGE_SIZE"));
                }
                size
            }
            None => defaults.history_page_size,
        };

        let mail = match lookup("SMTP_HOST").filter(|host| !host.is_empty()) {
            Some(host) => {
                let port = match lookup("SMTP_PORT") {
                    Some(value) => parse_number::<u16>("SMTP_PORT", &value)?,
                    None => DEFAULT_SMTP_PORT,
                };
                let username = lookup("SMTP_USERNAME").unwrap_or_default();
                let from = lookup("SMTP_FROM").unwrap_or_else(|| username.clone());
                Some(MailConfig {
                    host,
                    port,
                    username,
                    password: lookup("SMTP_PASSWORD").unwrap_or_default(),
                    from,
                })
            }
            None => None,
        };

        Ok(Config {
            bind_addr: lookup("CALC_BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_dir: lookup("CALC_DATABASE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_dir),
            history_page_size,
            mail,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::NotANumber {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert!(config.mail.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CALC_BIND_ADDR", "0.0.0.0:8080"),
            ("CALC_DATABASE_DIR", "/tmp/calc"),
            ("CALC_HISTORY_PAGE_SIZE", "25"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "calc@example.com"),
            ("SMTP_PASSWORD", "secret"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.database_dir, PathBuf::from("/tmp/calc"));
        assert_eq!(config.history_page_size, 25);

        let mail = config.mail.unwrap();
        assert_eq!(mail.port, 465);
        assert_eq!(mail.from, "calc@example.com");
    }

    #[test]
    fn test_bad_numbers() {
        let err = config_from(&[("CALC_HISTORY_PAGE_SIZE", "ten")]);
        assert!(matches!(err, Err(ConfigError::NotANumber { .. })));

        let err = config_from(&[("CALC_HISTORY_PAGE_SIZE", "0")]);
        assert!(matches!(err, Err(ConfigError::Zero(_))));

        let err = config_from(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "99999"),
        ]);
        assert!(matches!(err, Err(ConfigError::NotANumber { .. })));
    }
}
