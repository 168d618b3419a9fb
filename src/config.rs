//! Connection settings.

use crate::error::{Error, Result};

/// Checked in order; the first non-empty value wins.
pub const DATABASE_URL_VARS: [&str; 2] = ["NETLIFY_DATABASE_URL", "DATABASE_URL"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
}

impl DbConfig {
    /// `--database-url` first, then the environment.
    pub fn resolve(flag: Option<&str>) -> Result<Self> {
        Self::resolve_with(flag, |name| std::env::var(name).ok())
    }

    pub fn resolve_with<F>(flag: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = || {
            DATABASE_URL_VARS
                .iter()
                .filter_map(|name| lookup(*name))
                .find(|v| !v.trim().is_empty())
        };

        flag.map(str::to_string)
            .filter(|v| !v.trim().is_empty())
            .or_else(from_env)
            .map(|url| DbConfig { url: url.trim().to_string() })
            .ok_or(Error::MissingDatabaseUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_flag_wins() {
        let lookup = env(&[("DATABASE_URL", "postgres://env/db")]);
        let config = DbConfig::resolve_with(Some("postgres://flag/db"), lookup).unwrap();
        assert_eq!(config.url, "postgres://flag/db");
    }

    #[test]
    fn test_netlify_url_takes_precedence() {
        let lookup = env(&[
            ("DATABASE_URL", "postgres://local/db"),
            ("NETLIFY_DATABASE_URL", "postgres://netlify/db"),
        ]);
        let config = DbConfig::resolve_with(None, lookup).unwrap();
        assert_eq!(config.url, "postgres://netlify/db");
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let lookup = env(&[("NETLIFY_DATABASE_URL", "  "), ("DATABASE_URL", "postgres://local/db")]);
        let config = DbConfig::resolve_with(Some(""), lookup).unwrap();
        assert_eq!(config.url, "postgres://local/db");
    }

    #[test]
    fn test_missing_url() {
        assert!(matches!(
            DbConfig::resolve_with(None, env(&[])),
            Err(Error::MissingDatabaseUrl)
        ));
    }
}
