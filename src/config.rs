use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::DEFAULT_TTL_SECS;
use crate::error::{Result, UsersError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

const BASE_URL_ENV: &str = "USERS_API_URL";
const TIMEOUT_ENV: &str = "USERS_TIMEOUT_SECS";

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| UsersError::ConfigRead {
                path: config_path.clone(),
                source: e,
            })?;

        Self::parse(&contents).map_err(|e| UsersError::ConfigParse {
            path: config_path,
            source: e,
        })
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "users")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(UsersError::NoConfigDir)
    }

    pub fn cache_path() -> Result<PathBuf> {
        Self::config_path().map(|p| p.with_file_name("cache.json"))
    }

    /// Resolve the API base URL: explicit flag, then env var, then config
    /// file, then the default.
    pub fn base_url(&self, explicit: Option<&str>) -> Result<Url> {
        let raw = explicit
            .map(String::from)
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        parse_base_url(&raw)
    }

    /// Resolve the request timeout with the same precedence as the base URL.
    pub fn timeout(&self, explicit: Option<u64>) -> Result<Duration> {
        let secs = match explicit {
            Some(secs) => secs,
            None => match std::env::var(TIMEOUT_ENV) {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| UsersError::InvalidTimeout(raw.clone()))?,
                Err(_) => self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
        };

        if secs == 0 {
            return Err(UsersError::InvalidTimeout(secs.to_string()));
        }
        Ok(Duration::from_secs(secs))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_TTL_SECS))
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|_| UsersError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(UsersError::InvalidUrl(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
base_url = "http://api.example.com"
timeout_secs = 10
cache_ttl_secs = 60
"#,
        )
        .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://api.example.com"));
        assert_eq!(config.timeout_secs, Some(10));
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache_ttl(), Duration::from_secs(DEFAULT_TTL_SECS));
    }

    #[test]
    fn test_parse_bad_type() {
        assert!(Config::parse("timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = Config {
            base_url: Some("http://from-file:1".into()),
            ..Default::default()
        };
        let url = config.base_url(Some("http://from-flag:2")).unwrap();
        assert_eq!(url.as_str(), "http://from-flag:2/");
    }

    #[test]
    fn test_explicit_timeout_wins() {
        let config = Config {
            timeout_secs: Some(30),
            ..Default::default()
        };
        assert_eq!(config.timeout(Some(2)).unwrap(), Duration::from_secs(2));
    }

    // The only test that reads or writes these env vars
    #[test]
    fn test_env_precedence() {
        let config = Config {
            base_url: Some("http://from-file:1".into()),
            timeout_secs: Some(30),
            cache_ttl_secs: None,
        };

        std::env::set_var(BASE_URL_ENV, "http://from-env:3");
        std::env::set_var(TIMEOUT_ENV, "12");

        assert_eq!(config.base_url(None).unwrap().as_str(), "http://from-env:3/");
        assert_eq!(config.timeout(None).unwrap(), Duration::from_secs(12));
        assert_eq!(
            config.base_url(Some("http://from-flag:2")).unwrap().as_str(),
            "http://from-flag:2/"
        );
        assert_eq!(config.timeout(Some(4)).unwrap(), Duration::from_secs(4));

        std::env::set_var(TIMEOUT_ENV, "soon");
        assert!(matches!(
            config.timeout(None),
            Err(UsersError::InvalidTimeout(raw)) if raw == "soon"
        ));

        std::env::remove_var(BASE_URL_ENV);
        std::env::remove_var(TIMEOUT_ENV);

        assert_eq!(config.base_url(None).unwrap().as_str(), "http://from-file:1/");
        assert_eq!(config.timeout(None).unwrap(), Duration::from_secs(30));
        assert_eq!(
            Config::default().base_url(None).unwrap().as_str(),
            "http://localhost:5000/"
        );
        assert_eq!(
            Config::default().timeout(None).unwrap(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config::default();
        assert!(matches!(
            config.timeout(Some(0)),
            Err(UsersError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_parse_base_url() {
        assert!(parse_base_url("http://localhost:5000").is_ok());
        assert!(parse_base_url("https://example.com/api/").is_ok());
        assert!(matches!(
            parse_base_url("ftp://example.com"),
            Err(UsersError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_base_url("not a url"),
            Err(UsersError::InvalidUrl(_))
        ));
    }
}
