use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::error::{MurmurError, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1:4000";
pub const DEFAULT_DATA_DIR: &str = ".murmur";
pub const DEFAULT_JWT_ISSUER: &str = "murmur";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_UPLOAD_URL_PREFIX: &str = "/uploads";

/// Server configuration, read from the environment (and `.env` if present)
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    /// HS256 secret for bearer tokens. Required to serve or mint tokens.
    pub jwt_secret: Option<String>,
    pub jwt_issuer: String,
    pub max_upload_bytes: usize,
    pub upload_url_prefix: String,
    /// Empty means any origin may call the API
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();

        Ok(Self {
            bind: parse_var("MURMUR_BIND", DEFAULT_BIND)?,
            data_dir: PathBuf::from(
                var("MURMUR_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            jwt_secret: var("JWT_SECRET"),
            jwt_issuer: var("MURMUR_JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string()),
            max_upload_bytes: parse_var(
                "MURMUR_MAX_UPLOAD_BYTES",
                &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
            )?,
            upload_url_prefix: var("MURMUR_UPLOAD_URL_PREFIX")
                .unwrap_or_else(|| DEFAULT_UPLOAD_URL_PREFIX.to_string()),
            allowed_origins: var("MURMUR_ALLOWED_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
        })
    }

    /// Defaults with the given secret; handy for tests and embedding.
    pub fn with_secret(data_dir: impl Into<PathBuf>, jwt_secret: impl Into<String>) -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 4000)),
            data_dir: data_dir.into(),
            jwt_secret: Some(jwt_secret.into()),
            jwt_issuer: DEFAULT_JWT_ISSUER.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_url_prefix: DEFAULT_UPLOAD_URL_PREFIX.to_string(),
            allowed_origins: Vec::new(),
        }
    }

    pub fn require_secret(&self) -> Result<&str> {
        self.jwt_secret
            .as_deref()
            .ok_or_else(|| MurmurError::Config("JWT_SECRET must be set".to_string()))
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse_value(key, &raw)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| MurmurError::Config(format!("Invalid {key} value '{raw}': {e}")))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_secret_defaults() {
        let config = Config::with_secret("/tmp/murmur", "s3cret");
        assert_eq!(config.bind.port(), 4000);
        assert_eq!(config.require_secret().unwrap(), "s3cret");
        assert_eq!(config.uploads_dir(), PathBuf::from("/tmp/murmur/uploads"));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let mut config = Config::with_secret("/tmp/murmur", "x");
        config.jwt_secret = None;
        assert!(matches!(config.require_secret(), Err(MurmurError::Config(_))));
    }

    #[test]
    fn test_parse_value() {
        let port: u16 = parse_value("PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);

        let bad = parse_value::<usize>("MURMUR_MAX_UPLOAD_BYTES", "lots");
        assert!(matches!(bad, Err(MurmurError::Config(m)) if m.contains("MURMUR_MAX_UPLOAD_BYTES")));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list("http://a.test, ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_list("").is_empty());
    }
}
