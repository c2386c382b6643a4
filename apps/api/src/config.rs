use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub scryfall_api_url: String,
    pub scryfall_user_agent: String,
    /// Pause after each fresh Scryfall lookup (Scryfall asks for 50–100ms).
    pub scryfall_delay_ms: u64,
    pub lookup_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub jpeg_quality: u8,
    /// Upper bound on card copies after quantities are expanded.
    pub max_deck_copies: usize,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            rust_log: "info".to_string(),
            scryfall_api_url: "https://api.scryfall.com".to_string(),
            scryfall_user_agent: "ProxyForge/2.0".to_string(),
            scryfall_delay_ms: 80,
            lookup_timeout_secs: 10,
            download_timeout_secs: 15,
            jpeg_quality: 90,
            max_deck_copies: 500,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let config = Config {
            port: env_or("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            scryfall_api_url: std::env::var("SCRYFALL_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.scryfall_api_url),
            scryfall_user_agent: std::env::var("SCRYFALL_USER_AGENT")
                .unwrap_or(defaults.scryfall_user_agent),
            scryfall_delay_ms: env_or("SCRYFALL_DELAY_MS", defaults.scryfall_delay_ms)?,
            lookup_timeout_secs: env_or("LOOKUP_TIMEOUT_SECS", defaults.lookup_timeout_secs)?,
            download_timeout_secs: env_or("DOWNLOAD_TIMEOUT_SECS", defaults.download_timeout_secs)?,
            jpeg_quality: env_or("JPEG_QUALITY", defaults.jpeg_quality)?,
            max_deck_copies: env_or("MAX_DECK_COPIES", defaults.max_deck_copies)?,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!("JPEG_QUALITY must be between 1 and 100");
        }
        if self.max_deck_copies == 0 {
            bail!("MAX_DECK_COPIES must be at least 1");
        }
        if self.lookup_timeout_secs == 0 || self.download_timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_quality() {
        let config = Config {
            jpeg_quality: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u64 = env_or("PROXYFORGE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
