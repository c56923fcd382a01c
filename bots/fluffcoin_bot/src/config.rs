use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use url::Url;

pub const TOKEN_VAR: &str = "FLUFFCOIN_BOT_TOKEN";
pub const DB_PATH_VAR: &str = "FLUFFCOIN_DB_PATH";
pub const WEBAPP_URL_VAR: &str = "FLUFFCOIN_WEBAPP_URL";
pub const BOT_USERNAME_VAR: &str = "FLUFFCOIN_BOT_USERNAME";

pub const DEFAULT_DB_PATH: &str = "referral_system.db";
pub const DEFAULT_WEBAPP_URL: &str = "https://fluffcoinwebapp.opinionomics.co.kr";

/// Startup settings, read from the environment.
#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub db_path: PathBuf,
    pub webapp_url: Url,
    /// When unset the username is resolved with `getMe`.
    pub bot_username: Option<String>,
}

impl Config {
    /// Reads the process environment. Load `.env` with `dotenvy` first if wanted.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token = non_empty(TOKEN_VAR).with_context(|| format!("Missing {}", TOKEN_VAR))?;

        let db_path = non_empty(DB_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let raw_url =
            non_empty(WEBAPP_URL_VAR).unwrap_or_else(|| DEFAULT_WEBAPP_URL.to_string());
        let webapp_url = Url::parse(&raw_url)
            .with_context(|| format!("Invalid {}: {}", WEBAPP_URL_VAR, raw_url))?;
        if !matches!(webapp_url.scheme(), "http" | "https") {
            bail!("{} must be an http(s) URL, got {}", WEBAPP_URL_VAR, raw_url);
        }

        let bot_username =
            non_empty(BOT_USERNAME_VAR).map(|name| name.trim_start_matches('@').to_string());

        Ok(Config {
            token,
            db_path,
            webapp_url,
            bot_username,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("db_path", &self.db_path)
            .field("webapp_url", &self.webapp_url.as_str())
            .field("bot_username", &self.bot_username)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains(TOKEN_VAR));

        assert!(Config::from_lookup(lookup(&[(TOKEN_VAR, "   ")])).is_err());
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[(TOKEN_VAR, "123:abc")])).unwrap();
        assert_eq!(config.token, "123:abc");
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.webapp_url, Url::parse(DEFAULT_WEBAPP_URL).unwrap());
        assert_eq!(config.bot_username, None);
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            (TOKEN_VAR, "123:abc"),
            (DB_PATH_VAR, "/tmp/fluff.db"),
            (WEBAPP_URL_VAR, "https://example.org/app"),
            (BOT_USERNAME_VAR, "@FluffBot"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/fluff.db"));
        assert_eq!(config.webapp_url.as_str(), "https://example.org/app");
        assert_eq!(config.bot_username.as_deref(), Some("FluffBot"));
    }

    #[test]
    fn bad_webapp_url_is_rejected() {
        for url in ["not a url", "ftp://x.org"] {
            let vars = [(TOKEN_VAR, "t"), (WEBAPP_URL_VAR, url)];
            assert!(Config::from_lookup(lookup(&vars)).is_err(), "accepted {}", url);
        }
    }

    #[test]
    fn debug_hides_token() {
        let config = Config::from_lookup(lookup(&[(TOKEN_VAR, "secret-token")])).unwrap();
        assert!(!format!("{:?}", config).contains("secret-token"));
    }
}
