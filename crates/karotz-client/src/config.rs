use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{KarotzError, Result};

pub const DEFAULT_BASE_URL: &str = "http://api.karotz.com/api";

/// Application credentials issued by the vendor. Debug output never shows the secret and
/// only a prefix of the identifiers.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    secret_key: String,
    install_id: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        install_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            install_id: install_id.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn install_id(&self) -> &str {
        &self.install_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &"<redacted>")
            .field("install_id", &redact(&self.install_id))
            .finish()
    }
}

/// First four characters followed by an ellipsis.
pub(crate) fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    if prefix.len() == value.len() {
        "****".to_string()
    } else {
        format!("{prefix}…")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Route requests through the proxies named by the environment (`HTTP_PROXY`, ...).
    #[serde(default = "default_true")]
    pub use_env_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            use_env_proxy: true,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check the base URL and timeouts, returning the endpoint set they describe.
    pub fn endpoints(&self) -> Result<Endpoints> {
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(KarotzError::InvalidConfig(
                "timeouts must be greater than zero".into(),
            ));
        }
        Endpoints::new(&self.base_url)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_request_timeout_ms() -> u64 {
    8_000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    InteractiveMode,
    Tts,
    Led,
    Ears,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Start => "karotz/start",
            Endpoint::InteractiveMode => "karotz/interactivemode",
            Endpoint::Tts => "karotz/tts",
            Endpoint::Led => "karotz/led",
            Endpoint::Ears => "karotz/ears",
        }
    }
}

/// Absolute URLs of the vendor endpoints under one API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim();
        let parsed = Url::parse(trimmed)
            .map_err(|err| KarotzError::InvalidConfig(format!("invalid base url: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(KarotzError::InvalidConfig(format!(
                "unsupported base url scheme {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base: trimmed.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base, endpoint.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials::new(
            "b68bbed3-349f-49d9",
            "1929fbe1-54f2-44a7",
            "36bc42c1-c3c8-4c3e",
        );
        let printed = format!("{credentials:?}");
        assert!(!printed.contains("1929fbe1"));
        assert!(!printed.contains("b68bbed3-349f"));
        assert!(printed.contains("b68b…"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn short_values_are_fully_masked() {
        assert_eq!(redact("K"), "****");
        assert_eq!(redact("abcd"), "****");
        assert_eq!(redact("abcde"), "abcd…");
    }

    #[test]
    fn endpoints_join_without_double_slashes() {
        let endpoints = Endpoints::new("http://api.karotz.com/api/").unwrap();
        assert_eq!(
            endpoints.url(Endpoint::Start),
            "http://api.karotz.com/api/karotz/start"
        );
        assert_eq!(
            endpoints.url(Endpoint::InteractiveMode),
            "http://api.karotz.com/api/karotz/interactivemode"
        );
        assert_eq!(endpoints.url(Endpoint::Ears), "http://api.karotz.com/api/karotz/ears");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            Endpoints::new("not a url"),
            Err(KarotzError::InvalidConfig(_))
        ));
        assert!(matches!(
            Endpoints::new("ftp://api.karotz.com"),
            Err(KarotzError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://127.0.0.1:9000/api"}"#).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000/api");
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.request_timeout(), Duration::from_secs(8));
        assert!(config.use_env_proxy);
        assert!(config.endpoints().is_ok());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let config = ClientConfig {
            request_timeout_ms: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.endpoints(),
            Err(KarotzError::InvalidConfig(_))
        ));
    }
}
