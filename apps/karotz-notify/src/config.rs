use anyhow::bail;
use karotz_client::config::DEFAULT_BASE_URL;
use karotz_client::{ClientConfig, Credentials};
use serde::Deserialize;

/// Settings read from `KAROTZ_*` environment variables (and `.env`).
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub install_id: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub use_env_proxy: bool,
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_key: None,
            secret_key: None,
            install_id: None,
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            use_env_proxy: true,
            language: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("KAROTZ"))
            .build()
            .map(AppConfig::from_config)
            .unwrap_or_default()
    }

    fn from_config(source: config::Config) -> Self {
        source
            .try_deserialize::<AppConfig>()
            .unwrap_or_default()
            .normalize()
    }

    fn normalize(mut self) -> Self {
        self.api_key = Self::normalize_opt(self.api_key.take());
        self.secret_key = Self::normalize_opt(self.secret_key.take());
        self.install_id = Self::normalize_opt(self.install_id.take());
        self.language = Self::normalize_opt(self.language.take());
        self.base_url = Self::normalize_opt(Some(std::mem::take(&mut self.base_url)))
            .unwrap_or_else(default_base_url);
        self
    }

    fn normalize_opt(value: Option<String>) -> Option<String> {
        value.and_then(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        match (&self.api_key, &self.secret_key, &self.install_id) {
            (Some(api_key), Some(secret_key), Some(install_id)) => {
                Ok(Credentials::new(api_key, secret_key, install_id))
            }
            _ => bail!("KAROTZ_API_KEY, KAROTZ_SECRET_KEY and KAROTZ_INSTALL_ID must all be set"),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
            request_timeout_ms: self.request_timeout_ms,
            use_env_proxy: self.use_env_proxy,
        }
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
