use async_trait::async_trait;
use bytes::Bytes;

use crate::config::ClientConfig;
use crate::error::TransportError;

/// Outbound GET used for every vendor call. Implementations return the raw body and must
/// not interpret it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError>;
}

/// reqwest-backed transport. Honors the proxy variables of the environment unless told not
/// to, and always bounds both the connect phase and the whole request.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }
        Ok(response.bytes().await?)
    }
}
