use thiserror::Error;

use crate::response::StatusCode;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("unexpected http status {0}")]
    HttpStatus(u16),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::HttpStatus(status.as_u16())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum KarotzError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("session start rejected: {0}")]
    SessionStart(StatusCode),
    #[error("session stop rejected: {0}")]
    SessionStop(StatusCode),
    #[error("action rejected: {0}")]
    Action(StatusCode),
    #[error("request signing unavailable: {0}")]
    Crypto(String),
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl KarotzError {
    /// Status code reported by the vendor, when the failure is a vendor rejection
    /// rather than a local or network fault.
    pub fn vendor_code(&self) -> Option<&StatusCode> {
        match self {
            KarotzError::SessionStart(code)
            | KarotzError::SessionStop(code)
            | KarotzError::Action(code) => Some(code),
            _ => None,
        }
    }

    pub fn is_vendor_rejection(&self) -> bool {
        self.vendor_code().is_some()
    }
}

pub type Result<T> = std::result::Result<T, KarotzError>;
