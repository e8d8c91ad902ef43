//! Karotz interactive-session client.
//!
//! Responsibilities:
//! - building canonical, sorted query strings and signing session-start requests
//! - owning the single interactive session of a device install (start/stop)
//! - sending speech, LED and ear commands and reading the vendor status codes
//! - tracking how long accepted commands will keep the device busy
//!
//! Deciding when to notify, what to say and when to close the session is left to the host.

pub mod action;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod response;
pub mod session;
pub mod signer;
pub mod transport;

pub use action::{Action, ActionRequest, EarMove, LedColor};
pub use client::{Execution, KarotzClient};
pub use config::{ClientConfig, Credentials, Endpoint, Endpoints};
pub use error::{KarotzError, Result, TransportError};
pub use response::StatusCode;
pub use session::{SessionManager, SessionSnapshot};
pub use signer::SignedRequest;
pub use transport::{HttpTransport, Transport};
