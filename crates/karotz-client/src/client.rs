use std::iter;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::action::Action;
use crate::config::{ClientConfig, Credentials, Endpoints};
use crate::error::{KarotzError, Result};
use crate::query::canonical_query;
use crate::response::{body_text, status_code};
use crate::session::{SessionManager, SessionSnapshot};
use crate::transport::{HttpTransport, Transport};

/// Outcome of a successful [`KarotzClient::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// No session was active, so nothing was sent.
    Skipped,
    /// The device accepted the command.
    Sent { expected: Duration },
}

/// Handle on one device install. Clones share the same session.
#[derive(Clone)]
pub struct KarotzClient {
    sessions: Arc<SessionManager>,
    endpoints: Endpoints,
    transport: Arc<dyn Transport>,
}

impl KarotzClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let endpoints = config.endpoints()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(credentials, endpoints, transport))
    }

    pub fn with_transport(
        credentials: Credentials,
        endpoints: Endpoints,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            credentials,
            endpoints.clone(),
            Arc::clone(&transport),
        ));
        Self {
            sessions,
            endpoints,
            transport,
        }
    }

    pub async fn start_session(&self) -> Result<()> {
        self.sessions.start_session().await
    }

    pub async fn stop_session(&self) -> Result<()> {
        self.sessions.stop_session().await
    }

    pub async fn is_interactive(&self) -> bool {
        self.sessions.is_active().await
    }

    pub async fn interactive_id(&self) -> Option<String> {
        self.sessions.token().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.sessions.snapshot().await
    }

    /// Send one command using the current session token.
    ///
    /// Without an active session the command is skipped and no request is made. Any vendor
    /// code other than `OK` is returned as [`KarotzError::Action`].
    pub async fn execute(&self, action: &Action) -> Result<Execution> {
        let Some(token) = self.sessions.token().await else {
            debug!(
                target = "karotz::action",
                action = action.kind(),
                "no active session; action skipped"
            );
            return Ok(Execution::Skipped);
        };

        let request = action.request();
        let query = canonical_query(
            request
                .params
                .iter()
                .map(|(key, value)| (*key, value.as_str()))
                .chain(iter::once(("interactiveid", token.as_str()))),
        );
        let url = format!("{}?{}", self.endpoints.url(request.endpoint), query);
        let body = self.transport.get(&url).await?;
        let code = status_code(body_text(&body)?)?;

        if !code.is_ok() {
            warn!(
                target = "karotz::action",
                action = action.kind(),
                code = %code,
                "device rejected action"
            );
            return Err(KarotzError::Action(code));
        }

        let queued = self
            .sessions
            .record_action(&token, request.expected_duration)
            .await;
        debug!(
            target = "karotz::action",
            action = action.kind(),
            expected_ms = request.expected_duration.as_millis() as u64,
            queued_ms = queued.map(|total| total.as_millis() as u64),
            "action accepted"
        );
        Ok(Execution::Sent {
            expected: request.expected_duration,
        })
    }

    /// Run `actions` in order, stopping at the first failure. Returns the summed expected
    /// duration of the commands that were sent.
    pub async fn execute_all(&self, actions: &[Action]) -> Result<Duration> {
        let mut total = Duration::ZERO;
        for action in actions {
            if let Execution::Sent { expected } = self.execute(action).await? {
                total += expected;
            }
        }
        Ok(total)
    }
}
