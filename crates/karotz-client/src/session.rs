use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{redact, Credentials, Endpoint, Endpoints};
use crate::error::{KarotzError, Result};
use crate::query::canonical_query;
use crate::response::{
    body_text, extract_field, status_code, StatusCode, CODE_TAG, INTERACTIVE_ID_TAG,
};
use crate::signer;
use crate::transport::Transport;

/// Exclusive upper bound of the start nonce (eight decimal digits).
const NONCE_RANGE: u32 = 99_999_999;

#[derive(Debug, Clone)]
struct ActiveSession {
    token: String,
    started_at: SystemTime,
    queued: Duration,
}

#[derive(Debug, Default)]
struct SessionState {
    active: Option<ActiveSession>,
    /// Failure of the latest start attempt, handed to callers that queued behind it.
    last_start_failure: Option<KarotzError>,
}

/// Point-in-time view of the session, for callers deciding when to stop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub active: bool,
    pub started_at: Option<SystemTime>,
    /// Sum of the expected durations of commands accepted during this session.
    pub queued: Duration,
}

/// Owner of the single interactive session of one device install.
///
/// Start and stop hold the state lock for the whole vendor round trip so concurrent
/// callers never race two sessions into existence. A start that waited behind another
/// attempt takes that attempt's outcome rather than calling the vendor again. Token reads
/// only hold the lock long enough to clone the token.
pub struct SessionManager {
    credentials: Credentials,
    endpoints: Endpoints,
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
    /// Completed start attempts; only advanced with `state` locked.
    start_attempts: AtomicU64,
}

impl SessionManager {
    pub fn new(
        credentials: Credentials,
        endpoints: Endpoints,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            credentials,
            endpoints,
            transport,
            state: Mutex::new(SessionState::default()),
            start_attempts: AtomicU64::new(0),
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    /// Current token, by value. Callers must not keep it across calls.
    pub async fn token(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .active
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.state.lock().await;
        match guard.active.as_ref() {
            Some(session) => SessionSnapshot {
                active: true,
                started_at: Some(session.started_at),
                queued: session.queued,
            },
            None => SessionSnapshot {
                active: false,
                started_at: None,
                queued: Duration::ZERO,
            },
        }
    }

    /// Add `duration` to the running total, provided `token` still names the active
    /// session. Returns the new total, or `None` if the session changed meanwhile.
    pub async fn record_action(&self, token: &str, duration: Duration) -> Option<Duration> {
        let mut guard = self.state.lock().await;
        match guard.active.as_mut() {
            Some(session) if session.token == token => {
                session.queued += duration;
                Some(session.queued)
            }
            _ => None,
        }
    }

    pub async fn start_session(&self) -> Result<()> {
        let seen = self.start_attempts.load(Ordering::Acquire);
        let mut guard = self.state.lock().await;
        if guard.active.is_some() {
            debug!(target = "karotz::session", "session already active; start skipped");
            return Ok(());
        }
        if self.start_attempts.load(Ordering::Acquire) != seen {
            if let Some(err) = guard.last_start_failure.clone() {
                debug!(
                    target = "karotz::session",
                    error = %err,
                    "start attempt failed while waiting; sharing its outcome"
                );
                return Err(err);
            }
        }

        let outcome = self.request_session().await;
        self.start_attempts.fetch_add(1, Ordering::Release);
        match outcome {
            Ok(session) => {
                guard.active = Some(session);
                guard.last_start_failure = None;
                Ok(())
            }
            Err(err) => {
                guard.last_start_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn request_session(&self) -> Result<ActiveSession> {
        let nonce = rand::thread_rng().gen_range(0..NONCE_RANGE);
        let request = signer::start_request(
            &self.endpoints.url(Endpoint::Start),
            &self.credentials,
            nonce,
            unix_timestamp(),
        )?;
        let body = self.transport.get(&request.url()).await?;
        let body = body_text(&body)?;

        match extract_field(body, INTERACTIVE_ID_TAG)? {
            Some(token) => {
                info!(
                    target = "karotz::session",
                    install_id = %redact(self.credentials.install_id()),
                    "interactive session started"
                );
                Ok(ActiveSession {
                    token,
                    started_at: SystemTime::now(),
                    queued: Duration::ZERO,
                })
            }
            None => {
                let code = StatusCode::from_field(extract_field(body, CODE_TAG)?);
                warn!(
                    target = "karotz::session",
                    install_id = %redact(self.credentials.install_id()),
                    code = %code,
                    "session start rejected"
                );
                Err(KarotzError::SessionStart(code))
            }
        }
    }

    /// Stop the active session. Local state is cleared once the stop has been attempted,
    /// whatever the outcome: a token the vendor may have dropped is never worth keeping.
    pub async fn stop_session(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        let Some(session) = guard.active.take() else {
            debug!(target = "karotz::session", "no active session; stop skipped");
            return Ok(());
        };

        let query = canonical_query([
            ("action", "stop"),
            ("interactiveid", session.token.as_str()),
        ]);
        let url = format!("{}?{}", self.endpoints.url(Endpoint::InteractiveMode), query);
        let body = self.transport.get(&url).await?;
        let code = status_code(body_text(&body)?)?;

        if matches!(code, StatusCode::Ok | StatusCode::NotConnected) {
            info!(
                target = "karotz::session",
                code = %code,
                queued_ms = session.queued.as_millis() as u64,
                "interactive session stopped"
            );
            Ok(())
        } else {
            warn!(target = "karotz::session", code = %code, "session stop rejected");
            Err(KarotzError::SessionStop(code))
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
