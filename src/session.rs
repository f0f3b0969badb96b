//! Session lifecycle management
//!
//! Owns the bearer token and its renewal schedule. A session is replaced
//! whole on every renewal, never mutated, and [`SessionManager::current_token`]
//! judges expiry strictly by timestamp so a late timer can never hand out a
//! stale token. Authentication failure is fatal for the process: stale or
//! absent credentials are not a transient condition, so there is no
//! retry-with-backoff here.

use crate::api::ExchangeClient;
use crate::error::ExchangeError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Renewal fires this many seconds before the token expires
pub const RENEWAL_MARGIN_SECS: i64 = 60;

/// One authenticated session. Invalid after `expires_at`.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Owns the current session and the renewal task.
///
/// Cheap to clone; all clones share the same session slot
/// (single writer in the renewal task, many readers in the order path).
#[derive(Clone)]
pub struct SessionManager {
    client: ExchangeClient,
    login: String,
    password: String,
    session: Arc<RwLock<Option<Session>>>,
}

impl SessionManager {
    pub fn new(client: ExchangeClient, login: String, password: String) -> Self {
        Self {
            client,
            login,
            password,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Log in and replace the current session
    pub async fn authenticate(&self) -> Result<Session, ExchangeError> {
        info!("[AUTH] authenticating...");

        let auth = self.client.authorize(&self.login, &self.password).await?;
        let expires_at = DateTime::from_timestamp(auth.expiration, 0)
            .ok_or(ExchangeError::InvalidExpiration(auth.expiration))?;

        let session = Session {
            access_token: auth.access_token,
            expires_at,
        };
        *self.session.write().await = Some(session.clone());

        info!("[AUTH] success, token valid until {}", expires_at);
        Ok(session)
    }

    /// Current bearer token, only while the session is unexpired
    pub async fn current_token(&self) -> Result<String, ExchangeError> {
        let guard = self.session.read().await;
        match guard.as_ref() {
            Some(s) if Utc::now() < s.expires_at => Ok(s.access_token.clone()),
            _ => Err(ExchangeError::NotAuthenticated),
        }
    }

    /// Delay until the next renewal: [`RENEWAL_MARGIN_SECS`] before expiry,
    /// clamped to zero when the token is already inside the margin.
    pub fn renewal_delay(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        (expires_at - now - chrono::Duration::seconds(RENEWAL_MARGIN_SECS))
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Spawn the repeating renewal task.
    ///
    /// Each cycle sleeps until the margin before expiry, re-authenticates,
    /// and re-arms from the new expiry. A renewal failure is reported on
    /// `fatal_tx` and ends the task; the controller terminates the process.
    /// The returned handle lets shutdown cancel the timer.
    pub fn spawn_renewal(
        &self,
        initial: &Session,
        fatal_tx: mpsc::Sender<ExchangeError>,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        let mut expires_at = initial.expires_at;

        tokio::spawn(async move {
            loop {
                let delay = Self::renewal_delay(expires_at, Utc::now());
                debug!("[AUTH] next renewal in {:?}", delay);
                tokio::time::sleep(delay).await;

                match manager.authenticate().await {
                    Ok(session) => expires_at = session.expires_at,
                    Err(err) => {
                        error!("[AUTH] renewal failed: {}", err);
                        let _ = fatal_tx.send(err).await;
                        return;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
impl SessionManager {
    /// Install a session directly, without hitting the network
    pub(crate) fn install_for_test(&self, session: Session) {
        *self.session.try_write().expect("session slot uncontended") = Some(session);
    }
}
