//! Login session tracking.
//!
//! One session per AuthnRequest ID, living from request arrival until a
//! login completes or the session expires. The tracker is the replay
//! gate: a request ID that already completed a login can never complete
//! another one.
//!
//! Time never comes from the clock here. Every time-sensitive operation
//! takes `now` from the caller, so tests can drive expiry with simulated
//! time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SamlError, SamlResult};
use crate::types::NameId;

/// Lifecycle state of a login session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Request received, login not yet completed.
    Pending,
    /// Login completed; terminal.
    Completed,
    /// Timed out before completion; terminal.
    Expired,
}

/// A tracked login session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The AuthnRequest ID this session answers.
    pub request_id: String,

    /// The SP entity ID that issued the request.
    pub sp_entity_id: String,

    /// Where the response for this session is delivered.
    pub acs_url: String,

    /// Current lifecycle state.
    pub state: SessionState,

    /// The subject the login completed with, once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<NameId>,

    /// Attributes asserted for the subject, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, Vec<String>)>,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// When a still-pending session counts as expired.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Pending && now >= self.expires_at
    }
}

/// In-memory session tracker keyed by request ID.
///
/// Cloning shares the underlying map. All state transitions happen under
/// one lock, so per-key operations are mutually exclusive.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    lifetime: Duration,
}

impl SessionTracker {
    /// Creates a tracker whose sessions expire after `lifetime`.
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            lifetime,
        }
    }

    /// Creates a pending session for a request.
    ///
    /// Fails with [`SamlError::DuplicateRequest`] when a session for the
    /// same request ID is already tracked, whatever its state.
    pub fn create(
        &self,
        request_id: &str,
        sp_entity_id: &str,
        acs_url: &str,
        now: DateTime<Utc>,
    ) -> SamlResult<Session> {
        let mut sessions = self.write_lock()?;
        if sessions.contains_key(request_id) {
            warn!(request_id, "session already exists for request");
            return Err(SamlError::DuplicateRequest(request_id.to_string()));
        }

        let session = Session {
            request_id: request_id.to_string(),
            sp_entity_id: sp_entity_id.to_string(),
            acs_url: acs_url.to_string(),
            state: SessionState::Pending,
            subject: None,
            attributes: Vec::new(),
            created_at: now,
            expires_at: now + self.lifetime,
        };
        sessions.insert(request_id.to_string(), session.clone());
        debug!(request_id, sp_entity_id, "session created");
        Ok(session)
    }

    /// Completes a pending session with the authenticated subject.
    ///
    /// Exactly one completion can ever succeed per request ID:
    /// completing a completed session is a replay, completing an expired
    /// session (or a pending one past its expiry) is an invalid
    /// transition, and an untracked ID is unknown.
    pub fn complete(
        &self,
        request_id: &str,
        subject: NameId,
        attributes: Vec<(String, Vec<String>)>,
        now: DateTime<Utc>,
    ) -> SamlResult<Session> {
        let mut sessions = self.write_lock()?;
        let session = sessions
            .get_mut(request_id)
            .ok_or_else(|| SamlError::UnknownSession(request_id.to_string()))?;

        if session.is_past_expiry(now) {
            session.state = SessionState::Expired;
        }

        match session.state {
            SessionState::Pending => {
                session.state = SessionState::Completed;
                session.subject = Some(subject);
                session.attributes = attributes;
                debug!(request_id, "session completed");
                Ok(session.clone())
            }
            SessionState::Completed => {
                warn!(request_id, "replay attempt against completed session");
                Err(SamlError::Replay(request_id.to_string()))
            }
            SessionState::Expired => {
                warn!(request_id, "completion attempt against expired session");
                Err(SamlError::InvalidState(request_id.to_string()))
            }
        }
    }

    /// Returns the state of a session, applying lazy expiry.
    ///
    /// A pending session past its expiry reads as expired even if no
    /// sweep has run.
    pub fn state(&self, request_id: &str, now: DateTime<Utc>) -> SamlResult<SessionState> {
        let mut sessions = self.write_lock()?;
        let session = sessions
            .get_mut(request_id)
            .ok_or_else(|| SamlError::UnknownSession(request_id.to_string()))?;
        if session.is_past_expiry(now) {
            session.state = SessionState::Expired;
        }
        Ok(session.state)
    }

    /// Returns a snapshot of a session, applying lazy expiry.
    pub fn get(&self, request_id: &str, now: DateTime<Utc>) -> SamlResult<Session> {
        let mut sessions = self.write_lock()?;
        let session = sessions
            .get_mut(request_id)
            .ok_or_else(|| SamlError::UnknownSession(request_id.to_string()))?;
        if session.is_past_expiry(now) {
            session.state = SessionState::Expired;
        }
        Ok(session.clone())
    }

    /// Expires every pending session whose expiry has passed.
    ///
    /// Returns how many sessions transitioned. Running the sweep twice
    /// with the same `now` transitions nothing the second time.
    pub fn expire_older_than(&self, now: DateTime<Utc>) -> SamlResult<usize> {
        let mut sessions = self.write_lock()?;
        let mut expired = 0;
        for session in sessions.values_mut() {
            if session.is_past_expiry(now) {
                session.state = SessionState::Expired;
                expired += 1;
            }
        }
        if expired > 0 {
            debug!(count = expired, "expired pending sessions");
        }
        Ok(expired)
    }

    /// Returns how many sessions are tracked, in any state.
    pub fn len(&self) -> SamlResult<usize> {
        Ok(self.read_lock()?.len())
    }

    /// Returns true if no sessions are tracked.
    pub fn is_empty(&self) -> SamlResult<bool> {
        Ok(self.read_lock()?.is_empty())
    }

    fn write_lock(&self) -> SamlResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .write()
            .map_err(|_| SamlError::Internal("session lock poisoned".to_string()))
    }

    fn read_lock(&self) -> SamlResult<std::sync::RwLockReadGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .read()
            .map_err(|_| SamlError::Internal("session lock poisoned".to_string()))
    }
}
