//! Admin session flag.
//!
//! The surrounding shell persists a single "is authenticated" marker between
//! runs. [`AdminSession`] owns that flag with an explicit restore at startup
//! and an explicit sign-out; editing components never read it themselves
//! but receive an [`AdminContext`] obtained from [`AdminSession::require`].
//! Verifying credentials happens outside this crate.

use chrono::TimeZone;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Process-wide authenticated flag.
#[derive(Debug, Clone, Default)]
pub struct AdminSession {
    signed_in_at: Option<Timestamp>,
}

/// Proof that an authenticated session existed when an editor was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    pub signed_in_at: Timestamp,
}

impl AdminSession {
    /// Restore from the persisted marker (milliseconds since the epoch as
    /// written by [`persisted_marker`](Self::persisted_marker)).
    ///
    /// A missing or unreadable marker yields a signed-out session.
    pub fn restore(persisted: Option<&str>) -> Self {
        let signed_in_at = persisted
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|ms| chrono::Utc.timestamp_millis_opt(ms).single());
        Self { signed_in_at }
    }

    /// Mark the session authenticated. Credential checks happen upstream.
    pub fn sign_in(&mut self, now: Timestamp) {
        self.signed_in_at = Some(now);
    }

    /// Clear the flag. The caller removes the persisted marker.
    pub fn sign_out(&mut self) {
        self.signed_in_at = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.signed_in_at.is_some()
    }

    /// Marker to persist, or `None` when signed out.
    pub fn persisted_marker(&self) -> Option<String> {
        self.signed_in_at.map(|t| t.timestamp_millis().to_string())
    }

    /// Context for building editing components.
    pub fn require(&self) -> Result<AdminContext, CoreError> {
        self.signed_in_at
            .map(|signed_in_at| AdminContext { signed_in_at })
            .ok_or_else(|| CoreError::Unauthorized("Admin session is not signed in".into()))
    }
}
