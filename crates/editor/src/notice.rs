//! Transient user-visible notices backed by a `tokio::sync::broadcast` channel.
//!
//! Editors publish a [`Notice`] for every outcome the admin should see
//! (saved, deleted, upload rejected, ...). The shell subscribes and renders
//! them as toasts. Notices are fire-and-forget: with no subscriber they are
//! dropped.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use wasura_core::error::CoreError;
use wasura_core::types::Timestamp;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// One message for the admin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: Timestamp,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

/// Fan-out channel for [`Notice`]s, shared via `Arc<NoticeBus>`.
pub struct NoticeBus {
    sender: broadcast::Sender<Notice>,
}

impl NoticeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, notice: Notice) {
        // Zero receivers is fine.
        let _ = self.sender.send(notice);
    }

    /// Publish an error notice for `context` and hand the error back for `?`.
    pub fn fail(&self, context: &str, err: CoreError) -> CoreError {
        self.publish(Notice::error(format!("{context}: {err}")));
        err
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_notice() {
        let bus = NoticeBus::default();
        let mut rx = bus.subscribe();

        bus.publish(Notice::success("Saved"));

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Saved");
    }

    #[tokio::test]
    async fn fail_publishes_and_returns_error() {
        let bus = NoticeBus::default();
        let mut rx = bus.subscribe();

        let err = bus.fail("Delete failed", CoreError::Validation("nope".into()));

        assert!(err.is_user_correctable());
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Delete failed: Validation failed: nope");
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        NoticeBus::default().publish(Notice::info("nobody listening"));
    }

    #[test]
    fn level_serializes_lowercase() {
        let json = serde_json::to_value(Notice::info("x")).unwrap();
        assert_eq!(json["level"], "info");
    }
}
