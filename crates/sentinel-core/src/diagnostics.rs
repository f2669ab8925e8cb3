//! Structured failure records
//!
//! Recovered failures are never raised to callers. They are logged and,
//! when a subscriber is attached, forwarded over a channel so an external
//! observer can decide how to surface them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::FailureKind;

/// One recovered failure
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: FailureKind,
    /// Where it happened, e.g. the agent type or task id
    pub context: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Cloneable emitter shared by the dispatcher, supervisor, and orchestrator
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    tx: Option<mpsc::UnboundedSender<Diagnostic>>,
}

impl Diagnostics {
    /// Log-only emitter
    pub fn new() -> Self {
        Self { tx: None }
    }

    /// Emitter that also forwards every record to the returned receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Diagnostic>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(
        &self,
        kind: FailureKind,
        context: impl Into<String>,
        detail: impl std::fmt::Display,
    ) {
        let diagnostic = Diagnostic {
            kind,
            context: context.into(),
            detail: format!("{:#}", detail),
            at: Utc::now(),
        };

        warn!(
            error_kind = %diagnostic.kind,
            context = %diagnostic.context,
            "{}",
            diagnostic.detail
        );

        if let Some(tx) = &self.tx
            && tx.send(diagnostic).is_err()
        {
            debug!("Diagnostics subscriber dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_forwards_to_subscriber() {
        let (diagnostics, mut rx) = Diagnostics::channel();
        diagnostics.emit(FailureKind::Persistence, "soar", "disk full");

        let d = rx.try_recv().expect("diagnostic");
        assert_eq!(d.kind, FailureKind::Persistence);
        assert_eq!(d.context, "soar");
        assert_eq!(d.detail, "disk full");
    }

    #[test]
    fn test_emit_without_subscriber_is_silent() {
        Diagnostics::new().emit(FailureKind::SupervisionTick, "tick", "oops");
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (diagnostics, rx) = Diagnostics::channel();
        drop(rx);
        diagnostics.emit(FailureKind::AgentProcessing, "individual", "late");
    }
}
