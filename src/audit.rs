use std::fmt;
use std::sync::Mutex;

/// The kind of database activity being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Select,
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AuditAction::Select => "SELECT",
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }

    /// Reads and mutations are routed to separate audit streams.
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, AuditAction::Select)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for audit records. Service operations report every mutation and
/// read-of-note here; the sink owns formatting and storage. Injected
/// explicitly rather than held in process-global state.
pub trait AuditSink: Send + Sync {
    fn record(&self, action: AuditAction, table: &str, actor: &str, details: &str);
}

/// Emits audit records as tracing events, reads under the `audit::access`
/// target and mutations under `audit::change`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, action: AuditAction, table: &str, actor: &str, details: &str) {
        if action.is_read() {
            tracing::info!(
                target: "audit::access",
                action = action.as_str(),
                table,
                actor,
                details,
            );
        } else {
            tracing::info!(
                target: "audit::change",
                action = action.as_str(),
                table,
                actor,
                details,
            );
        }
    }
}

/// A recorded audit event, as captured by [`MemoryAudit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub table: String,
    pub actor: String,
    pub details: String,
}

/// In-memory sink for tests and embedders that post-process audit trails.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, action: AuditAction, table: &str, actor: &str, details: &str) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(AuditEvent {
                action,
                table: table.to_string(),
                actor: actor.to_string(),
                details: details.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use super::*;

    #[derive(Clone, Default)]
    struct TargetCapture(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TargetCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0
                .lock()
                .unwrap()
                .push(event.metadata().target().to_string());
        }
    }

    #[test]
    fn test_tracing_audit_splits_reads_from_mutations() {
        let capture = TargetCapture::default();
        let subscriber = Registry::default().with(capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            let sink = TracingAudit;
            sink.record(AuditAction::Select, "assets", "ops@example.com", "{}");
            sink.record(AuditAction::Update, "assets", "ops@example.com", "{}");
            sink.record(AuditAction::Delete, "labels", "ops@example.com", "{}");
        });

        let targets = capture.0.lock().unwrap().clone();
        assert_eq!(targets, vec!["audit::access", "audit::change", "audit::change"]);
    }

    #[test]
    fn test_memory_audit_records_in_order() {
        let sink = MemoryAudit::new();
        sink.record(AuditAction::Insert, "assets", "ops@example.com", "created asset 1");
        sink.record(AuditAction::Select, "assets", "ops@example.com", "listed assets");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::Insert);
        assert_eq!(events[1].table, "assets");
    }

    #[test]
    fn test_action_read_split() {
        assert!(AuditAction::Select.is_read());
        assert!(!AuditAction::Update.is_read());
        assert_eq!(AuditAction::Delete.as_str(), "DELETE");
    }
}
