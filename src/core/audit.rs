// src/core/audit.rs
use crate::types::IterationRecord;
use anyhow::Result;

/// Target the subscriber routes to the audit file.
pub const AUDIT_TARGET: &str = "audit";

/// Write-only sink for per-iteration records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &IterationRecord) -> Result<()>;
}

/// Emits each record as one JSON event on the `audit` target.
pub struct TracingAuditSink {
    session_id: String,
}

impl TracingAuditSink {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &IterationRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        tracing::info!(
            target: AUDIT_TARGET,
            session = %self.session_id,
            iteration = record.iteration,
            "{}",
            line
        );
        Ok(())
    }
}
