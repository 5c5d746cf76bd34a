//! Emission of audit events as JSON lines on the `herald::audit` target.

use herald_core::AuditEvent;

/// Tracing target for audit records, filterable via `RUST_LOG=herald::audit=info`.
pub const AUDIT_TARGET: &str = "herald::audit";

/// Write an audit event to the log.
pub fn record(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(line) => tracing::info!(target: AUDIT_TARGET, "{}", line),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize audit event"),
    }
}
