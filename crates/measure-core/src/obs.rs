//! Structured log emitters for the invocation lifecycle.
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`). Set
//! `MEASURE_LOG_FORMAT=json` on the CLI for JSON output.

use tracing::{info, warn};

/// Invocation-scoped tracing span.
///
/// Module `run` futures cross await points, so the span is attached with
/// [`tracing::Instrument`] instead of being entered on the current thread.
///
/// # Example
///
/// ```ignore
/// let span = InvocationSpan::new(&id, module.name());
/// module.run(&mut ctx).instrument(span.into_inner()).await
/// ```
pub struct InvocationSpan {
    span: tracing::Span,
}

impl InvocationSpan {
    pub fn new(invocation_id: &str, module: &str) -> Self {
        Self {
            span: tracing::info_span!(
                "measure.invocation",
                invocation_id = %invocation_id,
                module = %module
            ),
        }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn into_inner(self) -> tracing::Span {
        self.span
    }
}

/// Emit event: invocation started.
///
/// # Example
///
/// ```ignore
/// emit_invocation_started("4f1c...", "Minimal Reporting");
/// // logs: event=invocation.started invocation_id=4f1c... module=Minimal Reporting
/// ```
pub fn emit_invocation_started(invocation_id: &str, module: &str) {
    info!(event = "invocation.started", invocation_id = %invocation_id, module = %module);
}

/// Emit event: invocation finished with its status.
pub fn emit_invocation_finished(invocation_id: &str, status: &str, duration_ms: u64) {
    info!(
        event = "invocation.finished",
        invocation_id = %invocation_id,
        status = %status,
        duration_ms = duration_ms,
    );
}

/// Emit event: state machine transition.
pub fn emit_state_transition(invocation_id: &str, from: &str, to: &str) {
    tracing::debug!(event = "invocation.transition", invocation_id = %invocation_id, from = %from, to = %to);
}

/// Emit event: output requests returned by a module's hook.
pub fn emit_output_requests(module: &str, count: usize) {
    info!(event = "hook.output_requests", module = %module, count = count);
}

/// Emit event: a report artifact was moved into the reports namespace.
pub fn emit_report_gathered(source: &str, destination: &str) {
    info!(event = "report.gathered", source = %source, destination = %destination);
}

/// Emit event: a potentially unsafe output request was rejected (warning level).
pub fn emit_unsafe_request(module: &str, request: &str) {
    warn!(event = "request.rejected_unsafe", module = %module, request = %request);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_span_create() {
        let span = InvocationSpan::new("id", "module");
        let _entered = span.span().enter();
        emit_invocation_started("id", "module");
    }
}
