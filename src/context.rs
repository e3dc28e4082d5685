use tracing::{info_span, Span};

/// Logging scope threaded explicitly through analysis calls.
///
/// Each operation opens a child scope whose span names the operation and
/// hangs off the caller's span, so events emitted under nested calls can be
/// correlated without any thread-local state. Dropping the child closes it.
#[derive(Debug, Clone)]
pub struct LogContext {
    span: Span,
}

impl LogContext {
    pub fn root(component: &'static str) -> Self {
        Self { span: info_span!("logsift", component = component) }
    }

    /// A context whose events go nowhere.
    pub fn disabled() -> Self {
        Self { span: Span::none() }
    }

    pub fn child(&self, operation: &'static str) -> Self {
        Self { span: info_span!(parent: &self.span, "operation", name = operation) }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::disabled()
    }
}
