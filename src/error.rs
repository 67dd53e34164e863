use thiserror::Error;

/// Error type returned by user callbacks (`before_act`, `act`).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured error context for configuration and runtime failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Configuration key or field that caused the error (e.g., "config.batch_size")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the rejected value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "controller", "worker")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the aggregator engine.
///
/// Callback failures never show up here: a failing `act` is reported to
/// `after_act` only, and a `before_act` veto discards the batch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("aggregator already started")]
    AlreadyStarted,

    #[error("aggregator stop already requested")]
    AlreadyStopping,

    /// The worker pool stopped before the submitted item was claimed.
    #[error("aggregator closed: no worker accepted the item")]
    Closed,

    #[error("{count} worker task(s) panicked")]
    WorkerPanicked { count: usize },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_renders_context() {
        let err = Error::configuration_with_context(
            "batch_size must be at least 1",
            ErrorContext::new()
                .with_field_path("config.batch_size")
                .with_details("got 0"),
        );
        assert_eq!(
            err.to_string(),
            "Configuration error: batch_size must be at least 1 (field: config.batch_size, details: got 0)"
        );
        assert!(err.is_configuration());
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("config.batch_size")
        );
    }

    #[test]
    fn test_error_without_context() {
        let err = Error::runtime_with_context("boom", ErrorContext::default());
        assert_eq!(err.to_string(), "Runtime error: boom");
        assert!(Error::Closed.context().is_none());
    }
}
