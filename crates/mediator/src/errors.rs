use thiserror::Error;

use waku_core::WakuError;

/// Mediator error type. Registry errors surface during the registration
/// phase; dispatch errors surface from `send`/`publish`. Handler and behavior
/// failures are *not* wrapped; they propagate to the caller unmodified.
#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("no handler registered for request '{request}'")]
    RequestHandlerNotFound { request: &'static str },

    #[error("request '{request}' is already handled by '{existing}'; cannot bind '{attempted}'")]
    RequestHandlerAlreadyRegistered {
        request: &'static str,
        existing: &'static str,
        attempted: &'static str,
    },

    #[error("event handler '{handler}' is already bound to event '{event}'")]
    EventHandlerAlreadyRegistered {
        event: &'static str,
        handler: &'static str,
    },

    #[error("pipeline behavior '{behavior}' is already bound to request '{request}'")]
    PipelineBehaviorAlreadyRegistered {
        request: &'static str,
        behavior: &'static str,
    },

    #[error("failed to resolve mediator dependency: {0}")]
    Resolution(#[from] WakuError),

    #[error("handler for '{request}' returned a response of an unexpected type")]
    ResponseTypeMismatch { request: &'static str },

    #[error(
        "grouped event publication failed with {} handler error(s), {cancelled} handler(s) cancelled:\n{}",
        .errors.len(),
        format_failures(.errors)
    )]
    GroupedPublish {
        cancelled: usize,
        errors: Vec<anyhow::Error>,
    },
}

fn format_failures(errors: &[anyhow::Error]) -> String {
    errors
        .iter()
        .map(|error| format!("  - {error}"))
        .collect::<Vec<_>>()
        .join("\n")
}
