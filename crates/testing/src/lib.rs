//! # waku-testing
//!
//! Testing harness for waku applications.
//!
//! Two tools: [`TestApp`] composes a synthetic root module around the
//! providers under test and yields a fully started application, and
//! [`override_providers`] temporarily swaps APP-scope registrations on a
//! running container, restoring them when the guard drops.

mod app;
mod overrides;

pub use app::{TestApp, TestAppBuilder};
pub use overrides::{override_providers, OverrideGuard};

/// Testing harness error type
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error(transparent)]
    Waku(#[from] waku_core::WakuError),

    #[error("test harness error: {message}")]
    Harness { message: String },
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{override_providers, OverrideGuard, TestApp, TestAppBuilder, TestError};
}
