//! # waku
//!
//! Umbrella crate for the waku microframework. Re-exports the core
//! composition layer and the CQRS mediator; enable the `testing` feature to
//! pull in the test harness.
//!
//! ```ignore
//! use waku::prelude::*;
//!
//! struct AppModule;
//!
//! impl ModuleDef for AppModule {
//!     fn metadata() -> ModuleMetadata {
//!         ModuleMetadata::new("AppModule")
//!             .with_provider(singleton::<dyn Clock>(|_| Ok(Arc::new(SystemClock))))
//!             .export::<dyn Clock>()
//!     }
//! }
//!
//! let app = WakuFactory::new::<AppModule>().create()?;
//! ```

pub use waku_core as core;
pub use waku_mediator as mediator;
#[cfg(feature = "testing")]
pub use waku_testing as testing;

pub use waku_core::{
    Application, Context, Lifespan, ValidationPolicy, WakuConfiguration, WakuError, WakuFactory,
};
pub use waku_mediator::{
    MediatorAppExtension, MediatorConfig, MediatorError, MediatorExtension, MediatorService,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use waku_core::prelude::*;
    pub use waku_mediator::prelude::*;
    #[cfg(feature = "testing")]
    pub use waku_testing::prelude::*;
}
