//! Test harness behavior: synthetic module composition, base-module
//! overrides, and scoped container overrides.

use std::sync::Arc;

use waku_core::container::Resolver;
use waku_core::modules::{ModuleDef, ModuleMetadata};
use waku_core::provider::{injectable, object, singleton, Inject, ProviderScope, TypeKey};
use waku_core::{Context, WakuError};
use waku_testing::{override_providers, TestApp};

trait Clock: Send + Sync {
    fn now(&self) -> &'static str;
}

struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> &'static str {
        "wall-clock"
    }
}

struct FrozenClock;

impl Clock for FrozenClock {
    fn now(&self) -> &'static str {
        "frozen"
    }
}

struct Scheduler {
    clock: Arc<dyn Clock>,
}

impl Inject for Scheduler {
    fn dependencies() -> Vec<TypeKey> {
        vec![TypeKey::of::<dyn Clock>()]
    }

    fn inject(resolver: &Resolver<'_>) -> Result<Self, WakuError> {
        Ok(Self {
            clock: resolver.resolve::<dyn Clock>()?,
        })
    }
}

struct InfraModule;

impl ModuleDef for InfraModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("InfraModule")
            .with_provider(singleton::<dyn Clock, _>(|_| Ok(Arc::new(SystemClock))))
            .export::<dyn Clock>()
    }
}

struct AppModule;

impl ModuleDef for AppModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("AppModule")
            .import::<InfraModule>()
            .with_provider(injectable::<Scheduler>(ProviderScope::Request))
            .export::<Scheduler>()
    }
}

#[tokio::test]
async fn synthetic_module_composes_passed_providers() {
    let app = TestApp::builder()
        .with_provider(singleton::<dyn Clock, _>(|_| Ok(Arc::new(FrozenClock))))
        .build()
        .await
        .unwrap();

    let clock = app.container().resolve::<dyn Clock>().unwrap();
    assert_eq!(clock.now(), "frozen");
    app.close().await.unwrap();
}

#[tokio::test]
async fn base_module_providers_become_overrides() {
    let app = TestApp::builder()
        .with_base::<AppModule>()
        .with_provider(singleton::<dyn Clock, _>(|_| Ok(Arc::new(FrozenClock))))
        .build()
        .await
        .unwrap();

    // Every consumer sees the override, regardless of which module declared
    // the interface originally.
    let scope = app.scope();
    let scheduler = scope.resolve::<Scheduler>().unwrap();
    assert_eq!(scheduler.clock.now(), "frozen");

    app.close().await.unwrap();
}

#[tokio::test]
async fn without_override_the_base_declaration_wins() {
    let app = TestApp::builder()
        .with_import::<AppModule>()
        .build()
        .await
        .unwrap();

    let scope = app.scope();
    let scheduler = scope.resolve::<Scheduler>().unwrap();
    assert_eq!(scheduler.clock.now(), "wall-clock");
    app.close().await.unwrap();
}

#[tokio::test]
async fn override_guard_swaps_and_restores() {
    let app = TestApp::builder()
        .with_import::<AppModule>()
        .build()
        .await
        .unwrap();

    assert_eq!(app.container().resolve::<dyn Clock>().unwrap().now(), "wall-clock");

    {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock);
        let _guard = override_providers(
            app.container(),
            vec![object::<dyn Clock>(clock).build()],
            Context::new(),
        )
        .unwrap();

        assert_eq!(app.container().resolve::<dyn Clock>().unwrap().now(), "frozen");

        // Consumers constructed while the guard is active see the override.
        let scope = app.scope();
        assert_eq!(scope.resolve::<Scheduler>().unwrap().clock.now(), "frozen");
    }

    assert_eq!(app.container().resolve::<dyn Clock>().unwrap().now(), "wall-clock");
    app.close().await.unwrap();
}

#[tokio::test]
async fn override_guard_swaps_context_entries() {
    #[derive(Debug, PartialEq)]
    struct FeatureFlag(bool);

    let app = TestApp::builder()
        .with_context(Context::new().with(FeatureFlag(false)))
        .build()
        .await
        .unwrap();

    assert_eq!(app.container().context::<FeatureFlag>().unwrap().0, false);

    {
        let _guard = override_providers(
            app.container(),
            Vec::new(),
            Context::new().with(FeatureFlag(true)),
        )
        .unwrap();
        assert_eq!(app.container().context::<FeatureFlag>().unwrap().0, true);
    }

    assert_eq!(app.container().context::<FeatureFlag>().unwrap().0, false);
    app.close().await.unwrap();
}
