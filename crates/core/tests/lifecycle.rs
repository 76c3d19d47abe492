//! Application lifecycle ordering: init/destroy mirroring, lifespan nesting,
//! and unwinding on startup failure.

use std::any::Any;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use waku_core::extensions::{
    AfterApplicationInit, Extension, HookContext, OnApplicationInit, OnApplicationShutdown,
    OnModuleDestroy, OnModuleInit,
};
use waku_core::lifespan::Lifespan;
use waku_core::modules::{DynamicModule, ModuleRef};
use waku_core::WakuFactory;

type EventLog = Arc<Mutex<Vec<String>>>;

fn record(log: &EventLog, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

struct Recorder {
    name: &'static str,
    log: EventLog,
    fail_init: bool,
}

impl Recorder {
    fn new(name: &'static str, log: EventLog) -> Self {
        Self {
            name,
            log,
            fail_init: false,
        }
    }

    fn failing(name: &'static str, log: EventLog) -> Self {
        Self {
            name,
            log,
            fail_init: true,
        }
    }
}

impl Extension for Recorder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_init(&self) -> Option<&dyn OnModuleInit> {
        Some(self)
    }

    fn as_destroy(&self) -> Option<&dyn OnModuleDestroy> {
        Some(self)
    }
}

#[async_trait]
impl OnModuleInit for Recorder {
    async fn on_module_init(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        record(&self.log, format!("init:{}", self.name));
        if self.fail_init {
            anyhow::bail!("{} refused to initialize", self.name);
        }
        Ok(())
    }
}

#[async_trait]
impl OnModuleDestroy for Recorder {
    async fn on_module_destroy(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        record(&self.log, format!("destroy:{}", self.name));
        Ok(())
    }
}

struct AppRecorder {
    log: EventLog,
}

impl Extension for AppRecorder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_application_init(&self) -> Option<&dyn OnApplicationInit> {
        Some(self)
    }

    fn as_after_application_init(&self) -> Option<&dyn AfterApplicationInit> {
        Some(self)
    }

    fn as_application_shutdown(&self) -> Option<&dyn OnApplicationShutdown> {
        Some(self)
    }
}

#[async_trait]
impl OnApplicationInit for AppRecorder {
    async fn on_application_init(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        record(&self.log, "app_init");
        Ok(())
    }
}

#[async_trait]
impl AfterApplicationInit for AppRecorder {
    async fn after_application_init(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        record(&self.log, "app_after_init");
        Ok(())
    }
}

#[async_trait]
impl OnApplicationShutdown for AppRecorder {
    async fn on_application_shutdown(&self, _ctx: &HookContext<'_>) -> anyhow::Result<()> {
        record(&self.log, "app_shutdown");
        Ok(())
    }
}

struct RecordingLifespan {
    name: &'static str,
    log: EventLog,
}

#[async_trait]
impl Lifespan for RecordingLifespan {
    async fn start(&self) -> anyhow::Result<()> {
        record(&self.log, format!("lifespan_start:{}", self.name));
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        record(&self.log, format!("lifespan_stop:{}", self.name));
        Ok(())
    }
}

fn two_module_app(log: &EventLog) -> ModuleRef {
    let inner = DynamicModule::new("InnerModule")
        .with_extension(Recorder::new("inner", log.clone()));
    ModuleRef::dynamic(
        DynamicModule::new("RootModule")
            .import_ref(ModuleRef::dynamic(inner))
            .with_extension(Recorder::new("root", log.clone())),
    )
}

#[tokio::test]
async fn startup_and_shutdown_mirror_each_other() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));

    let app = WakuFactory::from_ref(two_module_app(&log))
        .with_extension(AppRecorder { log: log.clone() })
        .with_lifespan(RecordingLifespan {
            name: "first",
            log: log.clone(),
        })
        .with_lifespan(RecordingLifespan {
            name: "second",
            log: log.clone(),
        })
        .create()
        .unwrap();

    app.start().await.unwrap();
    app.shutdown().await.unwrap();

    let entries = log.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            // init: dependencies first
            "init:inner".to_string(),
            "init:root".to_string(),
            "app_init".to_string(),
            "lifespan_start:first".to_string(),
            "lifespan_start:second".to_string(),
            "app_after_init".to_string(),
            // exit is the exact mirror
            "lifespan_stop:second".to_string(),
            "lifespan_stop:first".to_string(),
            "destroy:root".to_string(),
            "destroy:inner".to_string(),
            "app_shutdown".to_string(),
        ]
    );
}

#[tokio::test]
async fn start_and_shutdown_are_idempotent() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let app = WakuFactory::from_ref(two_module_app(&log)).create().unwrap();

    app.start().await.unwrap();
    app.start().await.unwrap();
    app.shutdown().await.unwrap();
    app.shutdown().await.unwrap();

    let entries = log.lock().unwrap().clone();
    let inits = entries.iter().filter(|e| e.starts_with("init:")).count();
    let destroys = entries.iter().filter(|e| e.starts_with("destroy:")).count();
    assert_eq!(inits, 2);
    assert_eq!(destroys, 2);
}

#[tokio::test]
async fn failed_init_destroys_already_initialized_modules_lifo() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));

    let first = DynamicModule::new("FirstModule")
        .with_extension(Recorder::new("first", log.clone()));
    let second = DynamicModule::new("SecondModule")
        .with_extension(Recorder::failing("second", log.clone()));
    let root = DynamicModule::new("FailingRoot")
        .import_ref(ModuleRef::dynamic(first))
        .import_ref(ModuleRef::dynamic(second));

    let app = WakuFactory::from_ref(ModuleRef::dynamic(root)).create().unwrap();
    let error = app.start().await.unwrap_err();
    assert!(error.to_string().contains("OnModuleInit"));
    assert!(error.to_string().contains("SecondModule"));

    let entries = log.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "init:first".to_string(),
            "init:second".to_string(),
            // the failed module never completed init, so only the first
            // module is destroyed
            "destroy:first".to_string(),
        ]
    );
}

#[tokio::test]
async fn failed_init_unwinds_earlier_extensions_of_the_same_module() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));

    let dependency = DynamicModule::new("DepModule")
        .with_extension(Recorder::new("dep", log.clone()));
    // Three extensions on one module; the third refuses to initialize.
    let root = DynamicModule::new("MixedRoot")
        .import_ref(ModuleRef::dynamic(dependency))
        .with_extension(Recorder::new("a", log.clone()))
        .with_extension(Recorder::new("b", log.clone()))
        .with_extension(Recorder::failing("c", log.clone()));

    let app = WakuFactory::from_ref(ModuleRef::dynamic(root)).create().unwrap();
    let error = app.start().await.unwrap_err();
    assert!(error.to_string().contains("MixedRoot"));

    let entries = log.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "init:dep".to_string(),
            "init:a".to_string(),
            "init:b".to_string(),
            "init:c".to_string(),
            // the failing module's already-initialized extensions unwind
            // first, in reverse, then the fully initialized module
            "destroy:b".to_string(),
            "destroy:a".to_string(),
            "destroy:dep".to_string(),
        ]
    );
}

#[tokio::test]
async fn run_until_wraps_start_and_shutdown() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let app = WakuFactory::from_ref(two_module_app(&log)).create().unwrap();

    let answer = app.run_until(async { 42 }).await.unwrap();
    assert_eq!(answer, 42);

    let entries = log.lock().unwrap().clone();
    assert!(entries.contains(&"init:inner".to_string()));
    assert!(entries.contains(&"destroy:inner".to_string()));
}
