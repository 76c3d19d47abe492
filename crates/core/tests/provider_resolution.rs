//! Provider composition and resolution: scopes, caching, conditional
//! activation, multi-bindings, overrides and finalization.

use std::sync::{Arc, Mutex};

use waku_core::container::Resolver;
use waku_core::modules::{DynamicModule, ModuleDef, ModuleMetadata, ModuleRef};
use waku_core::provider::{
    activator, contextual, injectable, many, scoped, singleton, transient, Inject, Predicate,
    ProviderScope, TypeKey,
};
use waku_core::{Context, WakuError, WakuFactory};

// --- scenario: greeting ----------------------------------------------------

trait GreetingService: Send + Sync + std::fmt::Debug {
    fn greet(&self, name: &str) -> String;
}

#[derive(Debug)]
struct EnglishGreeting;

impl GreetingService for EnglishGreeting {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}!")
    }
}

struct GreetingModule;

impl ModuleDef for GreetingModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("GreetingModule")
            .with_provider(scoped::<dyn GreetingService, _>(|_| Ok(Arc::new(EnglishGreeting))))
            .export::<dyn GreetingService>()
    }
}

struct GreetingRoot;

impl ModuleDef for GreetingRoot {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("GreetingRoot").import::<GreetingModule>()
    }
}

#[test]
fn greeting_service_resolves_and_greets() {
    let app = WakuFactory::new::<GreetingRoot>().create().unwrap();
    let scope = app.scope();
    let service = scope.resolve::<dyn GreetingService>().unwrap();
    assert_eq!(service.greet("waku"), "Hello, waku!");
}

#[test]
fn scoped_provider_is_cached_within_one_scope_only() {
    let app = WakuFactory::new::<GreetingRoot>().create().unwrap();

    let scope = app.scope();
    let first = scope.resolve::<dyn GreetingService>().unwrap();
    let second = scope.resolve::<dyn GreetingService>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let other_scope = app.scope();
    let third = other_scope.resolve::<dyn GreetingService>().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn request_scoped_provider_rejected_outside_request_scope() {
    let app = WakuFactory::new::<GreetingRoot>().create().unwrap();
    let error = app.container().resolve::<dyn GreetingService>().unwrap_err();
    assert!(matches!(error, WakuError::OutOfScope { .. }));
}

// --- scenario: cross-module dependency ------------------------------------

trait Logger: Send + Sync {
    fn log(&self, message: &str);
    fn entries(&self) -> Vec<String>;
}

#[derive(Default)]
struct ConsoleLogger {
    entries: Mutex<Vec<String>>,
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        self.entries.lock().unwrap().push(message.to_string());
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

struct UserService {
    logger: Arc<dyn Logger>,
}

impl UserService {
    fn create_user(&self, name: &str) -> String {
        self.logger.log(&format!("Created user: {name}"));
        format!("user_{name}")
    }
}

impl Inject for UserService {
    fn dependencies() -> Vec<TypeKey> {
        vec![TypeKey::of::<dyn Logger>()]
    }

    fn inject(resolver: &Resolver<'_>) -> Result<Self, WakuError> {
        Ok(Self {
            logger: resolver.resolve::<dyn Logger>()?,
        })
    }
}

struct InfraModule;

impl ModuleDef for InfraModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("InfraModule")
            .with_provider(singleton::<dyn Logger, _>(|_| Ok(Arc::new(ConsoleLogger::default()))))
            .export::<dyn Logger>()
    }
}

struct UserModule;

impl ModuleDef for UserModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("UserModule")
            .import::<InfraModule>()
            .with_provider(injectable::<UserService>(ProviderScope::Request))
    }
}

struct UserRoot;

impl ModuleDef for UserRoot {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("UserRoot").import::<UserModule>()
    }
}

#[test]
fn cross_module_dependency_resolves_through_export() {
    let app = WakuFactory::new::<UserRoot>().create().unwrap();
    let scope = app.scope();

    let service = scope.resolve::<UserService>().unwrap();
    assert_eq!(service.create_user("alice"), "user_alice");

    let logger = scope.resolve::<dyn Logger>().unwrap();
    assert_eq!(logger.entries(), vec!["Created user: alice".to_string()]);
}

// --- scenario: conditional activation --------------------------------------

struct UseRedis(bool);

trait Cache: Send + Sync {
    fn backend(&self) -> &'static str;
}

struct RedisCache;

impl Cache for RedisCache {
    fn backend(&self) -> &'static str {
        "redis"
    }
}

struct InMemoryCache;

impl Cache for InMemoryCache {
    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct CacheModule;

impl ModuleDef for CacheModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("CacheModule")
            .with_activator(activator("USE_REDIS", |ctx| {
                Ok(ctx.get::<UseRedis>().map(|flag| flag.0).unwrap_or(false))
            }))
            .with_provider(
                singleton::<dyn Cache, _>(|_| Ok(Arc::new(RedisCache)))
                    .when(Predicate::marker("USE_REDIS")),
            )
            .with_provider(
                singleton::<dyn Cache, _>(|_| Ok(Arc::new(InMemoryCache)))
                    .when(!Predicate::marker("USE_REDIS")),
            )
            .export::<dyn Cache>()
    }
}

struct CacheRoot;

impl ModuleDef for CacheRoot {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("CacheRoot").import::<CacheModule>()
    }
}

#[test]
fn activation_picks_redis_when_context_flag_is_set() {
    let app = WakuFactory::new::<CacheRoot>()
        .with_context(Context::new().with(UseRedis(true)))
        .create()
        .unwrap();
    let cache = app.container().resolve::<dyn Cache>().unwrap();
    assert_eq!(cache.backend(), "redis");
}

#[test]
fn activation_picks_in_memory_when_context_flag_is_unset() {
    let app = WakuFactory::new::<CacheRoot>()
        .with_context(Context::new().with(UseRedis(false)))
        .create()
        .unwrap();
    let cache = app.container().resolve::<dyn Cache>().unwrap();
    assert_eq!(cache.backend(), "memory");
}

// --- scenario: multi-binding -----------------------------------------------

trait Plugin: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;
}

#[derive(Debug)]
struct AuthPlugin;

impl Plugin for AuthPlugin {
    fn name(&self) -> &'static str {
        "auth"
    }
}

#[derive(Debug)]
struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn name(&self) -> &'static str {
        "logging"
    }
}

#[derive(Debug)]
struct MetricsPlugin;

impl Plugin for MetricsPlugin {
    fn name(&self) -> &'static str {
        "metrics"
    }
}

struct PluginModule;

impl ModuleDef for PluginModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new("PluginModule").with_providers(
            many::<dyn Plugin>()
                .add::<AuthPlugin, _, _>(|_| Ok(Arc::new(AuthPlugin)), |p| p)
                .add::<LoggingPlugin, _, _>(|_| Ok(Arc::new(LoggingPlugin)), |p| p)
                .add::<MetricsPlugin, _, _>(|_| Ok(Arc::new(MetricsPlugin)), |p| p),
        )
    }
}

#[test]
fn multi_binding_collects_in_declaration_order() {
    let app = WakuFactory::new::<PluginModule>().create().unwrap();
    let plugins = app.container().resolve::<Vec<Arc<dyn Plugin>>>().unwrap();
    let names: Vec<_> = plugins.iter().map(|plugin| plugin.name()).collect();
    assert_eq!(names, vec!["auth", "logging", "metrics"]);

    // Elements stay individually resolvable.
    assert!(app.container().resolve::<AuthPlugin>().is_ok());
}

#[test]
fn multi_binding_without_collect_emits_only_elements() {
    let module = DynamicModule::new("BarePlugins").with_providers(
        many::<dyn Plugin>()
            .collect(false)
            .add::<AuthPlugin, _, _>(|_| Ok(Arc::new(AuthPlugin)), |p| p),
    );
    let app = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .create()
        .unwrap();
    assert!(app.container().resolve::<AuthPlugin>().is_ok());
    assert!(matches!(
        app.container().resolve::<Vec<Arc<dyn Plugin>>>().unwrap_err(),
        WakuError::ProviderNotFound { .. }
    ));
}

// --- conflicts, overrides, scope mismatch ----------------------------------

#[test]
fn conflicting_providers_without_override_fail_startup() {
    let module = DynamicModule::new("Conflicted")
        .with_provider(singleton::<dyn Cache, _>(|_| Ok(Arc::new(RedisCache))))
        .with_provider(singleton::<dyn Cache, _>(|_| Ok(Arc::new(InMemoryCache))));
    let error = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .create()
        .unwrap_err();
    assert!(error.diagnostics().iter().any(|d| d.is_conflict()));
}

#[test]
fn override_marker_replaces_earlier_registration() {
    let module = DynamicModule::new("Overridden")
        .with_provider(singleton::<dyn Cache, _>(|_| Ok(Arc::new(RedisCache))))
        .with_provider(
            singleton::<dyn Cache, _>(|_| Ok(Arc::new(InMemoryCache))).with_override(),
        );
    let app = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .create()
        .unwrap();
    assert_eq!(app.container().resolve::<dyn Cache>().unwrap().backend(), "memory");
}

#[test]
fn app_scoped_provider_must_not_depend_on_request_scoped() {
    let module = DynamicModule::new("Mismatched")
        .with_provider(scoped::<dyn Logger, _>(|_| Ok(Arc::new(ConsoleLogger::default()))))
        .with_provider(
            singleton::<UserService, _>(|resolver| {
                Ok(Arc::new(UserService {
                    logger: resolver.resolve::<dyn Logger>()?,
                }))
            })
            .depends_on::<dyn Logger>(),
        );
    let error = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .create()
        .unwrap_err();
    assert!(error
        .diagnostics()
        .iter()
        .any(|d| matches!(d, WakuError::ScopeMismatch { .. })));
}

// --- contextual providers ---------------------------------------------------

#[derive(Debug, PartialEq)]
struct TenantId(&'static str);

#[test]
fn contextual_provider_projects_request_context() {
    let module = DynamicModule::new("Tenancy")
        .with_provider(contextual::<TenantId>(ProviderScope::Request));
    let app = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .create()
        .unwrap();

    let scope = app.scope_with(Context::new().with(TenantId("acme")));
    assert_eq!(*scope.resolve::<TenantId>().unwrap(), TenantId("acme"));

    let bare_scope = app.scope();
    assert!(matches!(
        bare_scope.resolve::<TenantId>().unwrap_err(),
        WakuError::ContextMissing { .. }
    ));
}

#[test]
fn contextual_app_provider_projects_factory_context() {
    let module = DynamicModule::new("AppTenancy")
        .with_provider(contextual::<TenantId>(ProviderScope::App));
    let app = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .with_context(Context::new().with(TenantId("root")))
        .create()
        .unwrap();
    assert_eq!(*app.container().resolve::<TenantId>().unwrap(), TenantId("root"));
}

// --- aliases ----------------------------------------------------------------

trait Reader: Send + Sync {
    fn id(&self) -> usize;
}

trait Writer: Send + Sync {
    fn id(&self) -> usize;
}

struct Store(usize);

impl Reader for Store {
    fn id(&self) -> usize {
        self.0
    }
}

impl Writer for Store {
    fn id(&self) -> usize {
        self.0
    }
}

#[test]
fn alias_bindings_share_one_cached_instance() {
    let module = DynamicModule::new("Aliased").with_provider(
        singleton::<Store, _>(|_| Ok(Arc::new(Store(7))))
            .provides::<dyn Reader, _>(|store| store)
            .provides::<dyn Writer, _>(|store| store),
    );
    let app = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .create()
        .unwrap();

    let store = app.container().resolve::<Store>().unwrap();
    let reader = app.container().resolve::<dyn Reader>().unwrap();
    let writer = app.container().resolve::<dyn Writer>().unwrap();
    assert_eq!(store.0, 7);
    assert_eq!(reader.id(), 7);
    assert_eq!(writer.id(), 7);

    let again = app.container().resolve::<Store>().unwrap();
    assert!(Arc::ptr_eq(&store, &again));
}

// --- transient + finalization ----------------------------------------------

struct Session {
    log: Arc<Mutex<Vec<String>>>,
    tag: &'static str,
}

#[test]
fn transient_provider_constructs_anew_each_resolution() {
    let module = DynamicModule::new("Sessions").with_provider(transient::<Store, _>(|_| {
        Ok(Arc::new(Store(1)))
    }));
    let app = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .create()
        .unwrap();
    let scope = app.scope();
    let first = scope.resolve::<Store>().unwrap();
    let second = scope.resolve::<Store>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn finalizers_run_lifo_on_scope_exit() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let log_a = log.clone();
    let log_b = log.clone();
    let log_c = log.clone();
    let module = DynamicModule::new("Finalized")
        .with_provider(
            scoped::<Session, _>(move |_| {
                Ok(Arc::new(Session {
                    log: log_a.clone(),
                    tag: "session",
                }))
            })
            .finalize(|session| {
                session
                    .log
                    .lock()
                    .unwrap()
                    .push(format!("finalize:{}", session.tag));
            }),
        )
        .with_provider(
            scoped::<dyn Reader, _>(move |_| {
                log_b.lock().unwrap().push("construct:reader".into());
                Ok(Arc::new(Store(2)))
            })
            .finalize(move |_| {
                log_c.lock().unwrap().push("finalize:reader".into());
            }),
        );
    let app = WakuFactory::from_ref(ModuleRef::dynamic(module))
        .create()
        .unwrap();

    {
        let scope = app.scope();
        let session = scope.resolve::<Session>().unwrap();
        session.log.lock().unwrap().push("construct:session".into());
        let _reader = scope.resolve::<dyn Reader>().unwrap();
    }

    // Reader was acquired last, so it finalizes first.
    let entries = log.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "construct:session".to_string(),
            "construct:reader".to_string(),
            "finalize:reader".to_string(),
            "finalize:session".to_string(),
        ]
    );
}
