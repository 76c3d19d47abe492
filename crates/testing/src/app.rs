use std::ops::Deref;
use std::sync::Arc;

use waku_core::context::Context;
use waku_core::extensions::Extension;
use waku_core::modules::{DynamicModule, ModuleDef, ModuleRef};
use waku_core::provider::Provider;
use waku_core::{Application, WakuConfiguration, WakuFactory};

use crate::TestError;

/// A fully started application wrapped for tests.
///
/// Derefs to [`Application`]; call [`close`](Self::close) to tear down in
/// mirror order when the test is done.
pub struct TestApp {
    app: Application,
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::new()
    }

    pub fn app(&self) -> &Application {
        &self.app
    }

    /// Shut the application down in mirror order.
    pub async fn close(self) -> Result<(), TestError> {
        self.app.shutdown().await?;
        Ok(())
    }
}

impl Deref for TestApp {
    type Target = Application;

    fn deref(&self) -> &Self::Target {
        &self.app
    }
}

/// Composes a synthetic root module around the pieces a test supplies.
///
/// When a base module is set, every passed provider is marked as an override
/// of the base's declarations, so consumers resolve the test double no matter
/// which module originally declared the interface.
pub struct TestAppBuilder {
    base: Option<ModuleRef>,
    providers: Vec<Provider>,
    imports: Vec<ModuleRef>,
    extensions: Vec<Arc<dyn Extension>>,
    app_extensions: Vec<Arc<dyn Extension>>,
    context: Context,
    configuration: WakuConfiguration,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            base: None,
            providers: Vec::new(),
            imports: Vec::new(),
            extensions: Vec::new(),
            app_extensions: Vec::new(),
            context: Context::new(),
            configuration: WakuConfiguration::default(),
        }
    }

    /// Compose on top of an existing module; passed providers become
    /// overrides of its declarations.
    pub fn with_base<M: ModuleDef>(self) -> Self {
        self.with_base_ref(ModuleRef::of::<M>())
    }

    pub fn with_base_ref(mut self, base: ModuleRef) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<Provider>) -> Self {
        self.providers.push(provider.into());
        self
    }

    pub fn with_providers(mut self, providers: impl Into<Vec<Provider>>) -> Self {
        self.providers.extend(providers.into());
        self
    }

    pub fn with_import<M: ModuleDef>(self) -> Self {
        self.with_import_ref(ModuleRef::of::<M>())
    }

    pub fn with_import_ref(mut self, module: ModuleRef) -> Self {
        self.imports.push(module);
        self
    }

    /// Attach a module-level extension to the synthetic module.
    pub fn with_extension(mut self, extension: impl Extension) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Attach an application-level extension.
    pub fn with_app_extension(mut self, extension: impl Extension) -> Self {
        self.app_extensions.push(Arc::new(extension));
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_configuration(mut self, configuration: WakuConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Compose, create and start the application.
    pub async fn build(self) -> Result<TestApp, TestError> {
        let overriding = self.base.is_some();
        let mut module = DynamicModule::new("TestModule");
        if let Some(base) = self.base {
            module = module.import_ref(base);
        }
        for import in self.imports {
            module = module.import_ref(import);
        }
        for provider in self.providers {
            let provider = if overriding {
                provider.with_override()
            } else {
                provider
            };
            module = module.with_provider(provider);
        }
        for extension in self.extensions {
            module = module.with_extension_arc(extension);
        }

        let mut factory = WakuFactory::from_ref(ModuleRef::dynamic(module))
            .with_context(self.context)
            .with_configuration(self.configuration);
        for extension in self.app_extensions {
            factory = factory.with_extension_arc(extension);
        }

        let app = factory.create()?;
        app.start().await?;
        Ok(TestApp { app })
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
