use std::sync::Arc;

use crate::application::Application;
use crate::config::{ValidationPolicy, WakuConfiguration};
use crate::container::{compose, AppContainer};
use crate::context::Context;
use crate::errors::WakuError;
use crate::extensions::Extension;
use crate::lifespan::Lifespan;
use crate::modules::{ModuleDef, ModuleRef, RegistryBuilder};
use crate::validation::{AccessibilityRule, ValidationContext, ValidationRule};

/// Builds an [`Application`] from a root module.
///
/// `create` runs the whole composition pipeline (registry build, container
/// composition, validation) and either returns a ready application or one
/// aggregate error enumerating every diagnostic.
pub struct WakuFactory {
    root: ModuleRef,
    context: Context,
    lifespans: Vec<Arc<dyn Lifespan>>,
    extensions: Vec<Arc<dyn Extension>>,
    configuration: WakuConfiguration,
    rules: Vec<Arc<dyn ValidationRule>>,
}

impl WakuFactory {
    pub fn new<M: ModuleDef>() -> Self {
        Self::from_ref(ModuleRef::of::<M>())
    }

    pub fn from_ref(root: ModuleRef) -> Self {
        Self {
            root,
            context: Context::new(),
            lifespans: Vec::new(),
            extensions: Vec::new(),
            configuration: WakuConfiguration::default(),
            rules: vec![Arc::new(AccessibilityRule)],
        }
    }

    /// The APP-level context map, read by activators and APP-scoped
    /// contextual providers.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Attach a lifespan; declaration order is enter order.
    pub fn with_lifespan(mut self, lifespan: impl Lifespan) -> Self {
        self.lifespans.push(Arc::new(lifespan));
        self
    }

    /// Attach an application-level extension, owned by the root module.
    pub fn with_extension(mut self, extension: impl Extension) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn with_extension_arc(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn with_configuration(mut self, configuration: WakuConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Add a validation rule on top of the built-in accessibility rule.
    pub fn with_validation_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Run the composition pipeline and produce the application.
    pub fn create(self) -> Result<Application, WakuError> {
        let registry = RegistryBuilder::new(self.root)
            .with_app_extensions(self.extensions)
            .build()
            .map_err(|error| WakuError::aggregate(vec![error]))?;

        let mut diagnostics = Vec::new();
        let registrations = match compose(&registry, &self.context) {
            Ok(map) => Some(map),
            Err(mut errors) => {
                diagnostics.append(&mut errors);
                None
            }
        };

        let ctx = ValidationContext {
            registry: &registry,
            app_context: &self.context,
        };
        for rule in &self.rules {
            let violations = rule.validate(&ctx);
            if violations.is_empty() {
                continue;
            }
            match self.configuration.validation {
                ValidationPolicy::Strict => diagnostics.extend(violations),
                ValidationPolicy::Lenient => {
                    for violation in violations {
                        tracing::warn!(rule = rule.name(), error = %violation, "validation violation");
                    }
                }
            }
        }

        if !diagnostics.is_empty() {
            return Err(WakuError::aggregate(diagnostics));
        }

        let registrations = registrations.expect("no diagnostics implies composition succeeded");
        let container = AppContainer::new(registrations, self.context);
        Ok(Application::new(
            Arc::new(registry),
            container,
            self.lifespans,
        ))
    }
}
