use thiserror::Error;

/// Core error type for the waku framework
#[derive(Debug, Error)]
pub enum WakuError {
    #[error("module import cycle detected: {}", .path.join(" -> "))]
    ModuleCycle { path: Vec<String> },

    #[error("module '{name}' is already present in the registry")]
    DuplicateModule { name: String },

    #[error("module '{name}' is not part of the discovered tree")]
    UnknownModule { name: String },

    #[error("extension hook '{hook}' failed for module '{module}': {source}")]
    Extension {
        module: String,
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "conflicting providers for '{interface}': declared by both '{first}' and '{second}' \
         and neither carries the override marker"
    )]
    ProviderConflict {
        interface: &'static str,
        first: String,
        second: String,
    },

    #[error(
        "scope mismatch: app-scoped provider '{provider}' depends on request-scoped '{dependency}'"
    )]
    ScopeMismatch {
        provider: &'static str,
        dependency: &'static str,
    },

    #[error("provider dependency cycle detected: {}", .path.join(" -> "))]
    ProviderCycle { path: Vec<String> },

    #[error(
        "'{required}' required by provider '{required_by}' in module '{module}' is not \
         accessible; export it from its declaring module and import that module from \
         '{module}', mark the declaring module global, or declare the provider in '{module}' \
         itself"
    )]
    DependencyInaccessible {
        required: &'static str,
        required_by: &'static str,
        module: String,
    },

    #[error("no provider registered for '{type_name}'")]
    ProviderNotFound { type_name: &'static str },

    #[error("'{type_name}' is request-scoped and cannot be resolved outside a request scope")]
    OutOfScope { type_name: &'static str },

    #[error("provider for '{type_name}' produced a value of an unexpected type")]
    TypeMismatch { type_name: &'static str },

    #[error("factory for '{type_name}' failed: {source}")]
    Factory {
        type_name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("context entry '{type_name}' missing from the {scope} context")]
    ContextMissing {
        type_name: &'static str,
        scope: &'static str,
    },

    #[error("activator for marker '{marker}' failed: {source}")]
    Activator {
        marker: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("activation predicate references unknown marker '{marker}'")]
    UnknownMarker { marker: String },

    #[error("lock poisoned on resource: {resource}")]
    Lock { resource: &'static str },

    #[error("the request scope backing this handle has already been closed")]
    ScopeClosed,

    #[error(
        "application startup failed with {} diagnostic(s):\n{}",
        .errors.len(),
        format_error_list(.errors)
    )]
    Aggregate { errors: Vec<WakuError> },
}

fn format_error_list(errors: &[WakuError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl WakuError {
    /// Create an extension error with module provenance
    pub fn extension(
        module: impl Into<String>,
        hook: &'static str,
        source: anyhow::Error,
    ) -> Self {
        Self::Extension {
            module: module.into(),
            hook,
            source,
        }
    }

    /// Wrap a list of startup diagnostics into a single aggregate error.
    ///
    /// Always aggregates, even for a single diagnostic, so callers can rely on
    /// one shape for every startup failure.
    pub fn aggregate(errors: Vec<WakuError>) -> Self {
        Self::Aggregate { errors }
    }

    /// The diagnostics carried by an aggregate error, or a slice of one for
    /// any other kind.
    pub fn diagnostics(&self) -> &[WakuError] {
        match self {
            Self::Aggregate { errors } => errors,
            _ => std::slice::from_ref(self),
        }
    }

    /// Check if the error is a module cycle error
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::ModuleCycle { .. })
    }

    /// Check if the error is an accessibility violation
    pub fn is_inaccessible(&self) -> bool {
        matches!(self, Self::DependencyInaccessible { .. })
    }

    /// Check if the error is a provider conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ProviderConflict { .. })
    }
}
