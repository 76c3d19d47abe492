use waku_core::container::{AppContainer, ContextToken, OverrideToken};
use waku_core::context::Context;
use waku_core::provider::Provider;

use crate::TestError;

/// Temporarily swap providers and context entries on the APP-scope container.
///
/// Restores the previous registrations (and whatever they had cached) when
/// the guard drops, so tests can scope their doubles with a block. Only the
/// APP container is accepted; request scopes are a different type and do not
/// typecheck here.
pub fn override_providers(
    container: &AppContainer,
    providers: Vec<Provider>,
    context: Context,
) -> Result<OverrideGuard<'_>, TestError> {
    let mut guard = OverrideGuard {
        container,
        tokens: Vec::new(),
        context_token: None,
    };
    for provider in providers {
        tracing::debug!(
            interface = provider.interface().type_name(),
            "installing provider override"
        );
        guard.tokens.push(container.install_override(provider)?);
    }
    if !context.is_empty() {
        guard.context_token = Some(container.override_context(context)?);
    }
    Ok(guard)
}

/// Active set of overrides; dropping it restores the container.
pub struct OverrideGuard<'a> {
    container: &'a AppContainer,
    tokens: Vec<OverrideToken>,
    context_token: Option<ContextToken>,
}

impl Drop for OverrideGuard<'_> {
    fn drop(&mut self) {
        for token in self.tokens.drain(..).rev() {
            if self.container.restore_override(token).is_err() {
                tracing::warn!("failed to restore an overridden provider");
            }
        }
        if let Some(token) = self.context_token.take() {
            if self.container.restore_context(token).is_err() {
                tracing::warn!("failed to restore the overridden context");
            }
        }
    }
}
