use async_trait::async_trait;

/// A paired start/stop resource tied to the application lifetime.
///
/// Lifespans enter in declaration order after every init hook has run, and
/// exit in reverse order before module destroy hooks: earlier-acquired
/// outlives later-acquired.
#[async_trait]
pub trait Lifespan: Send + Sync + 'static {
    async fn start(&self) -> anyhow::Result<()>;

    async fn stop(&self) -> anyhow::Result<()>;
}
