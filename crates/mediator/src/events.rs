use async_trait::async_trait;

use crate::contracts::PipelineFuture;
use crate::errors::MediatorError;

/// Strategy for delivering one event to its handlers. The mediator builds the
/// handler invocations (in deterministic order: topological module order,
/// then declaration order) and hands them to the strategy.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish_all(&self, handlers: Vec<PipelineFuture<()>>) -> anyhow::Result<()>;
}

/// Invoke handlers one by one in declaration order. The first failure aborts
/// the iteration and propagates; subsequent handlers do not run.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialPublisher;

#[async_trait]
impl EventPublisher for SequentialPublisher {
    async fn publish_all(&self, handlers: Vec<PipelineFuture<()>>) -> anyhow::Result<()> {
        for handler in handlers {
            handler.await?;
        }
        Ok(())
    }
}

/// Schedule handlers concurrently on a task group: all start before any
/// completes. The first failure cancels the handlers still running; every
/// failure observed before the group drains propagates as one aggregate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConcurrentPublisher;

#[async_trait]
impl EventPublisher for ConcurrentPublisher {
    async fn publish_all(&self, handlers: Vec<PipelineFuture<()>>) -> anyhow::Result<()> {
        let mut tasks = tokio::task::JoinSet::new();
        for handler in handlers {
            tasks.spawn(handler);
        }
        let mut failures: Vec<anyhow::Error> = Vec::new();
        let mut cancelled = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    if failures.is_empty() {
                        tasks.abort_all();
                    }
                    failures.push(error);
                }
                Err(join_error) if join_error.is_cancelled() => cancelled += 1,
                Err(join_error) => {
                    if failures.is_empty() {
                        tasks.abort_all();
                    }
                    failures.push(anyhow::Error::new(join_error));
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MediatorError::GroupedPublish {
                cancelled,
                errors: failures,
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn invocation(
        counter: Arc<AtomicUsize>,
        fail: bool,
    ) -> PipelineFuture<()> {
        Box::pin(async move {
            if fail {
                anyhow::bail!("handler failed");
            }
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test]
    async fn sequential_stops_at_first_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handlers = vec![
            invocation(counter.clone(), false),
            invocation(counter.clone(), true),
            invocation(counter.clone(), false),
        ];
        let result = SequentialPublisher.publish_all(handlers).await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_runs_every_handler_on_success() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handlers = vec![
            invocation(counter.clone(), false),
            invocation(counter.clone(), false),
            invocation(counter.clone(), false),
        ];
        ConcurrentPublisher.publish_all(handlers).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn concurrent_aggregates_every_observed_failure() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handlers = vec![
            invocation(counter.clone(), true),
            invocation(counter.clone(), false),
            invocation(counter.clone(), true),
        ];
        let error = ConcurrentPublisher.publish_all(handlers).await.unwrap_err();
        match error.downcast_ref::<MediatorError>() {
            Some(MediatorError::GroupedPublish { errors, .. }) => {
                // Both failing handlers had already completed when the group
                // drained, so both failures are reported at once.
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().all(|e| e.to_string() == "handler failed"));
            }
            other => panic!("expected GroupedPublish, got {other:?}"),
        }
    }
}
