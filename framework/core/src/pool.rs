use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};

use crate::error::AdapterError;
use crate::shutdown::ShutdownSignalError;

/// A unit of work for one worker, usually one backend write of one shard.
pub type WorkUnit = BoxFuture<'static, Result<(), AdapterError>>;

/// A fixed-size pool of concurrent workers with an explicit join barrier.
///
/// [ShardPool::run_timed] measures wall time from launching the units to joining the last
/// of them, so the result tracks the slowest worker rather than the sum of all workers.
#[derive(Debug, Clone)]
pub struct ShardPool {
    permits: Arc<Semaphore>,
}

impl ShardPool {
    /// A pool of `size` workers. A size of zero is treated as one.
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    /// Run every unit on the pool and wait for all of them.
    ///
    /// The first failing unit fails the whole batch and the remaining units are aborted.
    /// Must be called from within a multi-threaded Tokio runtime.
    pub async fn run_timed(&self, units: Vec<WorkUnit>) -> Result<Duration, AdapterError> {
        let mut workers = JoinSet::new();
        let mut task_workers = HashMap::new();

        let started = Instant::now();
        for (worker, unit) in units.into_iter().enumerate() {
            let permits = self.permits.clone();
            let handle = workers.spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail while the pool lives.
                let _permit = permits.acquire_owned().await;
                (worker, unit.await)
            });
            task_workers.insert(handle.id(), worker);
        }

        while let Some(joined) = workers.join_next().await {
            let failure = match joined {
                Ok((_, Ok(()))) => continue,
                Ok((worker, Err(e))) => AdapterError::Worker {
                    worker,
                    source: Box::new(e),
                },
                Err(e) => join_failure(&task_workers, e),
            };
            workers.abort_all();
            return Err(failure);
        }

        Ok(started.elapsed())
    }
}

/// Only a panic or an abort stops a worker task from returning its result.
fn join_failure(task_workers: &HashMap<task::Id, usize>, error: JoinError) -> AdapterError {
    let worker = task_workers.get(&error.id()).copied().unwrap_or_default();
    if error.is_panic() {
        log::error!("Worker {worker} panicked");
        AdapterError::WorkerPanicked { worker }
    } else {
        log::warn!("Worker {worker} was cancelled");
        AdapterError::Cancelled(ShutdownSignalError::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;
    use crate::operation::OperationKind;

    fn sleeper(millis: u64, counter: Arc<AtomicUsize>) -> WorkUnit {
        async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn elapsed_tracks_slowest_worker_not_sum() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ShardPool::new(5);

        let units = (0..5).map(|_| sleeper(100, counter.clone())).collect();
        let elapsed = pool.run_timed(units).await.unwrap();

        assert_eq!(5, counter.load(Ordering::SeqCst));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(450), "took {elapsed:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pool_of_one_serialises_units() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ShardPool::new(1);

        let units = (0..3).map(|_| sleeper(50, counter.clone())).collect();
        let elapsed = pool.run_timed(units).await.unwrap();

        assert_eq!(3, counter.load(Ordering::SeqCst));
        assert!(elapsed >= Duration::from_millis(150), "took {elapsed:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failing_unit_fails_the_batch() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ShardPool::new(2);

        let failing: WorkUnit = async {
            Err(AdapterError::backend(
                "graph",
                OperationKind::BulkInsert,
                anyhow::anyhow!("constraint violated"),
            ))
        }
        .boxed();
        let units = vec![sleeper(10, counter.clone()), failing];

        let err = pool.run_timed(units).await.unwrap_err();
        assert!(matches!(err, AdapterError::Worker { worker: 1, .. }), "{err}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_unit_is_reported_as_a_panic() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ShardPool::new(2);

        async fn crash() -> Result<(), AdapterError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            panic!("shard writer crashed");
        }
        let units = vec![sleeper(200, counter.clone()), crash().boxed()];

        let err = pool.run_timed(units).await.unwrap_err();
        assert!(matches!(err, AdapterError::WorkerPanicked { worker: 1 }), "{err}");
    }

    #[tokio::test]
    async fn empty_batch_is_immediate() {
        let elapsed = ShardPool::new(3).run_timed(Vec::new()).await.unwrap();
        assert!(elapsed < Duration::from_millis(50));
    }
}
