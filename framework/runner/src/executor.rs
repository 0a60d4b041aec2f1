use std::future::Future;
use std::time::Duration;

use model_tunnel_core::prelude::{
    AdapterError, ShutdownHandle, ShutdownSignalError, TrialTimeoutError,
};

#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// Note that the future will be cancelled if the runner is shutdown. You do not need to do anything
    /// special to handle this, but you should be aware that submitting a future which does not support
    /// cancelling may prevent the runner from shutting down.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Run one engine operation in place with a time limit.
    ///
    /// An operation that is still running after `limit` is dropped and reported as
    /// [AdapterError::Timeout]. A shutdown signal cancels it with [AdapterError::Cancelled].
    pub fn execute_trial<T>(
        &self,
        fut: impl Future<Output = Result<T, AdapterError>>,
        limit: Duration,
    ) -> Result<T, AdapterError> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = tokio::time::timeout(limit, fut) => {
                    result.unwrap_or_else(|_| Err(TrialTimeoutError { limit }.into()))
                },
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(ShutdownSignalError::default().into())
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> (Executor, ShutdownHandle) {
        let handle = ShutdownHandle::new();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        (Executor::new(runtime, handle.clone()), handle)
    }

    #[test]
    fn slow_operation_times_out() {
        let (executor, _) = executor();
        let result: Result<(), _> = executor.execute_trial(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
            Duration::from_millis(50),
        );

        assert!(matches!(result, Err(AdapterError::Timeout(_))));
    }

    #[test]
    fn operation_result_is_passed_through() {
        let (executor, _) = executor();
        let result = executor.execute_trial(async { Ok(7) }, Duration::from_secs(1));
        assert_eq!(7, result.unwrap());
    }

    #[test]
    fn shutdown_cancels_operation() {
        let (executor, handle) = executor();
        handle.shutdown();

        let result: Result<(), _> = executor.execute_trial(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
            Duration::from_secs(20),
        );

        assert!(matches!(result, Err(AdapterError::Cancelled(_))));
    }
}
