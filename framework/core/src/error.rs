use std::process::ExitStatus;
use std::time::Duration;

use crate::operation::OperationKind;
use crate::shutdown::ShutdownSignalError;

/// Collecting resource statistics for a process failed.
///
/// Never fatal: the caller records an absent reading instead of a value.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("resource sampling is disabled")]
    Disabled,
    #[error("failed to run stats command for `{target}`")]
    Spawn {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stats command for `{target}` exited with {status}: {stderr}")]
    CommandFailed {
        target: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("stats command for `{target}` did not finish within {:.1}s", .limit.as_secs_f64())]
    TimedOut { target: String, limit: Duration },
    #[error("no running process matches `{0}`")]
    NotFound(String),
    #[error("malformed stats payload for `{target}`: {reason}")]
    Malformed { target: String, reason: String },
}

/// An operation against a backend failed. Fails the trial, not the run.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{operation} failed on {backend}")]
    Backend {
        backend: String,
        operation: OperationKind,
        #[source]
        source: anyhow::Error,
    },
    #[error("no record with id `{id}` found in {backend}")]
    NotFound { backend: String, id: String },
    #[error("worker {worker} failed")]
    Worker {
        worker: usize,
        #[source]
        source: Box<AdapterError>,
    },
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
    #[error(transparent)]
    Timeout(#[from] TrialTimeoutError),
    #[error(transparent)]
    Cancelled(#[from] ShutdownSignalError),
}

impl AdapterError {
    pub fn backend(
        backend: impl Into<String>,
        operation: OperationKind,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Backend {
            backend: backend.into(),
            operation,
            source: source.into(),
        }
    }
}

/// An operation did not finish within the configured per-trial budget.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("trial did not complete within {:.1}s", .limit.as_secs_f64())]
pub struct TrialTimeoutError {
    pub limit: Duration,
}

/// The harness could not reach a state where both engines are comparable.
///
/// Fatal for the scenario, or for the tier when raised while preparing tier data.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to connect to {backend}")]
    Connect {
        backend: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to prepare tier {tier} on {engine}")]
    Prepare {
        tier: usize,
        engine: String,
        #[source]
        source: AdapterError,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Render an error with its causes, `outer: inner: root`.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    anyhow::Chain::new(error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn causes_are_printed_once_in_the_chain() {
        let err = AdapterError::Worker {
            worker: 3,
            source: Box::new(AdapterError::backend(
                "mongodb",
                OperationKind::BulkInsert,
                anyhow::anyhow!("connection reset"),
            )),
        };

        assert_eq!("worker 3 failed", err.to_string());
        assert_eq!(
            "worker 3 failed: bulk_insert failed on mongodb: connection reset",
            error_chain(&err)
        );
    }

    #[test]
    fn timeout_is_an_adapter_error() {
        let err: AdapterError = TrialTimeoutError {
            limit: Duration::from_millis(1500),
        }
        .into();

        assert!(matches!(err, AdapterError::Timeout(_)));
        assert_eq!("trial did not complete within 1.5s", err.to_string());
    }
}
