use std::time::Duration;

use crate::error::AdapterError;
use crate::operation::Operation;

/// One storage architecture under test.
///
/// Connections are established before the adapter is handed to the runner, so that
/// [EngineAdapter::execute] only ever measures the operation itself.
#[async_trait::async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Identity of the engine in results, e.g. `unified` or `polyglot`.
    fn name(&self) -> &str;

    /// Identities of the processes or containers hosting this engine's backends.
    fn processes(&self) -> &[String];

    /// Execute `operation`, returning the wall time of exactly that operation.
    async fn execute(&self, operation: &Operation) -> Result<Duration, AdapterError>;
}
