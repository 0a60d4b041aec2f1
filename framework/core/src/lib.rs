mod adapter;
mod error;
mod operation;
mod pool;
mod record;
mod shutdown;
mod workload;

pub mod prelude {
    pub use crate::adapter::EngineAdapter;
    pub use crate::error::{error_chain, AdapterError, SampleError, SetupError, TrialTimeoutError};
    pub use crate::operation::{InsertMode, Operation, OperationKind, Shard};
    pub use crate::pool::{ShardPool, WorkUnit};
    pub use crate::record::{Price, Record};
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
    pub use crate::workload::{split_into_shards, WorkloadGenerator};
}
