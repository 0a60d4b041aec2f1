use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// A shard of records handed to one unit of execution.
pub type Shard = Arc<[Record]>;

/// How the shards of a bulk insert are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    /// Shards are written one after another from a single unit of execution.
    Serial,
    /// Every shard, and for multi-store engines every backend of a shard, gets its own unit.
    Concurrent,
}

/// One logical operation that an engine executes and times.
#[derive(Debug, Clone)]
pub enum Operation {
    BulkInsert { shards: Arc<[Shard]>, mode: InsertMode },
    PointLookup { id: String },
    Aggregate,
    /// Remove every benchmark record so that the next trial starts from an empty backend.
    Clear,
}

impl Operation {
    pub fn bulk_insert(shards: Vec<Shard>, mode: InsertMode) -> Self {
        Self::BulkInsert {
            shards: shards.into(),
            mode,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::BulkInsert { .. } => OperationKind::BulkInsert,
            Self::PointLookup { .. } => OperationKind::PointLookup,
            Self::Aggregate => OperationKind::Aggregate,
            Self::Clear => OperationKind::Clear,
        }
    }

    /// Total records carried by a bulk insert, zero for every other operation.
    pub fn record_count(&self) -> usize {
        match self {
            Self::BulkInsert { shards, .. } => shards.iter().map(|shard| shard.len()).sum(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    #[display("bulk_insert")]
    BulkInsert,
    #[display("point_lookup")]
    PointLookup,
    #[display("aggregate")]
    Aggregate,
    #[display("clear")]
    Clear,
}
