use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;

use model_tunnel_core::prelude::{
    AdapterError, EngineAdapter, InsertMode, Operation, OperationKind, Record, Shard, ShardPool,
    WorkUnit,
};
use model_tunnel_instruments::{report_operation, OperationRecord, Reporter};

use crate::store::DocumentStore;

pub const UNIFIED_ENGINE: &str = "unified";

/// The single multi-model engine: every operation goes to one store.
pub struct UnifiedAdapter {
    store: Arc<dyn DocumentStore>,
    processes: Vec<String>,
    pool: ShardPool,
    reporter: Arc<Reporter>,
}

impl UnifiedAdapter {
    /// `workers` bounds how many shards of a concurrent insert are written at once.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        processes: Vec<String>,
        workers: usize,
        reporter: Arc<Reporter>,
    ) -> Self {
        Self {
            store,
            processes,
            pool: ShardPool::new(workers),
            reporter,
        }
    }

    fn error(&self, operation: OperationKind, source: anyhow::Error) -> AdapterError {
        AdapterError::backend(self.store.backend(), operation, source)
    }

    async fn bulk_insert(
        &self,
        shards: &[Shard],
        mode: InsertMode,
    ) -> Result<Duration, AdapterError> {
        let units: Vec<WorkUnit> = match mode {
            InsertMode::Serial => {
                let store = self.store.clone();
                let shards = shards.to_vec();
                vec![async move {
                    for shard in shards {
                        insert(store.as_ref(), &shard).await?;
                    }
                    Ok::<_, AdapterError>(())
                }
                .boxed()]
            }
            InsertMode::Concurrent => shards
                .iter()
                .map(|shard| {
                    let store = self.store.clone();
                    let shard = shard.clone();
                    async move { insert(store.as_ref(), &shard).await }.boxed()
                })
                .collect(),
        };

        self.pool.run_timed(units).await
    }

    async fn point_lookup(&self, id: &str) -> Result<Duration, AdapterError> {
        let started = Instant::now();
        let found = self
            .store
            .find_one(id)
            .await
            .map_err(|e| self.error(OperationKind::PointLookup, e))?;
        let elapsed = started.elapsed();

        match found {
            Some(_) => Ok(elapsed),
            None => Err(AdapterError::NotFound {
                backend: self.store.backend().to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn aggregate(&self) -> Result<Duration, AdapterError> {
        let started = Instant::now();
        let groups = self
            .store
            .average_price_by_category()
            .await
            .map_err(|e| self.error(OperationKind::Aggregate, e))?;
        let elapsed = started.elapsed();

        log::trace!("Unified aggregation returned {} categories", groups.len());
        Ok(elapsed)
    }

    async fn clear(&self) -> Result<Duration, AdapterError> {
        let started = Instant::now();
        self.store
            .delete_all()
            .await
            .map_err(|e| self.error(OperationKind::Clear, e))?;
        Ok(started.elapsed())
    }
}

async fn insert(store: &dyn DocumentStore, shard: &[Record]) -> Result<(), AdapterError> {
    store
        .insert_many(shard)
        .await
        .map_err(|e| AdapterError::backend(store.backend(), OperationKind::BulkInsert, e))
}

#[async_trait::async_trait]
impl EngineAdapter for UnifiedAdapter {
    fn name(&self) -> &str {
        UNIFIED_ENGINE
    }

    fn processes(&self) -> &[String] {
        &self.processes
    }

    async fn execute(&self, operation: &Operation) -> Result<Duration, AdapterError> {
        let record = OperationRecord::new(format!("{UNIFIED_ENGINE}.{}", operation.kind()))
            .with_attr("backend", self.store.backend());

        let result = match operation {
            Operation::BulkInsert { shards, mode } => self.bulk_insert(shards, *mode).await,
            Operation::PointLookup { id } => self.point_lookup(id).await,
            Operation::Aggregate => self.aggregate().await,
            Operation::Clear => self.clear().await,
        };

        report_operation(&self.reporter, record, &result);
        result
    }
}
