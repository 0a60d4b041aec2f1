use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;

use model_tunnel_core::prelude::{
    AdapterError, EngineAdapter, InsertMode, Operation, OperationKind, Shard, ShardPool, WorkUnit,
};
use model_tunnel_instruments::{report_operation, OperationRecord, Reporter};

use crate::store::{DocumentStore, GraphStore};

pub const POLYGLOT_ENGINE: &str = "polyglot";

/// A document store paired with a graph store, written and queried together.
///
/// Point lookups resolve the node in the graph store first and only then fetch the document. A
/// graph miss ends the lookup with [AdapterError::NotFound] without the document hop.
pub struct PolyglotAdapter {
    document: Arc<dyn DocumentStore>,
    graph: Arc<dyn GraphStore>,
    processes: Vec<String>,
    pool: ShardPool,
    reporter: Arc<Reporter>,
}

/// Time a call to one backend and report it as a sub-operation.
async fn observe<T>(
    reporter: &Reporter,
    operation_id: &str,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    let record = OperationRecord::new(format!("{POLYGLOT_ENGINE}.{operation_id}"));
    let result = fut.await;
    report_operation(reporter, record, &result);
    result
}

fn insert_document(
    document: Arc<dyn DocumentStore>,
    reporter: Arc<Reporter>,
    shard: Shard,
) -> WorkUnit {
    async move {
        observe(&reporter, "document.insert_many", document.insert_many(&shard))
            .await
            .map_err(|e| AdapterError::backend(document.backend(), OperationKind::BulkInsert, e))
    }
    .boxed()
}

fn create_nodes(graph: Arc<dyn GraphStore>, reporter: Arc<Reporter>, shard: Shard) -> WorkUnit {
    async move {
        observe(&reporter, "graph.create_nodes", graph.create_nodes(&shard))
            .await
            .map_err(|e| AdapterError::backend(graph.backend(), OperationKind::BulkInsert, e))
    }
    .boxed()
}

impl PolyglotAdapter {
    /// Every shard of a concurrent insert is written to both stores at once, so up to
    /// `2 * workers` writes run in parallel.
    pub fn new(
        document: Arc<dyn DocumentStore>,
        graph: Arc<dyn GraphStore>,
        processes: Vec<String>,
        workers: usize,
        reporter: Arc<Reporter>,
    ) -> Self {
        Self {
            document,
            graph,
            processes,
            pool: ShardPool::new(workers.max(1) * 2),
            reporter,
        }
    }

    async fn bulk_insert(
        &self,
        shards: &[Shard],
        mode: InsertMode,
    ) -> Result<Duration, AdapterError> {
        let units: Vec<WorkUnit> = match mode {
            InsertMode::Serial => {
                let (document, graph, reporter) =
                    (self.document.clone(), self.graph.clone(), self.reporter.clone());
                let shards = shards.to_vec();
                vec![async move {
                    for shard in &shards {
                        insert_document(document.clone(), reporter.clone(), shard.clone()).await?;
                    }
                    for shard in &shards {
                        create_nodes(graph.clone(), reporter.clone(), shard.clone()).await?;
                    }
                    Ok::<_, AdapterError>(())
                }
                .boxed()]
            }
            InsertMode::Concurrent => shards
                .iter()
                .flat_map(|shard| {
                    [
                        insert_document(self.document.clone(), self.reporter.clone(), shard.clone()),
                        create_nodes(self.graph.clone(), self.reporter.clone(), shard.clone()),
                    ]
                })
                .collect(),
        };

        self.pool.run_timed(units).await
    }

    async fn point_lookup(&self, id: &str) -> Result<Duration, AdapterError> {
        let kind = OperationKind::PointLookup;
        let started = Instant::now();

        let exists = observe(&self.reporter, "graph.match_node", self.graph.match_node(id))
            .await
            .map_err(|e| AdapterError::backend(self.graph.backend(), kind, e))?;
        if !exists {
            return Err(AdapterError::NotFound {
                backend: self.graph.backend().to_string(),
                id: id.to_string(),
            });
        }

        let found = observe(&self.reporter, "document.find_one", self.document.find_one(id))
            .await
            .map_err(|e| AdapterError::backend(self.document.backend(), kind, e))?;
        let elapsed = started.elapsed();

        match found {
            Some(_) => Ok(elapsed),
            None => Err(AdapterError::NotFound {
                backend: self.document.backend().to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn aggregate(&self) -> Result<Duration, AdapterError> {
        let kind = OperationKind::Aggregate;
        let started = Instant::now();

        let averages = observe(
            &self.reporter,
            "document.average_price_by_category",
            self.document.average_price_by_category(),
        )
        .await
        .map_err(|e| AdapterError::backend(self.document.backend(), kind, e))?;
        let counts = observe(
            &self.reporter,
            "graph.count_by_category",
            self.graph.count_by_category(),
        )
        .await
        .map_err(|e| AdapterError::backend(self.graph.backend(), kind, e))?;
        let elapsed = started.elapsed();

        log::trace!(
            "Polyglot aggregation returned {} averages and {} counts",
            averages.len(),
            counts.len()
        );
        Ok(elapsed)
    }

    async fn clear(&self) -> Result<Duration, AdapterError> {
        let kind = OperationKind::Clear;
        let started = Instant::now();

        self.document
            .delete_all()
            .await
            .map_err(|e| AdapterError::backend(self.document.backend(), kind, e))?;
        self.graph
            .delete_all()
            .await
            .map_err(|e| AdapterError::backend(self.graph.backend(), kind, e))?;

        Ok(started.elapsed())
    }
}

#[async_trait::async_trait]
impl EngineAdapter for PolyglotAdapter {
    fn name(&self) -> &str {
        POLYGLOT_ENGINE
    }

    fn processes(&self) -> &[String] {
        &self.processes
    }

    async fn execute(&self, operation: &Operation) -> Result<Duration, AdapterError> {
        let record = OperationRecord::new(format!("{POLYGLOT_ENGINE}.{}", operation.kind()))
            .with_attr("document", self.document.backend())
            .with_attr("graph", self.graph.backend());

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
