use std::sync::Arc;

use model_tunnel_core::prelude::SetupError;
use model_tunnel_runner::prelude::{HookResult, RunnerContext};

use crate::arango::ArangoStore;
use crate::config::{Backend, StoresConfig};
use crate::memory::{MemoryDocumentStore, MemoryGraphStore};
use crate::mongo::MongoStore;
use crate::neo4j::Neo4jStore;
use crate::polyglot::PolyglotAdapter;
use crate::store::{DocumentStore, GraphStore};
use crate::unified::UnifiedAdapter;

/// Setup hook that connects the stores named in the `[stores]` config section and registers the
/// unified engine followed by the polyglot engine.
///
/// Connection pools hold at least one connection per configured worker.
pub fn register_engines(ctx: &mut RunnerContext) -> HookResult {
    let stores: StoresConfig = ctx.config_section("stores")?;
    let workers = ctx.config().workers;
    let reporter = ctx.reporter();

    match stores.backend {
        Backend::Memory => {
            log::info!("Using in-memory stores, resource usage will not be sampled");

            ctx.add_engine(UnifiedAdapter::new(
                Arc::new(MemoryDocumentStore::new("memory-unified")),
                Vec::new(),
                workers,
                reporter.clone(),
            ));
            ctx.add_engine(PolyglotAdapter::new(
                Arc::new(MemoryDocumentStore::new("memory-document")),
                Arc::new(MemoryGraphStore::new("memory-graph")),
                Vec::new(),
                workers,
                reporter,
            ));
        }
        Backend::Live => {
            let (unified, document, graph) = ctx.executor().execute_in_place({
                let stores = stores.clone();
                async move {
                    log::info!("Connecting to ArangoDB at {}", stores.unified.url);
                    let unified = ArangoStore::connect(&stores.unified, workers)
                        .await
                        .map_err(|source| SetupError::Connect {
                            backend: "arangodb".to_string(),
                            source,
                        })?;

                    log::info!("Connecting to MongoDB at {}", stores.document.uri);
                    let document = MongoStore::connect(&stores.document, workers)
                        .await
                        .map_err(|source| SetupError::Connect {
                            backend: "mongodb".to_string(),
                            source,
                        })?;

                    log::info!("Connecting to Neo4j at {}", stores.graph.uri);
                    let graph = Neo4jStore::connect(&stores.graph, workers)
                        .await
                        .map_err(|source| SetupError::Connect {
                            backend: "neo4j".to_string(),
                            source,
                        })?;

                    Ok::<_, anyhow::Error>((unified, document, graph))
                }
            })?;

            let document: Arc<dyn DocumentStore> = Arc::new(document);
            let graph: Arc<dyn GraphStore> = Arc::new(graph);

            ctx.add_engine(UnifiedAdapter::new(
                Arc::new(unified),
                vec![stores.unified.process],
                workers,
                reporter.clone(),
            ));
            ctx.add_engine(PolyglotAdapter::new(
                document,
                graph,
                vec![stores.document.process, stores.graph.process],
                workers,
                reporter,
            ));
        }
    }

    Ok(())
}
