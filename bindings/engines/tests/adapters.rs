use std::sync::Arc;
use std::time::Duration;

use model_tunnel_engines::prelude::*;
use model_tunnel_instruments::Reporter;

struct Polyglot {
    document: Arc<MemoryDocumentStore>,
    graph: Arc<MemoryGraphStore>,
    adapter: PolyglotAdapter,
}

fn polyglot(workers: usize, write_delay: Duration) -> Polyglot {
    let document = Arc::new(MemoryDocumentStore::new("memory-document").with_write_delay(write_delay));
    let graph = Arc::new(MemoryGraphStore::new("memory-graph").with_write_delay(write_delay));
    let adapter = PolyglotAdapter::new(
        document.clone(),
        graph.clone(),
        Vec::new(),
        workers,
        Arc::new(Reporter::noop()),
    );

    Polyglot {
        document,
        graph,
        adapter,
    }
}

fn unified(workers: usize) -> (Arc<MemoryDocumentStore>, UnifiedAdapter) {
    let store = Arc::new(MemoryDocumentStore::new("memory-unified"));
    let adapter = UnifiedAdapter::new(
        store.clone(),
        vec!["arangodb".to_string()],
        workers,
        Arc::new(Reporter::noop()),
    );
    (store, adapter)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_insert_writes_every_shard_to_both_stores() {
    let polyglot = polyglot(5, Duration::ZERO);
    let shards = WorkloadGenerator::new().generate_shards(100, 5);

    polyglot
        .adapter
        .execute(&Operation::bulk_insert(shards.clone(), InsertMode::Concurrent))
        .await
        .unwrap();
    assert_eq!(100, polyglot.document.count().await.unwrap());
    assert_eq!(100, polyglot.graph.count().await.unwrap());

    // A cleared engine accepts the same workload again without leftovers.
    polyglot.adapter.execute(&Operation::Clear).await.unwrap();
    polyglot
        .adapter
        .execute(&Operation::bulk_insert(shards, InsertMode::Concurrent))
        .await
        .unwrap();
    assert_eq!(100, polyglot.document.count().await.unwrap());
    assert_eq!(100, polyglot.graph.count().await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_worker_inserts_the_same_total() {
    let polyglot = polyglot(1, Duration::ZERO);
    let shards = WorkloadGenerator::new().generate_shards(100, 1);

    polyglot
        .adapter
        .execute(&Operation::bulk_insert(shards, InsertMode::Concurrent))
        .await
        .unwrap();

    assert_eq!(100, polyglot.document.count().await.unwrap());
    assert_eq!(100, polyglot.graph.count().await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_insert_is_timed_as_wall_clock() {
    let delay = Duration::from_millis(50);
    let shards = WorkloadGenerator::new().generate_shards(40, 4);

    let serial = polyglot(4, delay)
        .adapter
        .execute(&Operation::bulk_insert(shards.clone(), InsertMode::Serial))
        .await
        .unwrap();
    let concurrent = polyglot(4, delay)
        .adapter
        .execute(&Operation::bulk_insert(shards, InsertMode::Concurrent))
        .await
        .unwrap();

    // Serial writes eight batches back to back, concurrent writes them all at once.
    assert!(serial >= delay * 8, "serial took {serial:?}");
    assert!(concurrent < serial, "concurrent {concurrent:?} vs serial {serial:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_write_fails_the_whole_insert() {
    let polyglot = polyglot(2, Duration::ZERO);
    polyglot.graph.fail_writes(true);

    let err = polyglot
        .adapter
        .execute(&Operation::bulk_insert(
            WorkloadGenerator::new().generate_shards(10, 2),
            InsertMode::Concurrent,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::Worker { .. }), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn polyglot_lookup_visits_graph_then_document() {
    let polyglot = polyglot(1, Duration::ZERO);
    let shards = WorkloadGenerator::new().generate_shards(10, 1);
    let id = shards[0][4].id.clone();
    polyglot
        .adapter
        .execute(&Operation::bulk_insert(shards, InsertMode::Serial))
        .await
        .unwrap();

    polyglot
        .adapter
        .execute(&Operation::PointLookup { id })
        .await
        .unwrap();

    assert_eq!(1, polyglot.graph.lookups());
    assert_eq!(1, polyglot.document.lookups());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn polyglot_lookup_miss_skips_the_document_hop() {
    let polyglot = polyglot(1, Duration::ZERO);

    let err = polyglot
        .adapter
        .execute(&Operation::PointLookup {
            id: "missing".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        AdapterError::NotFound { backend, id } => {
            assert_eq!("memory-graph", backend);
            assert_eq!("missing", id);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(1, polyglot.graph.lookups());
    assert_eq!(0, polyglot.document.lookups());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn polyglot_lookup_fails_when_the_document_hop_fails() {
    let polyglot = polyglot(1, Duration::ZERO);
    let shards = WorkloadGenerator::new().generate_shards(3, 1);
    let id = shards[0][0].id.clone();
    polyglot
        .adapter
        .execute(&Operation::bulk_insert(shards, InsertMode::Serial))
        .await
        .unwrap();
    polyglot.document.fail_lookups(true);

    let err = polyglot
        .adapter
        .execute(&Operation::PointLookup { id })
        .await
        .unwrap_err();

    assert!(
        matches!(&err, AdapterError::Backend { backend, .. } if backend == "memory-document"),
        "{err}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unified_lookup_hits_and_misses() {
    let (store, adapter) = unified(1);
    let shards = WorkloadGenerator::new().generate_shards(10, 1);
    let id = shards[0][9].id.clone();
    adapter
        .execute(&Operation::bulk_insert(shards, InsertMode::Serial))
        .await
        .unwrap();

    adapter.execute(&Operation::PointLookup { id }).await.unwrap();
    let err = adapter
        .execute(&Operation::PointLookup {
            id: "missing".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::NotFound { .. }), "{err}");
    assert_eq!(2, store.lookups());
    assert_eq!(&["arangodb".to_string()], adapter.processes());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn aggregation_runs_on_both_engines() {
    let shards = WorkloadGenerator::new().generate_shards(50, 1);

    let (_, unified) = unified(1);
    let polyglot = polyglot(1, Duration::ZERO);
    for engine in [&unified as &dyn EngineAdapter, &polyglot.adapter] {
        engine
            .execute(&Operation::bulk_insert(shards.clone(), InsertMode::Serial))
            .await
            .unwrap();
        engine.execute(&Operation::Aggregate).await.unwrap();
    }

    let total: u64 = polyglot
        .graph
        .count_by_category()
        .await
        .unwrap()
        .iter()
        .map(|c| c.total)
        .sum();
    assert_eq!(50, total);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clear_empties_both_stores() {
    let polyglot = polyglot(1, Duration::ZERO);
    polyglot
        .adapter
        .execute(&Operation::bulk_insert(
            WorkloadGenerator::new().generate_shards(7, 1),
            InsertMode::Serial,
        ))
        .await
        .unwrap();

    polyglot.adapter.execute(&Operation::Clear).await.unwrap();

    assert_eq!(0, polyglot.document.count().await.unwrap());
    assert_eq!(0, polyglot.graph.count().await.unwrap());
    assert_eq!(POLYGLOT_ENGINE, polyglot.adapter.name());
}
