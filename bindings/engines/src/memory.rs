use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::bail;
use parking_lot::Mutex;

use model_tunnel_core::prelude::Record;

use crate::store::{CategoryAverage, CategoryCount, DocumentStore, GraphStore};

/// Failure and latency injection shared by the in-memory stores.
#[derive(Debug, Default)]
struct Faults {
    write_delay: Duration,
    fail_writes: AtomicBool,
    fail_lookups: AtomicBool,
    lookups: AtomicUsize,
}

impl Faults {
    async fn write(&self, backend: &str) -> anyhow::Result<()> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("{backend} rejected the write");
        }
        Ok(())
    }

    fn lookup(&self, backend: &str) -> anyhow::Result<()> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            bail!("{backend} lookup failed");
        }
        Ok(())
    }
}

fn group_by_category(records: &[Record]) -> BTreeMap<&str, (u64, u64)> {
    let mut groups: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for record in records {
        let (count, cents) = groups.entry(record.category.as_str()).or_default();
        *count += 1;
        *cents += u64::from(record.price.cents());
    }
    groups
}

/// A document store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    backend: String,
    records: Mutex<Vec<Record>>,
    faults: Faults,
}

impl MemoryDocumentStore {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Default::default()
        }
    }

    /// Delay every write, to make concurrency visible in timings.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.faults.write_delay = delay;
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.faults.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.faults.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Number of `find_one` calls so far.
    pub fn lookups(&self) -> usize {
        self.faults.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend(&self) -> &str {
        &self.backend
    }

    async fn insert_many(&self, records: &[Record]) -> anyhow::Result<()> {
        self.faults.write(&self.backend).await?;
        self.records.lock().extend_from_slice(records);
        Ok(())
    }

    async fn find_one(&self, id: &str) -> anyhow::Result<Option<Record>> {
        self.faults.lookup(&self.backend)?;
        Ok(self.records.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn average_price_by_category(&self) -> anyhow::Result<Vec<CategoryAverage>> {
        let records = self.records.lock();
        Ok(group_by_category(&records)
            .into_iter()
            .map(|(category, (count, cents))| CategoryAverage {
                category: category.to_string(),
                avg_price: cents as f64 / 100.0 / count as f64,
            })
            .collect())
    }

    async fn delete_all(&self) -> anyhow::Result<()> {
        self.faults.write(&self.backend).await?;
        self.records.lock().clear();
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        Ok(self.records.lock().len() as u64)
    }
}

/// A graph store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    backend: String,
    nodes: Mutex<Vec<Record>>,
    faults: Faults,
}

impl MemoryGraphStore {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Default::default()
        }
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.faults.write_delay = delay;
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.faults.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.faults.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Number of `match_node` calls so far.
    pub fn lookups(&self) -> usize {
        self.faults.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryGraphStore {
    fn backend(&self) -> &str {
        &self.backend
    }

    async fn create_nodes(&self, records: &[Record]) -> anyhow::Result<()> {
        self.faults.write(&self.backend).await?;
        self.nodes.lock().extend_from_slice(records);
        Ok(())
    }

    async fn match_node(&self, id: &str) -> anyhow::Result<bool> {
        self.faults.lookup(&self.backend)?;
        Ok(self.nodes.lock().iter().any(|r| r.id == id))
    }

    async fn count_by_category(&self) -> anyhow::Result<Vec<CategoryCount>> {
        let nodes = self.nodes.lock();
        Ok(group_by_category(&nodes)
            .into_iter()
            .map(|(category, (total, _))| CategoryCount {
                category: category.to_string(),
                total,
            })
            .collect())
    }

    async fn delete_all(&self) -> anyhow::Result<()> {
        self.faults.write(&self.backend).await?;
        self.nodes.lock().clear();
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        Ok(self.nodes.lock().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use model_tunnel_core::prelude::{Price, WorkloadGenerator};

    use super::*;

    fn record(id: &str, category: &str, cents: u32) -> Record {
        Record {
            id: id.to_string(),
            name: "Cedar Comet".to_string(),
            price: Price::from_cents(cents).unwrap(),
            category: category.to_string(),
        }
    }

    #[tokio::test]
    async fn averages_group_by_category() {
        let store = MemoryDocumentStore::new("memory-document");
        store
            .insert_many(&[
                record("a", "Books", 1000),
                record("b", "Books", 2000),
                record("c", "Toys", 499),
            ])
            .await
            .unwrap();

        let averages = store.average_price_by_category().await.unwrap();
        assert_eq!(
            vec![
                CategoryAverage {
                    category: "Books".to_string(),
                    avg_price: 15.0
                },
                CategoryAverage {
                    category: "Toys".to_string(),
                    avg_price: 4.99
                },
            ],
            averages
        );
    }

    #[tokio::test]
    async fn graph_counts_and_matches() {
        let store = MemoryGraphStore::new("memory-graph");
        let records = WorkloadGenerator::new().generate(25);
        store.create_nodes(&records).await.unwrap();

        assert!(store.match_node(&records[3].id).await.unwrap());
        assert!(!store.match_node("missing").await.unwrap());
        assert_eq!(2, store.lookups());

        let total: u64 = store
            .count_by_category()
            .await
            .unwrap()
            .iter()
            .map(|c| c.total)
            .sum();
        assert_eq!(25, total);

        store.delete_all().await.unwrap();
        assert_eq!(0, store.count().await.unwrap());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let store = MemoryDocumentStore::new("memory-document");
        store.fail_writes(true);
        assert!(store.insert_many(&[record("a", "Books", 100)]).await.is_err());
        assert_eq!(0, store.count().await.unwrap());

        store.fail_lookups(true);
        assert!(store.find_one("a").await.is_err());
    }
}
