use std::collections::HashMap;

use anyhow::Context;
use neo4rs::{query, BoltType, ConfigBuilder, Graph};

use model_tunnel_core::prelude::Record;

use crate::config::Neo4jConfig;
use crate::store::{CategoryCount, GraphStore};

const BACKEND: &str = "neo4j";

/// `Product` nodes in a Neo4j database, reached over Bolt.
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl std::fmt::Debug for Neo4jStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jStore").finish_non_exhaustive()
    }
}

impl Neo4jStore {
    /// Connect with a pool of up to `pool_size` Bolt sessions.
    pub async fn connect(config: &Neo4jConfig, pool_size: usize) -> anyhow::Result<Self> {
        let neo_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .max_connections(pool_size.max(1))
            .build()
            .context("Invalid Neo4j configuration")?;

        let graph = Graph::connect(neo_config)
            .await
            .with_context(|| format!("Failed to connect to Neo4j at {}", config.uri))?;

        let store = Self { graph };
        // Fails fast on bad credentials rather than on the first trial.
        store.count().await?;

        Ok(store)
    }

    async fn single_count(&self, cypher: &str) -> anyhow::Result<u64> {
        let mut rows = self.graph.execute(query(cypher)).await?;
        let row = rows.next().await?.context("count query returned no row")?;
        let count: i64 = row.get("count")?;
        Ok(u64::try_from(count)?)
    }
}

/// Node properties of a record.
fn properties(record: &Record) -> HashMap<String, BoltType> {
    HashMap::from([
        ("id".to_string(), record.id.clone().into()),
        ("name".to_string(), record.name.clone().into()),
        ("price".to_string(), record.price.as_f64().into()),
        ("category".to_string(), record.category.clone().into()),
    ])
}

#[async_trait::async_trait]
impl GraphStore for Neo4jStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn create_nodes(&self, records: &[Record]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let props: Vec<HashMap<String, BoltType>> = records.iter().map(properties).collect();
        self.graph
            .run(query("UNWIND $props AS map CREATE (p:Product) SET p = map").param("props", props))
            .await?;
        Ok(())
    }

    async fn match_node(&self, id: &str) -> anyhow::Result<bool> {
        let mut rows = self
            .graph
            .execute(query("MATCH (p:Product {id: $id}) RETURN p.id AS id LIMIT 1").param("id", id))
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn count_by_category(&self) -> anyhow::Result<Vec<CategoryCount>> {
        let mut rows = self
            .graph
            .execute(query(
                "MATCH (p:Product) RETURN p.category AS category, count(p) AS total",
            ))
            .await?;

        let mut counts = Vec::new();
        while let Some(row) = rows.next().await? {
            let total: i64 = row.get("total")?;
            counts.push(CategoryCount {
                category: row.get("category")?,
                total: u64::try_from(total)?,
            });
        }
        Ok(counts)
    }

    async fn delete_all(&self) -> anyhow::Result<()> {
        self.graph
            .run(query("MATCH (p:Product) DETACH DELETE p"))
            .await?;
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        self.single_count("MATCH (p:Product) RETURN count(p) AS count")
            .await
    }
}
