use serde::Deserialize;

use model_tunnel_core::prelude::Record;

/// Mean price of the records in one category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryAverage {
    pub category: String,
    pub avg_price: f64,
}

/// Number of records in one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub total: u64,
}

/// A store holding records as documents. Backs the unified engine and the document half of the
/// polyglot engine.
///
/// Implementations must be safe to call from many workers at once. Each call checks a connection
/// out of the store's pool, so concurrent workers never share a session.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the backend in errors and reports, e.g. `mongodb`.
    fn backend(&self) -> &str;

    async fn insert_many(&self, records: &[Record]) -> anyhow::Result<()>;

    async fn find_one(&self, id: &str) -> anyhow::Result<Option<Record>>;

    async fn average_price_by_category(&self) -> anyhow::Result<Vec<CategoryAverage>>;

    async fn delete_all(&self) -> anyhow::Result<()>;

    async fn count(&self) -> anyhow::Result<u64>;
}

/// A store holding records as `Product` nodes.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    fn backend(&self) -> &str;

    async fn create_nodes(&self, records: &[Record]) -> anyhow::Result<()>;

    /// Whether a node with this id exists.
    async fn match_node(&self, id: &str) -> anyhow::Result<bool>;

    async fn count_by_category(&self) -> anyhow::Result<Vec<CategoryCount>>;

    async fn delete_all(&self) -> anyhow::Result<()>;

    async fn count(&self) -> anyhow::Result<u64>;
}
