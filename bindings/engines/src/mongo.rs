use anyhow::Context;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};

use model_tunnel_core::prelude::Record;

use crate::config::MongoConfig;
use crate::store::{CategoryAverage, DocumentStore};

const BACKEND: &str = "mongodb";

/// A MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoStore {
    collection: Collection<Record>,
}

impl MongoStore {
    /// Connect and check the server answers.
    ///
    /// The driver pool holds up to `pool_size` connections, one per concurrent worker.
    pub async fn connect(config: &MongoConfig, pool_size: usize) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .with_context(|| format!("Invalid MongoDB uri {}", config.uri))?;
        options.max_pool_size = Some(pool_size.max(1) as u32);
        options.app_name = Some("model-tunnel".to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB did not answer ping")?;

        Ok(Self {
            collection: database.collection(&config.collection),
        })
    }
}

fn category_average(group: Document) -> anyhow::Result<CategoryAverage> {
    Ok(CategoryAverage {
        category: group.get_str("_id")?.to_string(),
        avg_price: group.get_f64("avg_price")?,
    })
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn insert_many(&self, records: &[Record]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        self.collection.insert_many(records).await?;
        Ok(())
    }

    async fn find_one(&self, id: &str) -> anyhow::Result<Option<Record>> {
        Ok(self.collection.find_one(doc! { "id": id }).await?)
    }

    async fn average_price_by_category(&self) -> anyhow::Result<Vec<CategoryAverage>> {
        let groups: Vec<Document> = self
            .collection
            .aggregate(vec![doc! {
                "$group": { "_id": "$category", "avg_price": { "$avg": "$price" } }
            }])
            .await?
            .try_collect()
            .await?;

        groups.into_iter().map(category_average).collect()
    }

    async fn delete_all(&self) -> anyhow::Result<()> {
        let deleted = self.collection.delete_many(doc! {}).await?;
        log::trace!("Deleted {} documents from MongoDB", deleted.deleted_count);
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_document_maps_to_category_average() {
        let average = category_average(doc! { "_id": "Garden", "avg_price": 42.5 }).unwrap();
        assert_eq!("Garden", average.category);
        assert_eq!(42.5, average.avg_price);
    }

    #[test]
    fn group_without_average_is_an_error() {
        assert!(category_average(doc! { "_id": "Garden" }).is_err());
    }
}
