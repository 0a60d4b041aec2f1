use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use model_tunnel_core::prelude::Record;

use crate::config::ArangoConfig;
use crate::store::{CategoryAverage, DocumentStore};

const BACKEND: &str = "arangodb";

/// Documents are pulled from a cursor in batches of this size.
const CURSOR_BATCH_SIZE: usize = 1000;

/// A collection of an ArangoDB database, driven through the HTTP API.
#[derive(Debug, Clone)]
pub struct ArangoStore {
    client: Client,
    /// `<url>/_db/<database>`
    db_url: String,
    collection: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorBatch<T> {
    result: Vec<T>,
    #[serde(default)]
    has_more: bool,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionCount {
    count: u64,
}

impl ArangoStore {
    /// Connect and make sure the collection exists.
    ///
    /// Up to `pool_size` connections are kept open so that concurrent workers do not queue on a
    /// single connection.
    pub async fn connect(config: &ArangoConfig, pool_size: usize) -> anyhow::Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(pool_size.max(1))
            .connect_timeout(Duration::from_secs(5))
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;

        let store = Self {
            client,
            db_url: format!(
                "{}/_db/{}",
                config.url.trim_end_matches('/'),
                config.database
            ),
            collection: config.collection.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        };
        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> anyhow::Result<()> {
        let url = format!("{}/_api/collection/{}", self.db_url, self.collection);
        let response = self.authorized(self.client.get(&url)).send().await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                log::info!("Creating ArangoDB collection {}", self.collection);
                let _: Value = self
                    .send(
                        self.client
                            .post(format!("{}/_api/collection", self.db_url))
                            .json(&json!({ "name": self.collection })),
                    )
                    .await?;
                Ok(())
            }
            status => bail!(
                "ArangoDB returned {status} for collection {}",
                self.collection
            ),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> anyhow::Result<T> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("ArangoDB returned {status}: {body}");
        }

        Ok(response.json().await?)
    }

    /// Run an AQL query and read every batch of its cursor.
    async fn query<T: DeserializeOwned>(&self, aql: &str, bind_vars: Value) -> anyhow::Result<Vec<T>> {
        let mut batch: CursorBatch<T> = self
            .send(self.client.post(format!("{}/_api/cursor", self.db_url)).json(&json!({
                "query": aql,
                "bindVars": bind_vars,
                "batchSize": CURSOR_BATCH_SIZE,
            })))
            .await?;

        let mut results = std::mem::take(&mut batch.result);
        while batch.has_more {
            let id = batch
                .id
                .as_deref()
                .context("ArangoDB cursor has more results but no id")?;
            batch = self
                .send(
                    self.client
                        .put(format!("{}/_api/cursor/{id}", self.db_url)),
                )
                .await?;
            results.append(&mut batch.result);
        }

        Ok(results)
    }
}

#[async_trait::async_trait]
impl DocumentStore for ArangoStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn insert_many(&self, records: &[Record]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // The batch endpoint reports per-document failures inside a successful response.
        let outcomes: Vec<Value> = self
            .send(
                self.client
                    .post(format!("{}/_api/document/{}", self.db_url, self.collection))
                    .json(records),
            )
            .await?;

        let failed = outcomes
            .iter()
            .filter(|o| o.get("error").and_then(Value::as_bool) == Some(true))
            .count();
        if failed > 0 {
            bail!(
                "{failed} of {} documents were rejected by ArangoDB",
                records.len()
            );
        }

        Ok(())
    }

    async fn find_one(&self, id: &str) -> anyhow::Result<Option<Record>> {
        let mut found: Vec<Record> = self
            .query(
                "FOR p IN @@collection FILTER p.id == @id LIMIT 1 RETURN p",
                json!({ "@collection": self.collection, "id": id }),
            )
            .await?;

        Ok(found.pop())
    }

    async fn average_price_by_category(&self) -> anyhow::Result<Vec<CategoryAverage>> {
        self.query(
            "FOR p IN @@collection \
             COLLECT category = p.category AGGREGATE avg_price = AVERAGE(p.price) \
             RETURN { category, avg_price }",
            json!({ "@collection": self.collection }),
        )
        .await
    }

    async fn delete_all(&self) -> anyhow::Result<()> {
        let _: Value = self
            .send(self.client.put(format!(
                "{}/_api/collection/{}/truncate",
                self.db_url, self.collection
            )))
            .await?;
        Ok(())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        let count: CollectionCount = self
            .send(self.client.get(format!(
                "{}/_api/collection/{}/count",
                self.db_url, self.collection
            )))
            .await?;
        Ok(count.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_batch_parses_arango_response() {
        let batch: CursorBatch<CategoryAverage> = serde_json::from_str(
            r#"{"result":[{"category":"Books","avg_price":12.5}],"hasMore":true,"id":"1234","count":2,"error":false,"code":201}"#,
        )
        .unwrap();

        assert!(batch.has_more);
        assert_eq!(Some("1234"), batch.id.as_deref());
        assert_eq!("Books", batch.result[0].category);
    }

    #[test]
    fn final_batch_has_no_more() {
        let batch: CursorBatch<Record> = serde_json::from_str(
            r#"{"result":[{"_key":"1","_id":"Products/1","_rev":"_a","id":"abc","name":"Amber Atlas","price":9.99,"category":"Toys"}],"hasMore":false}"#,
        )
        .unwrap();

        assert!(!batch.has_more);
        assert_eq!("abc", batch.result[0].id);
        assert_eq!(999, batch.result[0].price.cents());
    }
}
