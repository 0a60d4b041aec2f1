use serde::Deserialize;

/// Which stores the engines talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ArangoDB, MongoDB and Neo4j over the network.
    #[default]
    Live,
    /// In-process stores, for dry runs of a scenario without any database.
    Memory,
}

/// The `[stores]` configuration section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoresConfig {
    pub backend: Backend,
    pub unified: ArangoConfig,
    pub document: MongoConfig,
    pub graph: Neo4jConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArangoConfig {
    pub url: String,
    pub database: String,
    pub collection: String,
    pub username: String,
    pub password: String,
    /// Container or process to sample.
    pub process: String,
}

impl Default for ArangoConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8529".to_string(),
            database: "_system".to_string(),
            collection: "Products".to_string(),
            username: "root".to_string(),
            password: "arangopass".to_string(),
            process: "arangodb".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    pub process: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "BenchmarkingDB".to_string(),
            collection: "Products".to_string(),
            process: "mongodb".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub process: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: "testpass".to_string(),
            process: "neo4j".to_string(),
        }
    }
}
