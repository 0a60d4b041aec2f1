mod arango;
mod config;
mod memory;
mod mongo;
mod neo4j;
mod polyglot;
mod setup;
mod store;
mod unified;

pub mod prelude {
    /// Registers both engines from the `[stores]` config section.
    ///
    /// This is a good place to start if you are writing a new scenario.
    pub use crate::setup::register_engines;

    pub use crate::arango::ArangoStore;
    pub use crate::config::{ArangoConfig, Backend, MongoConfig, Neo4jConfig, StoresConfig};
    pub use crate::memory::{MemoryDocumentStore, MemoryGraphStore};
    pub use crate::mongo::MongoStore;
    pub use crate::neo4j::Neo4jStore;
    pub use crate::polyglot::{PolyglotAdapter, POLYGLOT_ENGINE};
    pub use crate::store::{CategoryAverage, CategoryCount, DocumentStore, GraphStore};
    pub use crate::unified::{UnifiedAdapter, UNIFIED_ENGINE};

    /// Re-export of the `model_tunnel_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your scenarios.
    pub use model_tunnel_runner::prelude::*;

    /// Re-export of the core prelude, for records, operations and the adapter trait.
    pub use model_tunnel_core::prelude::*;
}
