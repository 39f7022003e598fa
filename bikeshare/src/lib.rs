//! Data-access layer for a bike-share API.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! `bikeshare-core` and gives access to the storage backends.
//!
//! # Features
//!
//! - **Record wrappers** - Explicit, typed field access over stored documents
//! - **Projections** - Network, Station and Stat shapes ready for JSON responses
//! - **Nearby search** - The 100 nearest stations within a distance of a point
//! - **Backends** - In-memory for development and tests, MongoDB for production
//!
//! # Quick Start
//!
//! ```ignore
//! use bikeshare::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     // A single network, with its stations
//!     let mut network = Document::<Network, _>::new(&store);
//!     network.read("velib").await?;
//!     network.resolve_stations().await?;
//!     let body = network.map_data(None)?;
//!
//!     // Only some keys of every network
//!     let networks = Document::<Network, _>::new(&store)
//!         .find(Query::new())
//!         .await?
//!         .map(|network| network.map_data(Some(["id", "name", "href"].as_slice())))
//!         .collect::<DocumentStoreResult<Vec<_>>>()?;
//!
//!     // Stations within 500 metres
//!     let mut nearby = Nearby::new(&store);
//!     nearby.near(2.3522, 48.8566, 500.0).await?;
//!     let body = nearby.map_data()?;
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use bikeshare_core::{
    backend, collection, document, encode, error, model, nearby, pipeline, query, settings, store,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use bikeshare_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use bikeshare_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
