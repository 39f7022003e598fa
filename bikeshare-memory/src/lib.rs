//! In-memory storage backend for bikeshare.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It is meant for development and tests: it emulates the part of the document
//! database the models rely on without a running server.
//!
//! # Features
//!
//! - **Filtering and sorting** - Dotted paths, numeric widening, array membership
//! - **Geospatial search** - `$geoNear` over GeoJSON points with spherical distances
//! - **Upsert by id** - `save` replaces a record with the same `_id` or appends it
//!
//! # Quick Start
//!
//! ```ignore
//! use bikeshare::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder()
//!         .collection("systems", [doc! { "_id": "velib", "name": "Vélib'" }])
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let mut network = Document::<Network, _>::new(&store);
//!     network.read("velib").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;
pub mod evaluator;
pub mod geo;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
