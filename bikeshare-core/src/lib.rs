//! Core of the bike-share data-access layer.
//!
//! Maps the `systems`, `stations` and `station_stats` collections of a document
//! database onto JSON projections for a read-mostly HTTP API:
//!
//! - **Record wrapper** ([`document`]) - Generic [`Document`](document::Document) holding one stored record
//! - **Entities** ([`model`]) - Network, Station and Stat projections
//! - **Nearby search** ([`nearby`]) - Nearest stations around a point
//! - **Encoders** ([`encode`]) - JSON rendering of date-times, identifiers and models
//! - **Queries and pipelines** ([`query`], [`pipeline`]) - What is sent to the backend
//! - **Backend abstraction** ([`backend`]) - The database boundary
//! - **Store and collections** ([`store`], [`collection`]) - Request-scoped handles
//! - **Settings** ([`settings`]) - URL prefix and database location
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use bikeshare::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//!
//! let mut network = Document::<Network, _>::new(&store);
//! network.read("velib").await?;
//! network.resolve_stations().await?;
//!
//! let body = network.map_data(None)?;
//! ```

pub mod backend;
pub mod collection;
pub mod document;
pub mod encode;
pub mod error;
pub mod model;
pub mod nearby;
pub mod pipeline;
pub mod query;
pub mod settings;
pub mod store;
