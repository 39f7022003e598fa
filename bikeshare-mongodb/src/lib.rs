//! MongoDB backend implementation for bikeshare.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters, sorting and the `$geoNear` search are executed by the server; the
//! `stations` collection needs a `2dsphere` index on `location`.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! bikeshare = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bikeshare::{backend::StoreBackendBuilder, mongodb::MongoDbStore, settings::Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load_from_file("bikeshare.toml")?.with_env_overrides();
//!     let backend = MongoDbStore::builder_from_settings(&settings.database)
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;
pub mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
