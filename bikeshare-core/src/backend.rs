//! Storage backend abstraction.
//!
//! The [`StoreBackend`] trait is the database boundary of the crate: every read and
//! write performed by the models goes through it. Backends are trusted for query
//! correctness, indexing and geospatial computation; this layer never re-checks
//! their results.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The operations a storage backend must provide
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use bikeshare::backend::StoreBackend;
//! use bikeshare::query::{Query, Filter};
//!
//! let records = backend
//!     .find("stations", Query::filter(Filter::eq("network_id", "velib")))
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Bson;
use std::fmt::Debug;

use crate::{
    document::Record,
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Expr, Query},
};

/// Abstract interface for document storage backends.
///
/// Records are exchanged as raw [`Record`]s keyed by field name; the stored `_id`
/// field is part of the record and is never stripped.
///
/// # Error Handling
///
/// Driver failures are reported as [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend)
/// with the driver's message. Callers propagate them unchanged.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns every record in `collection` matching `query`, in backend order unless
    /// the query sorts.
    async fn find(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Record>>;

    /// Returns the first record in `collection` matching `filter`, if any.
    async fn find_one(&self, collection: &str, filter: Expr) -> DocumentStoreResult<Option<Record>>;

    /// Runs an aggregation pipeline over `collection`.
    async fn aggregate(&self, collection: &str, pipeline: Pipeline) -> DocumentStoreResult<Vec<Record>>;

    /// Persists `record` into `collection`.
    ///
    /// A record carrying an `_id` replaces the stored record with the same id, or is
    /// inserted if none exists. A record without `_id` is inserted and the backend
    /// assigns one.
    ///
    /// # Returns
    ///
    /// The `_id` of the persisted record.
    async fn save(&self, collection: &str, record: Record) -> DocumentStoreResult<Bson>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn find(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Record>> {
        (*self).find(collection, query).await
    }

    async fn find_one(&self, collection: &str, filter: Expr) -> DocumentStoreResult<Option<Record>> {
        (*self).find_one(collection, filter).await
    }

    async fn aggregate(&self, collection: &str, pipeline: Pipeline) -> DocumentStoreResult<Vec<Record>> {
        (*self).aggregate(collection, pipeline).await
    }

    async fn save(&self, collection: &str, record: Record) -> DocumentStoreResult<Bson> {
        (*self).save(collection, record).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
