//! Collection handles.
//!
//! A [`Collection`] binds a collection name to a backend so the models can issue
//! reads and writes without repeating the name. Obtain one from
//! [`DocumentStore::collection`](crate::store::DocumentStore::collection).
//!
//! ```ignore
//! let stations = store.collection("stations");
//! let records = stations.find(Query::filter(Filter::eq("network_id", "velib"))).await?;
//! ```

use bson::Bson;
use tracing::debug;

use crate::{
    backend::StoreBackend,
    document::Record,
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Expr, Query},
};

/// A named collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: &'a str,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Clone for Collection<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B: StoreBackend> Copy for Collection<'a, B> {}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: &'a str, backend: &'a B) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Returns every record matching `query`.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Record>> {
        debug!(collection = self.name, ?query, "find");

        let records = self.backend.find(self.name, query).await?;
        debug!(collection = self.name, count = records.len(), "find returned");

        Ok(records)
    }

    /// Returns the first record matching `filter`, if any.
    pub async fn find_one(&self, filter: Expr) -> DocumentStoreResult<Option<Record>> {
        debug!(collection = self.name, ?filter, "find_one");

        self.backend.find_one(self.name, filter).await
    }

    /// Runs an aggregation pipeline over this collection.
    pub async fn aggregate(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<Record>> {
        debug!(collection = self.name, stages = pipeline.stages.len(), "aggregate");

        let records = self.backend.aggregate(self.name, pipeline).await?;
        debug!(collection = self.name, count = records.len(), "aggregate returned");

        Ok(records)
    }

    /// Persists `record`, returning its `_id`.
    pub async fn save(&self, record: Record) -> DocumentStoreResult<Bson> {
        debug!(collection = self.name, id = ?record.get("_id"), "save");

        self.backend.save(self.name, record).await
    }
}
