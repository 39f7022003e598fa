//! In-memory storage implementation.
//!
//! Records are kept per collection in insertion order behind an async-aware
//! read-write lock, so `find` without a sort returns records in the order they
//! were first saved, as a fresh database would.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, oid::ObjectId};
use tracing::debug;

use bikeshare_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::Record,
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Pipeline, Stage},
    query::{Expr, Query, Sort, SortDirection},
};

use crate::{
    evaluator::{Comparable, RecordEvaluator, lookup},
    geo::geo_near,
};

type StoreMap = HashMap<String, Vec<Record>>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable; clones share the same underlying data.
///
/// # Example
///
/// ```ignore
/// use bikeshare_memory::InMemoryStore;
/// use bikeshare::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.save("systems", doc! { "_id": "velib", "name": "Vélib'" }).await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> records, in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Creates a store pre-populated with `records` per collection.
    pub fn with_collections<I, R>(collections: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, R)>,
        R: IntoIterator<Item = Record>,
    {
        let map = collections
            .into_iter()
            .map(|(name, records)| (name.to_string(), records.into_iter().collect()))
            .collect::<StoreMap>();

        Self { store: Arc::new(RwLock::new(map)) }
    }

    /// Number of records in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    async fn snapshot(&self, collection: &str) -> Vec<Record> {
        self.store
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

fn sort_records(records: &mut [Record], sort: &Sort) {
    records.sort_by(|a, b| {
        let left = lookup(a, &sort.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let right = lookup(b, &sort.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        match sort.direction {
            SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
        }
    });
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Record>> {
        let records = self.snapshot(collection).await;

        let mut records = match &query.filter {
            Some(filter) => RecordEvaluator::filter_records(records, filter)?,
            None => records,
        };

        if let Some(sort) = &query.sort {
            sort_records(&mut records, sort);
        }

        records.truncate(query.limit.unwrap_or(usize::MAX));

        Ok(records)
    }

    async fn find_one(&self, collection: &str, filter: Expr) -> DocumentStoreResult<Option<Record>> {
        let store = self.store.read().await;

        let Some(records) = store.get(collection) else {
            return Ok(None);
        };

        for record in records {
            if RecordEvaluator::matches(record, &filter)? {
                return Ok(Some(record.clone()));
            }
        }

        Ok(None)
    }

    async fn aggregate(&self, collection: &str, pipeline: Pipeline) -> DocumentStoreResult<Vec<Record>> {
        let mut records = self.snapshot(collection).await;

        for (position, stage) in pipeline.stages.iter().enumerate() {
            records = match stage {
                Stage::GeoNear(_) if position > 0 => {
                    return Err(DocumentStoreError::Backend(
                        "$geoNear is only valid as the first stage in a pipeline".to_string(),
                    ));
                }
                Stage::GeoNear(geo) => geo_near(records, geo),
                Stage::Match(expr) => RecordEvaluator::filter_records(records, expr)?,
                Stage::Sort(sort) => {
                    sort_records(&mut records, sort);
                    records
                }
                Stage::Limit(limit) => {
                    records.truncate(*limit);
                    records
                }
            };
        }

        debug!(collection, stages = pipeline.stages.len(), count = records.len(), "aggregated in memory");

        Ok(records)
    }

    async fn save(&self, collection: &str, mut record: Record) -> DocumentStoreResult<Bson> {
        let id = match record.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                record.insert("_id", id.clone());
                id
            }
        };

        let mut store = self.store.write().await;
        let records = store.entry(collection.to_string()).or_default();

        let existing = records
            .iter()
            .position(|stored| stored.get("_id").map(Comparable::from) == Some(Comparable::from(&id)));

        match existing {
            Some(index) => records[index] = record,
            None => records.push(record),
        }

        Ok(id)
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    collections: Vec<(&'static str, Vec<Record>)>,
}

impl InMemoryStoreBuilder {
    /// Seeds `collection` with `records`.
    pub fn collection(mut self, collection: &'static str, records: impl IntoIterator<Item = Record>) -> Self {
        self.collections.push((collection, records.into_iter().collect()));
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::with_collections(self.collections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikeshare_core::{pipeline::{GeoNear, GeoPoint}, query::Filter};
    use bson::{Binary, doc, spec::BinarySubtype};

    fn seeded() -> InMemoryStore {
        InMemoryStore::with_collections([(
            "stations",
            vec![
                doc! { "_id": "b", "network_id": "velib", "location": { "type": "Point", "coordinates": [2.3522, 48.8566] } },
                doc! { "_id": "a", "network_id": "bicing", "location": { "type": "Point", "coordinates": [2.17, 41.38] } },
                doc! { "_id": "c", "network_id": "velib", "location": { "type": "Point", "coordinates": [2.3530, 48.8570] } },
            ],
        )])
    }

    #[tokio::test]
    async fn find_filters_in_insertion_order() {
        let store = seeded();

        let records = store
            .find("stations", Query::filter(Filter::eq("network_id", "velib")))
            .await
            .unwrap();

        let ids = records.iter().map(|r| r.get_str("_id").unwrap()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn find_sorts_and_limits() {
        let store = seeded();

        let records = store
            .find("stations", Query::builder().sort("_id", SortDirection::Asc).limit(2).build())
            .await
            .unwrap();

        let ids = records.iter().map(|r| r.get_str("_id").unwrap()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let store = InMemoryStore::new();

        assert!(store.find("systems", Query::new()).await.unwrap().is_empty());
        assert!(store.find_one("systems", Filter::eq("_id", "x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_upserts_by_id() {
        let store = seeded();

        store
            .save("stations", doc! { "_id": "a", "network_id": "bicing", "name": "renamed" })
            .await
            .unwrap();

        assert_eq!(store.count("stations").await, 3);

        let record = store.find_one("stations", Filter::eq("_id", "a")).await.unwrap().unwrap();
        assert_eq!(record.get_str("name").unwrap(), "renamed");
    }

    #[tokio::test]
    async fn save_assigns_object_id() {
        let store = InMemoryStore::new();

        let id = store.save("station_stats", doc! { "bikes": 1 }).await.unwrap();

        assert!(matches!(id, Bson::ObjectId(_)));
        assert!(store.find_one("station_stats", Filter::eq("_id", id)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn binary_ids_are_distinct() {
        let store = InMemoryStore::new();
        let id = |byte: u8| Binary { subtype: BinarySubtype::Uuid, bytes: vec![byte; 16] };

        store.save("systems", doc! { "_id": id(1), "name": "one" }).await.unwrap();
        store.save("systems", doc! { "_id": id(2), "name": "two" }).await.unwrap();

        assert_eq!(store.count("systems").await, 2);
        assert!(store.find_one("systems", Filter::eq("_id", id(3))).await.unwrap().is_none());

        let record = store.find_one("systems", Filter::eq("_id", id(1))).await.unwrap().unwrap();
        assert_eq!(record.get_str("name").unwrap(), "one");
    }

    #[tokio::test]
    async fn geo_near_must_come_first() {
        let store = seeded();
        let pipeline = Pipeline::new()
            .filter(Filter::eq("network_id", "velib"))
            .geo_near(GeoNear::new(GeoPoint::new(2.35, 48.85), "distance"));

        let err = store.aggregate("stations", pipeline).await.unwrap_err();

        assert!(matches!(err, DocumentStoreError::Backend(_)));
    }

    #[tokio::test]
    async fn geo_near_then_match() {
        let store = seeded();
        let pipeline = Pipeline::new()
            .geo_near(GeoNear::new(GeoPoint::new(2.3522, 48.8566), "distance").max_distance(1_000.0))
            .filter(Filter::eq("network_id", "velib"));

        let records = store.aggregate("stations", pipeline).await.unwrap();

        let ids = records.iter().map(|r| r.get_str("_id").unwrap()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(records[0].get_f64("distance").unwrap(), 0.0);
    }

    #[tokio::test]
    async fn builder_seeds_collections() {
        let store = InMemoryStore::builder()
            .collection("systems", [doc! { "_id": "velib" }])
            .build()
            .await
            .unwrap();

        assert_eq!(store.count("systems").await, 1);
    }
}
