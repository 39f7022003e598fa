use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Bson, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, info};

use bikeshare_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::Record,
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Expr, Query, QueryVisitor},
    settings::DatabaseSettings,
};

use crate::query::{MongoQueryTranslator, sort_document, translate_pipeline};


fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub fn builder_from_settings(settings: &DatabaseSettings) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(&settings.uri, &settings.name)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn translate_filter(filter: Option<&Expr>) -> DocumentStoreResult<Document> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Record>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(sort_document(sort));
        }

        let filter = Self::translate_filter(query.filter.as_ref())?;
        debug!(collection, %filter, "mongodb find");

        self.get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn find_one(&self, collection: &str, filter: Expr) -> DocumentStoreResult<Option<Record>> {
        let filter = Self::translate_filter(Some(&filter))?;
        debug!(collection, %filter, "mongodb find_one");

        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(backend_error)
    }

    async fn aggregate(&self, collection: &str, pipeline: Pipeline) -> DocumentStoreResult<Vec<Record>> {
        let stages = translate_pipeline(&pipeline)?;
        debug!(collection, ?stages, "mongodb aggregate");

        self.get_collection(collection)
            .aggregate(stages)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn save(&self, collection: &str, record: Record) -> DocumentStoreResult<Bson> {
        match record.get("_id").cloned() {
            Some(id) => {
                self.get_collection(collection)
                    .replace_one(doc! { "_id": id.clone() }, record)
                    .upsert(true)
                    .await
                    .map_err(backend_error)?;

                Ok(id)
            }
            None => Ok(
                self.get_collection(collection)
                    .insert_one(record)
                    .await
                    .map_err(backend_error)?
                    .inserted_id
            ),
        }
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        info!(database = %self.database, "connecting to mongodb");

        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
