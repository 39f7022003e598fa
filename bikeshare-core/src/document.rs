//! The generic record wrapper.
//!
//! A [`Document`] holds one raw [`Record`] for a [`Model`] and knows which collection
//! it belongs to. Field access is explicit: [`Document::get`] and the typed helpers on
//! [`Fields`] return [`DocumentStoreError::FieldNotFound`] for absent keys instead of
//! falling back to a default.
//!
//! ```ignore
//! use bikeshare::{document::Document, model::Station};
//!
//! let stations = Document::<Station, _>::new(&store)
//!     .find(Query::filter(Filter::eq("network_id", "velib")))
//!     .await?;
//!
//! for station in stations {
//!     println!("{}", station.fields().get_str("name")?);
//! }
//! ```

use bson::{Bson, DateTime};
use std::{fmt, marker::PhantomData};

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Filter, Query},
    store::DocumentStore,
};

/// An untyped stored document: field name to value.
pub type Record = bson::Document;

/// Static description of a stored entity.
///
/// Implementors are marker types; the per-instance state a model needs beyond its
/// record (such as resolved related documents) lives in [`Model::State`].
pub trait Model: Send + Sync + 'static {
    /// Type name reported in field errors.
    const NAME: &'static str;
    /// Collection the records are stored in.
    const COLLECTION: &'static str;
    /// Key under which the model encoder nests a projection.
    const PUBLIC_NAME: &'static str;

    /// Request-scoped state that is never persisted.
    type State: Default + Clone + fmt::Debug + Send + Sync;
}

/// A record of model `M`, bound to the store it was read from.
///
/// Every instance starts from its own record; nothing is shared between instances.
pub struct Document<'a, M: Model, B: StoreBackend> {
    store: &'a DocumentStore<B>,
    data: Record,
    pub(crate) state: M::State,
}

impl<'a, M: Model, B: StoreBackend> Document<'a, M, B> {
    /// Creates a wrapper around a fresh, empty record.
    pub fn new(store: &'a DocumentStore<B>) -> Self {
        Self::with_data(store, Record::new())
    }

    pub fn with_data(store: &'a DocumentStore<B>, data: Record) -> Self {
        Self { store, data, state: M::State::default() }
    }

    /// The database handle this document was created with.
    pub fn store(&self) -> &'a DocumentStore<B> {
        self.store
    }

    /// The backend the database handle talks to.
    pub fn connection(&self) -> &'a B {
        self.store.connection()
    }

    pub fn collection(&self) -> Collection<'a, B> {
        self.store.collection(M::COLLECTION)
    }

    pub fn data(&self) -> &Record {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Record {
        &mut self.data
    }

    pub fn into_data(self) -> Record {
        self.data
    }

    /// Typed read access to the record.
    pub fn fields(&self) -> Fields<'_> {
        Fields::new(M::NAME, &self.data)
    }

    /// Returns the value of `field`, failing when the record does not carry it.
    pub fn get(&self, field: &str) -> DocumentStoreResult<&Bson> {
        self.data
            .get(field)
            .ok_or_else(|| DocumentStoreError::field_not_found(M::NAME, field))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    /// Sets `field`, returning the previous value if there was one.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Bson>) -> Option<Bson> {
        self.data.insert(field, value)
    }

    /// The base projection: the record itself.
    pub fn raw_data(&self) -> &Record {
        &self.data
    }

    /// Persists the current record into the model's collection.
    ///
    /// When the record had no `_id`, the identifier assigned by the backend is stored
    /// back into the record.
    pub async fn save(&mut self) -> DocumentStoreResult<Bson> {
        let id = self.collection().save(self.data.clone()).await?;

        if !self.data.contains_key("_id") {
            self.data.insert("_id", id.clone());
        }

        Ok(id)
    }

    /// Runs `query` against the model's collection.
    ///
    /// The results are yielded as wrappers of the same model bound to the same store.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Documents<'a, M, B>> {
        let records = self.collection().find(query).await?;

        Ok(Documents::new(self.store, records))
    }

    /// Runs `pipeline` against the model's collection.
    pub async fn aggregate(&self, pipeline: Pipeline) -> DocumentStoreResult<Documents<'a, M, B>> {
        let records = self.collection().aggregate(pipeline).await?;

        Ok(Documents::new(self.store, records))
    }

    /// Loads the record with the given `_id`, replacing the in-memory fields.
    ///
    /// Any request-scoped state is reset along with the record.
    pub async fn read(&mut self, id: impl Into<Bson>) -> DocumentStoreResult<()> {
        let id = id.into();

        match self.collection().find_one(Filter::eq("_id", id.clone())).await? {
            Some(record) => {
                self.data = record;
                self.state = M::State::default();
                Ok(())
            }
            None => Err(DocumentStoreError::DocumentNotFound(
                id_text(&id),
                M::COLLECTION.to_string(),
            )),
        }
    }
}

impl<'a, M: Model, B: StoreBackend> Clone for Document<'a, M, B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            data: self.data.clone(),
            state: self.state.clone(),
        }
    }
}

impl<'a, M: Model, B: StoreBackend> fmt::Debug for Document<'a, M, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(M::NAME)
            .field("data", &self.data)
            .field("state", &self.state)
            .finish()
    }
}

/// Result set of a `find` or `aggregate`, yielding one wrapper per record.
///
/// The sequence is finite and can be consumed once.
pub struct Documents<'a, M: Model, B: StoreBackend> {
    store: &'a DocumentStore<B>,
    records: std::vec::IntoIter<Record>,
    _model: PhantomData<fn() -> M>,
}

impl<'a, M: Model, B: StoreBackend> Documents<'a, M, B> {
    fn new(store: &'a DocumentStore<B>, records: Vec<Record>) -> Self {
        Self { store, records: records.into_iter(), _model: PhantomData }
    }
}

impl<'a, M: Model, B: StoreBackend> Iterator for Documents<'a, M, B> {
    type Item = Document<'a, M, B>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|record| Document::with_data(self.store, record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl<'a, M: Model, B: StoreBackend> ExactSizeIterator for Documents<'a, M, B> {}

/// Read-only, typed view over a record (or a nested sub-document of one).
///
/// Errors name the model and the dotted path of the offending field.
#[derive(Debug, Clone)]
pub struct Fields<'r> {
    model: &'static str,
    prefix: Option<String>,
    data: &'r Record,
}

impl<'r> Fields<'r> {
    pub fn new(model: &'static str, data: &'r Record) -> Self {
        Self { model, prefix: None, data }
    }

    pub fn model(&self) -> &'static str {
        self.model
    }

    pub fn contains(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn get(&self, field: &str) -> DocumentStoreResult<&'r Bson> {
        self.data
            .get(field)
            .ok_or_else(|| DocumentStoreError::field_not_found(self.model, self.path(field)))
    }

    pub fn get_str(&self, field: &str) -> DocumentStoreResult<&'r str> {
        match self.get(field)? {
            Bson::String(value) => Ok(value),
            _ => Err(self.invalid(field, "a string")),
        }
    }

    /// Reads any numeric field as `f64`.
    pub fn get_f64(&self, field: &str) -> DocumentStoreResult<f64> {
        as_f64(self.get(field)?).ok_or_else(|| self.invalid(field, "a number"))
    }

    pub fn get_i64(&self, field: &str) -> DocumentStoreResult<i64> {
        match self.get(field)? {
            Bson::Int32(value) => Ok(i64::from(*value)),
            Bson::Int64(value) => Ok(*value),
            _ => Err(self.invalid(field, "an integer")),
        }
    }

    pub fn get_datetime(&self, field: &str) -> DocumentStoreResult<DateTime> {
        match self.get(field)? {
            Bson::DateTime(value) => Ok(*value),
            _ => Err(self.invalid(field, "a date-time")),
        }
    }

    pub fn get_array(&self, field: &str) -> DocumentStoreResult<&'r [Bson]> {
        match self.get(field)? {
            Bson::Array(values) => Ok(values),
            _ => Err(self.invalid(field, "an array")),
        }
    }

    /// Returns element `index` of the array stored under `field`.
    pub fn get_element(&self, field: &str, index: usize) -> DocumentStoreResult<&'r Bson> {
        self.get_array(field)?
            .get(index)
            .ok_or_else(|| {
                DocumentStoreError::field_not_found(self.model, format!("{}.{}", self.path(field), index))
            })
    }

    /// Returns a view over the sub-document stored under `field`.
    pub fn get_document(&self, field: &str) -> DocumentStoreResult<Fields<'r>> {
        match self.get(field)? {
            Bson::Document(data) => Ok(Fields {
                model: self.model,
                prefix: Some(self.path(field)),
                data,
            }),
            _ => Err(self.invalid(field, "a document")),
        }
    }

    fn path(&self, field: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        }
    }

    fn invalid(&self, field: &str, expected: &'static str) -> DocumentStoreError {
        DocumentStoreError::invalid_field(self.model, self.path(field), expected)
    }
}

pub(crate) fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(value) => Some(*value),
        Bson::Int32(value) => Some(f64::from(*value)),
        Bson::Int64(value) => Some(*value as f64),
        _ => None,
    }
}

/// Renders an identifier as plain text: strings as-is, object ids as hex.
pub fn id_text(id: &Bson) -> String {
    match id {
        Bson::String(value) => value.clone(),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}
