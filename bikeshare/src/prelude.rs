//! Convenient re-exports of commonly used types.
//!
//! ```ignore
//! use bikeshare::prelude::*;
//! ```

pub use bikeshare_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{Document, Documents, Fields, Model, Record},
    encode::{Encoded, iso_timestamp, to_json},
    error::{DocumentStoreError, DocumentStoreResult},
    model::{Network, Stat, Station},
    nearby::Nearby,
    pipeline::{GeoNear, GeoPoint, Pipeline, Stage},
    query::{Expr, Filter, Query, QueryBuilder, Sort, SortDirection},
    settings::Settings,
    store::DocumentStore,
};
