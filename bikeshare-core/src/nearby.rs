//! Nearest-station lookup.

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    document::Document,
    error::DocumentStoreResult,
    model::Station,
    pipeline::{GeoNear, GeoPoint, Pipeline},
    store::DocumentStore,
};

/// Maximum number of stations a nearby search returns.
pub const NEARBY_LIMIT: usize = 100;

/// Field the backend stores each station's distance in, in metres.
pub const DISTANCE_FIELD: &str = "distance";

/// Station field holding the GeoJSON point.
pub const LOCATION_FIELD: &str = "location";

/// Builds the geospatial search [`Nearby::near`] runs.
pub fn near_pipeline(longitude: f64, latitude: f64, distance: f64) -> Pipeline {
    Pipeline::new().geo_near(
        GeoNear::new(GeoPoint::new(longitude, latitude), DISTANCE_FIELD)
            .spherical(true)
            .key(LOCATION_FIELD)
            .limit(NEARBY_LIMIT)
            .max_distance(distance),
    )
}

/// Stations around a point, nearest first.
#[derive(Debug)]
pub struct Nearby<'a, B: StoreBackend> {
    store: &'a DocumentStore<B>,
    stations: Vec<Document<'a, Station, B>>,
}

impl<'a, B: StoreBackend> Nearby<'a, B> {
    pub fn new(store: &'a DocumentStore<B>) -> Self {
        Self { store, stations: Vec::new() }
    }

    /// Searches stations within `distance` metres of the point, replacing any
    /// previous result.
    pub async fn near(&mut self, longitude: f64, latitude: f64, distance: f64) -> DocumentStoreResult<()> {
        debug!(longitude, latitude, distance, "nearby search");

        self.stations = Document::<Station, B>::new(self.store)
            .aggregate(near_pipeline(longitude, latitude, distance))
            .await?
            .collect();

        Ok(())
    }

    pub fn stations(&self) -> &[Document<'a, Station, B>] {
        &self.stations
    }

    /// Projects the result as `{"near": [station, ...]}`, each station carrying its
    /// `network_id` and `distance`.
    pub fn map_data(&self) -> DocumentStoreResult<Map<String, Value>> {
        let near = self
            .stations
            .iter()
            .map(|station| station.map_data(true).map(Value::Object))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        let mut result = Map::new();
        result.insert("near".into(), Value::Array(near));

        Ok(result)
    }
}
