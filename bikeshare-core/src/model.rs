//! Bike-share entities and their public projections.
//!
//! | model       | collection      | public name |
//! |-------------|-----------------|-------------|
//! | [`Network`] | `systems`       | `network`   |
//! | [`Station`] | `stations`      | `station`   |
//! | [`Stat`]    | `station_stats` | `stat`      |
//!
//! A projection is the JSON object an API response carries for one record. Every
//! field a projection needs must be present on the record; a missing field is an
//! error, never a default.

use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    backend::StoreBackend,
    document::{id_text, Document, Fields, Model, Record},
    encode::{bson_iso_timestamp, record_to_json, to_json},
    error::DocumentStoreResult,
    query::{Filter, Query},
};

/// Zone designator appended to station timestamps. Stored times are UTC.
const UTC_SUFFIX: &str = "Z";

/// A timestamped snapshot of a station's bike and slot counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stat;

impl Model for Stat {
    const NAME: &'static str = "Stat";
    const COLLECTION: &'static str = "station_stats";
    const PUBLIC_NAME: &'static str = "stat";

    type State = ();
}

/// A docking station and its last known stat.
#[derive(Debug, Clone, Copy, Default)]
pub struct Station;

impl Model for Station {
    const NAME: &'static str = "Station";
    const COLLECTION: &'static str = "stations";
    const PUBLIC_NAME: &'static str = "station";

    type State = ();
}

/// A bike-share system operated in one city.
#[derive(Debug, Clone, Copy, Default)]
pub struct Network;

impl Model for Network {
    const NAME: &'static str = "Network";
    const COLLECTION: &'static str = "systems";
    const PUBLIC_NAME: &'static str = "network";

    /// Station records resolved for this network, if any.
    type State = Option<Vec<Record>>;
}

/// Keeps only the keys listed in `fields`. `None` keeps everything.
pub fn filter_fields(mut result: Map<String, Value>, fields: Option<&[&str]>) -> Map<String, Value> {
    if let Some(fields) = fields {
        result.retain(|key, _| fields.contains(&key.as_str()));
    }

    result
}

impl<'a, B: StoreBackend> Document<'a, Stat, B> {
    /// Projects the stat record as stored.
    pub fn map_data(&self, fields: Option<&[&str]>) -> Map<String, Value> {
        filter_fields(record_to_json(self.raw_data()), fields)
    }
}

impl<'a, B: StoreBackend> Document<'a, Station, B> {
    /// Projects the station.
    ///
    /// `network_id` is emitted only when `include_network_id` is set; `extra` when the
    /// last stat carries one; `distance`, truncated to an integer, when a geospatial
    /// search computed it.
    pub fn map_data(&self, include_network_id: bool) -> DocumentStoreResult<Map<String, Value>> {
        project_station(&self.fields(), include_network_id)
    }
}

pub(crate) fn project_station(
    station: &Fields<'_>,
    include_network_id: bool,
) -> DocumentStoreResult<Map<String, Value>> {
    let location = station.get_document("location")?;
    let last_stat = station.get_document("last_stat")?;

    let mut result = Map::new();
    result.insert("id".into(), to_json(station.get("_id")?));
    result.insert("name".into(), to_json(station.get("name")?));
    result.insert("longitude".into(), to_json(location.get_element("coordinates", 0)?));
    result.insert("latitude".into(), to_json(location.get_element("coordinates", 1)?));
    result.insert("free_bikes".into(), to_json(last_stat.get("bikes")?));
    result.insert("empty_slots".into(), to_json(last_stat.get("free")?));
    result.insert(
        "timestamp".into(),
        Value::String(bson_iso_timestamp(&last_stat.get_datetime("timestamp")?, UTC_SUFFIX)),
    );

    if include_network_id {
        result.insert("network_id".into(), to_json(station.get("network_id")?));
    }

    if last_stat.contains("extra") {
        result.insert("extra".into(), to_json(last_stat.get("extra")?));
    }

    if station.contains("distance") {
        let distance = station.get_f64("distance")?.trunc() as i64;
        result.insert("distance".into(), Value::from(distance));
    }

    trace!(station = ?result.get("id"), "projected station");

    Ok(result)
}

impl<'a, B: StoreBackend> Document<'a, Network, B> {
    /// Resolves the stations belonging to this network, in backend order.
    ///
    /// The stations are kept on this instance for [`map_data`](Self::map_data) and are
    /// never persisted with the network.
    pub async fn resolve_stations(&mut self) -> DocumentStoreResult<()> {
        let network_id = self.get("_id")?.clone();

        let stations = Document::<Station, B>::new(self.store())
            .find(Query::filter(Filter::eq("network_id", network_id)))
            .await?
            .map(Document::into_data)
            .collect();

        self.state = Some(stations);

        Ok(())
    }

    /// The resolved stations, if [`resolve_stations`](Self::resolve_stations) ran.
    pub fn stations(&self) -> Option<impl Iterator<Item = Document<'a, Station, B>> + '_> {
        let store = self.store();

        self.state
            .as_ref()
            .map(move |records| records.iter().map(move |record| Document::with_data(store, record.clone())))
    }

    /// Projects the network.
    ///
    /// When `fields` is given, the result holds exactly the requested keys the
    /// projection produced.
    pub fn map_data(&self, fields: Option<&[&str]>) -> DocumentStoreResult<Map<String, Value>> {
        let network = self.fields();
        let id = network.get("_id")?;

        let mut location = Map::new();
        location.insert("city".into(), to_json(network.get("city")?));
        location.insert("country".into(), to_json(network.get("country")?));
        location.insert("latitude".into(), to_json(network.get("latitude")?));
        location.insert("longitude".into(), to_json(network.get("longitude")?));

        let mut result = Map::new();
        result.insert("id".into(), to_json(id));
        result.insert("name".into(), to_json(network.get("name")?));
        result.insert("location".into(), Value::Object(location));
        result.insert("company".into(), to_json(network.get("company")?));
        result.insert(
            "href".into(),
            Value::String(self.store().settings().href(&format!("networks/{}", id_text(id)))),
        );

        if network.contains("license") {
            result.insert("license".into(), to_json(network.get("license")?));
        }

        if let Some(stations) = &self.state {
            let stations = stations
                .iter()
                .map(|record| project_station(&Fields::new(Station::NAME, record), false).map(Value::Object))
                .collect::<DocumentStoreResult<Vec<_>>>()?;

            result.insert("stations".into(), Value::Array(stations));
        }

        Ok(filter_fields(result, fields))
    }
}
