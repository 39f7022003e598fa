//! JSON encoding of records and projections.
//!
//! Two strategies are provided:
//!
//! - [`to_json`]: the general encoder. Renders any BSON value as JSON, with date-times
//!   as ISO-8601 text and object identifiers as hex text.
//! - [`Encoded`]: the model encoder. Renders a wrapper as `{public_name: projection}`,
//!   keeping only the `name` field of the projection.

use bson::{Bson, DateTime};
use chrono::{NaiveDateTime, Timelike};
use serde_json::{Map, Number, Value};

use crate::{
    backend::StoreBackend,
    document::{Document, Model},
    error::DocumentStoreResult,
    model::{filter_fields, Network, Stat, Station},
};

/// Fields kept by the model encoder.
pub const ENCODED_FIELDS: &[&str] = &["name"];

/// Renders `dtime` as an ISO-8601 date-time followed by the zone designator `tz`.
///
/// `tz` is appended verbatim and is expected to be `Z`, `+hh:mm` or `-hh:mm`.
/// Fractional seconds are printed with microsecond precision, and only when non-zero.
pub fn iso_timestamp(dtime: &NaiveDateTime, tz: &str) -> String {
    format!("{}{}", isoformat(dtime), tz)
}

/// Renders a stored date-time, which is always UTC, with the given zone designator.
pub fn bson_iso_timestamp(dtime: &DateTime, tz: &str) -> String {
    iso_timestamp(&dtime.to_chrono().naive_utc(), tz)
}

fn isoformat(dtime: &NaiveDateTime) -> String {
    let micros = dtime.nanosecond() / 1_000;
    let base = dtime.format("%Y-%m-%dT%H:%M:%S");

    if micros == 0 {
        base.to_string()
    } else {
        format!("{base}.{micros:06}")
    }
}

/// The general encoder.
pub fn to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(value) => Value::Bool(*value),
        Bson::Int32(value) => Value::from(*value),
        Bson::Int64(value) => Value::from(*value),
        Bson::Double(value) => Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(value) => Value::String(value.clone()),
        Bson::Array(values) => Value::Array(values.iter().map(to_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect(),
        ),
        Bson::DateTime(dtime) => Value::String(isoformat(&dtime.to_chrono().naive_utc())),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        other => Value::String(other.to_string()),
    }
}

/// Encodes a whole record as a JSON object.
pub fn record_to_json(record: &bson::Document) -> Map<String, Value> {
    record
        .iter()
        .map(|(key, value)| (key.clone(), to_json(value)))
        .collect()
}

/// A wrapper instance tagged with its entity type, for the model encoder.
#[derive(Debug)]
pub enum Encoded<'r, 'a, B: StoreBackend> {
    Network(&'r Document<'a, Network, B>),
    Station(&'r Document<'a, Station, B>),
    Stat(&'r Document<'a, Stat, B>),
}

impl<'r, 'a, B: StoreBackend> Encoded<'r, 'a, B> {
    pub fn public_name(&self) -> &'static str {
        match self {
            Encoded::Network(_) => Network::PUBLIC_NAME,
            Encoded::Station(_) => Station::PUBLIC_NAME,
            Encoded::Stat(_) => Stat::PUBLIC_NAME,
        }
    }

    /// Renders `{public_name: projection restricted to ENCODED_FIELDS}`.
    pub fn to_json(&self) -> DocumentStoreResult<Value> {
        let projection = match self {
            Encoded::Network(network) => network.map_data(Some(ENCODED_FIELDS))?,
            Encoded::Station(station) => filter_fields(station.map_data(false)?, Some(ENCODED_FIELDS)),
            Encoded::Stat(stat) => stat.map_data(Some(ENCODED_FIELDS)),
        };

        let mut object = Map::new();
        object.insert(self.public_name().to_string(), Value::Object(projection));

        Ok(Value::Object(object))
    }

    pub fn to_json_string(&self) -> DocumentStoreResult<String> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }
}

impl<'r, 'a, B: StoreBackend> From<&'r Document<'a, Network, B>> for Encoded<'r, 'a, B> {
    fn from(document: &'r Document<'a, Network, B>) -> Self {
        Encoded::Network(document)
    }
}

impl<'r, 'a, B: StoreBackend> From<&'r Document<'a, Station, B>> for Encoded<'r, 'a, B> {
    fn from(document: &'r Document<'a, Station, B>) -> Self {
        Encoded::Station(document)
    }
}

impl<'r, 'a, B: StoreBackend> From<&'r Document<'a, Stat, B>> for Encoded<'r, 'a, B> {
    fn from(document: &'r Document<'a, Stat, B>) -> Self {
        Encoded::Stat(document)
    }
}
