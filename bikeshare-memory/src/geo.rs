//! `$geoNear` emulation over GeoJSON point locations.

use bson::Bson;
use tracing::warn;

use bikeshare_core::{document::Record, pipeline::{GeoNear, GeoPoint}};

use crate::evaluator::lookup;

/// Field searched when a stage names no `key`: the one the stations' index covers.
const DEFAULT_KEY: &str = "location";

/// Earth radius the engine uses for spherical distances over GeoJSON, in metres.
const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Great-circle distance between two points, in metres.
pub(crate) fn haversine(a: &GeoPoint, b: &GeoPoint) -> f64 {
    const TO_RAD: f64 = std::f64::consts::PI / 180.0;

    let lat1 = a.latitude * TO_RAD;
    let lat2 = b.latitude * TO_RAD;
    let half_dlat = (b.latitude - a.latitude) * TO_RAD * 0.5;
    let half_dlon = (b.longitude - a.longitude) * TO_RAD * 0.5;

    let h = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Planar distance in coordinate units, used when a search is not spherical.
fn planar(a: &GeoPoint, b: &GeoPoint) -> f64 {
    (a.longitude - b.longitude).hypot(a.latitude - b.latitude)
}

/// Reads the GeoJSON point `{ "type": "Point", "coordinates": [lng, lat] }` stored
/// under the dotted path `key`.
pub(crate) fn point_of(record: &Record, key: &str) -> Option<GeoPoint> {
    match lookup(record, key)? {
        Bson::Document(doc) if doc.get_str("type").ok() == Some("Point") => {
            match doc.get_array("coordinates").ok()?.as_slice() {
                [longitude, latitude, ..] => Some(GeoPoint::new(number(longitude)?, number(latitude)?)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(value) => Some(*value),
        Bson::Int32(value) => Some(f64::from(*value)),
        Bson::Int64(value) => Some(*value as f64),
        _ => None,
    }
}

/// Applies a `$geoNear` stage: computes each record's distance, drops records beyond
/// `max_distance`, orders nearest first and keeps at most `limit`.
///
/// Records without a GeoJSON point are skipped, as the engine's geospatial index
/// would not contain them.
pub(crate) fn geo_near(records: Vec<Record>, stage: &GeoNear) -> Vec<Record> {
    let key = stage.key.as_deref().unwrap_or(DEFAULT_KEY);

    let mut located = records
        .into_iter()
        .filter_map(|record| match point_of(&record, key) {
            Some(point) => {
                let distance = if stage.spherical {
                    haversine(&stage.near, &point)
                } else {
                    planar(&stage.near, &point)
                };
                Some((distance, record))
            }
            None => {
                warn!(id = ?record.get("_id"), key, "record has no GeoJSON point, skipped by $geoNear");
                None
            }
        })
        .filter(|(distance, _)| stage.max_distance.is_none_or(|max| *distance <= max))
        .collect::<Vec<_>>();

    located.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    located
        .into_iter()
        .take(stage.limit.unwrap_or(usize::MAX))
        .map(|(distance, mut record)| {
            record.insert(stage.distance_field.clone(), distance);
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn at(id: i32, longitude: f64, latitude: f64) -> Record {
        doc! { "_id": id, "location": { "type": "Point", "coordinates": [longitude, latitude] } }
    }

    #[test]
    fn haversine_of_one_degree_of_latitude() {
        let d = haversine(&GeoPoint::new(10.0, 45.0), &GeoPoint::new(10.0, 46.0));

        assert!((d - 111_318.8).abs() < 1.0, "got {d}");
    }

    #[test]
    fn nearest_first_within_bounds() {
        let records = vec![
            at(1, 10.0, 45.003),
            at(2, 10.0, 45.001),
            at(3, 10.0, 46.0),
            doc! { "_id": 4, "name": "unlocated" },
        ];

        let stage = GeoNear::new(GeoPoint::new(10.0, 45.0), "distance").max_distance(500.0);
        let result = geo_near(records, &stage);

        let ids = result.iter().map(|r| r.get_i32("_id").unwrap()).collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 1]);
        assert!(result.iter().all(|r| r.get_f64("distance").unwrap() <= 500.0));
    }

    #[test]
    fn only_the_searched_key_counts() {
        let record = doc! {
            "_id": 1,
            "home": { "type": "Point", "coordinates": [10.0, 45.0] },
            "location": { "type": "Point", "coordinates": [10.0, 45.01] },
        };

        let stage = GeoNear::new(GeoPoint::new(10.0, 45.0), "distance");
        let result = geo_near(vec![record.clone()], &stage);
        assert!(result[0].get_f64("distance").unwrap() > 1_000.0);

        let stage = stage.key("home");
        let result = geo_near(vec![record], &stage);
        assert_eq!(result[0].get_f64("distance").unwrap(), 0.0);
    }

    #[test]
    fn limit_caps_results() {
        let records = (0..10).map(|i| at(i, 10.0, 45.0 + f64::from(i) * 0.0001)).collect();
        let stage = GeoNear::new(GeoPoint::new(10.0, 45.0), "d").limit(3);

        assert_eq!(geo_near(records, &stage).len(), 3);
    }
}
