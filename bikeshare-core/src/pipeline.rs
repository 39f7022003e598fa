//! Aggregation pipelines for `aggregate` operations.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s executed by the backend. The only
//! stage the models need beyond filtering is [`GeoNear`], a nearest-first geospatial
//! search that annotates each result with its distance from a point.
//!
//! ```ignore
//! use bikeshare::pipeline::{Pipeline, GeoNear, GeoPoint};
//!
//! let pipeline = Pipeline::new()
//!     .geo_near(
//!         GeoNear::new(GeoPoint::new(2.35, 48.85), "distance")
//!             .limit(100)
//!             .max_distance(500.0),
//!     );
//! ```

use crate::query::{Expr, Sort, SortDirection};

/// A GeoJSON point. Coordinates are stored longitude first, as in GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Returns the `[longitude, latitude]` pair.
    pub fn coordinates(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Nearest-first geospatial search stage.
///
/// Distances are expressed in metres when `spherical` is set, which is the only mode
/// used against GeoJSON locations.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNear {
    /// Centre of the search.
    pub near: GeoPoint,
    /// Whether distances are computed on a sphere.
    pub spherical: bool,
    /// Output field receiving each document's computed distance.
    pub distance_field: String,
    /// Location field searched. `None` leaves the choice to the backend's geospatial index.
    pub key: Option<String>,
    /// Maximum number of documents returned by this stage.
    pub limit: Option<usize>,
    /// Documents further away than this are excluded.
    pub max_distance: Option<f64>,
}

impl GeoNear {
    pub fn new(near: GeoPoint, distance_field: impl Into<String>) -> Self {
        Self {
            near,
            spherical: true,
            distance_field: distance_field.into(),
            key: None,
            limit: None,
            max_distance: None,
        }
    }

    pub fn spherical(mut self, spherical: bool) -> Self {
        self.spherical = spherical;
        self
    }

    /// Searches the GeoJSON point stored under `key`.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = Some(max_distance);
        self
    }
}

/// A single aggregation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keeps documents matching the expression.
    Match(Expr),
    /// Nearest-first geospatial search. Must be the first stage.
    GeoNear(GeoNear),
    Sort(Sort),
    Limit(usize),
}

/// An ordered aggregation pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn filter(self, expr: Expr) -> Self {
        self.stage(Stage::Match(expr))
    }

    pub fn geo_near(self, geo_near: GeoNear) -> Self {
        self.stage(Stage::GeoNear(geo_near))
    }

    pub fn sort(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.stage(Stage::Sort(Sort { field: field.into(), direction }))
    }

    pub fn limit(self, limit: usize) -> Self {
        self.stage(Stage::Limit(limit))
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Pipeline { stages }
    }
}
