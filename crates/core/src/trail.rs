//! Trail domain model and derived geometry attributes.

use crate::error::{Error, Result};
use geo::{BoundingRect, HaversineLength};
use geo_types::{Coord, LineString, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Trail difficulty rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "easy" => Ok(Self::Easy),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "expert" => Ok(Self::Expert),
            other => Err(Error::InvalidDifficulty(other.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trail record.
///
/// `bbox` and `distance_m` are derived from `geometry` and recomputed on
/// every geometry write; a trail without geometry has neither and is
/// excluded from all tile output.
#[derive(Debug, Clone)]
pub struct Trail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    pub geometry: Option<LineString<f64>>,
    pub bbox: Option<Rect<f64>>,
    pub distance_m: f64,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub comment_count: i64,
    pub ridden: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Input for creating a trail, or fully replacing one on update.
#[derive(Debug, Clone)]
pub struct NewTrail {
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    pub geometry: Option<LineString<f64>>,
}

impl Trail {
    /// Materialize a new trail with derived fields computed.
    pub fn from_new(id: Uuid, new: NewTrail, now: OffsetDateTime) -> Self {
        let bbox = new.geometry.as_ref().and_then(|g| g.bounding_rect());
        let distance_m = new
            .geometry
            .as_ref()
            .map(|g| g.haversine_length())
            .unwrap_or(0.0);
        Self {
            id,
            name: new.name,
            description: new.description,
            difficulty: new.difficulty,
            tags: new.tags,
            owner_id: new.owner_id,
            geometry: new.geometry,
            bbox,
            distance_m,
            rating_avg: 0.0,
            rating_count: 0,
            comment_count: 0,
            ridden: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the mutable fields from `new`, re-deriving geometry
    /// attributes. Engagement aggregates and `created_at` are untouched;
    /// `updated_at` always advances.
    pub fn apply(&mut self, new: NewTrail, now: OffsetDateTime) {
        self.bbox = new.geometry.as_ref().and_then(|g| g.bounding_rect());
        self.distance_m = new
            .geometry
            .as_ref()
            .map(|g| g.haversine_length())
            .unwrap_or(0.0);
        self.name = new.name;
        self.description = new.description;
        self.difficulty = new.difficulty;
        self.tags = new.tags;
        self.owner_id = new.owner_id;
        self.geometry = new.geometry;
        self.updated_at = now;
    }

    /// First coordinate of the line, if any.
    pub fn start(&self) -> Option<Coord<f64>> {
        self.geometry.as_ref().and_then(|g| g.0.first().copied())
    }

    /// Last coordinate of the line, if any.
    pub fn end(&self) -> Option<Coord<f64>> {
        self.geometry.as_ref().and_then(|g| g.0.last().copied())
    }
}

/// Build a line from `[lon, lat]` pairs, the wire/storage representation.
pub fn line_from_lonlat(pairs: &[[f64; 2]]) -> Result<LineString<f64>> {
    if pairs.is_empty() {
        return Err(Error::InvalidGeometry("empty coordinate list".to_string()));
    }
    for [lon, lat] in pairs {
        if !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > 90.0 {
            return Err(Error::InvalidGeometry(format!(
                "coordinate out of range: [{lon}, {lat}]"
            )));
        }
    }
    Ok(LineString::from(
        pairs.iter().map(|[lon, lat]| (*lon, *lat)).collect::<Vec<_>>(),
    ))
}

/// Flatten a line back into `[lon, lat]` pairs.
pub fn lonlat_pairs(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}
