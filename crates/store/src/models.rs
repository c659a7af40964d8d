//! Row types for the trail store.
//!
//! Geometry and tags travel as JSON text columns; the bounding box is
//! flattened into four REAL columns so it can be read without parsing the
//! line.

use crate::error::{StoreError, StoreResult};
use geo_types::{Coord, Rect};
use singletrack_core::trail::{line_from_lonlat, lonlat_pairs};
use singletrack_core::{Difficulty, Trail};
use time::OffsetDateTime;
use uuid::Uuid;

/// A row in the `trails` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrailRow {
    pub trail_id: Uuid,
    pub name: String,
    pub description: String,
    pub difficulty: String,
    /// JSON array of tag strings.
    pub tags: String,
    pub owner_id: Uuid,
    /// JSON array of `[lon, lat]` pairs; NULL when no geometry ingested.
    pub geometry: Option<String>,
    pub min_lon: Option<f64>,
    pub min_lat: Option<f64>,
    pub max_lon: Option<f64>,
    pub max_lat: Option<f64>,
    pub distance_m: f64,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub comment_count: i64,
    pub ridden: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TrailRow {
    /// Flatten a domain trail into its row representation.
    pub fn from_trail(trail: &Trail) -> StoreResult<Self> {
        let geometry = trail
            .geometry
            .as_ref()
            .map(|g| serde_json::to_string(&lonlat_pairs(g)))
            .transpose()
            .map_err(|e| StoreError::Internal(format!("geometry encode: {e}")))?;
        let tags = serde_json::to_string(&trail.tags)
            .map_err(|e| StoreError::Internal(format!("tags encode: {e}")))?;
        Ok(Self {
            trail_id: trail.id,
            name: trail.name.clone(),
            description: trail.description.clone(),
            difficulty: trail.difficulty.as_str().to_string(),
            tags,
            owner_id: trail.owner_id,
            geometry,
            min_lon: trail.bbox.map(|b| b.min().x),
            min_lat: trail.bbox.map(|b| b.min().y),
            max_lon: trail.bbox.map(|b| b.max().x),
            max_lat: trail.bbox.map(|b| b.max().y),
            distance_m: trail.distance_m,
            rating_avg: trail.rating_avg,
            rating_count: trail.rating_count,
            comment_count: trail.comment_count,
            ridden: trail.ridden,
            created_at: trail.created_at,
            updated_at: trail.updated_at,
        })
    }

    /// Rehydrate the domain trail. Fails on rows whose JSON columns were
    /// corrupted outside the application.
    pub fn into_trail(self) -> StoreResult<Trail> {
        let geometry = match &self.geometry {
            Some(json) => {
                let pairs: Vec<[f64; 2]> = serde_json::from_str(json).map_err(|e| {
                    StoreError::CorruptRow(format!("trail {}: geometry: {e}", self.trail_id))
                })?;
                Some(line_from_lonlat(&pairs).map_err(|e| {
                    StoreError::CorruptRow(format!("trail {}: {e}", self.trail_id))
                })?)
            }
            None => None,
        };
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| StoreError::CorruptRow(format!("trail {}: tags: {e}", self.trail_id)))?;
        let difficulty: Difficulty = self
            .difficulty
            .parse()
            .map_err(|e| StoreError::CorruptRow(format!("trail {}: {e}", self.trail_id)))?;
        let bbox = match (self.min_lon, self.min_lat, self.max_lon, self.max_lat) {
            (Some(min_lon), Some(min_lat), Some(max_lon), Some(max_lat)) => Some(Rect::new(
                Coord {
                    x: min_lon,
                    y: min_lat,
                },
                Coord {
                    x: max_lon,
                    y: max_lat,
                },
            )),
            _ => None,
        };
        Ok(Trail {
            id: self.trail_id,
            name: self.name,
            description: self.description,
            difficulty,
            tags,
            owner_id: self.owner_id,
            geometry,
            bbox,
            distance_m: self.distance_m,
            rating_avg: self.rating_avg,
            rating_count: self.rating_count,
            comment_count: self.comment_count,
            ridden: self.ridden,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use singletrack_core::NewTrail;
    use singletrack_core::trail::line_from_lonlat;

    fn sample_trail() -> Trail {
        let line = line_from_lonlat(&[[11.30, 47.25], [11.40, 47.27]]).unwrap();
        Trail::from_new(
            Uuid::new_v4(),
            NewTrail {
                name: "Nordkette".to_string(),
                description: "Steep".to_string(),
                difficulty: Difficulty::Expert,
                tags: vec!["steep".to_string()],
                owner_id: Uuid::new_v4(),
                geometry: Some(line),
            },
            OffsetDateTime::now_utc(),
        )
    }

    #[test]
    fn row_round_trips_domain_trail() {
        let trail = sample_trail();
        let row = TrailRow::from_trail(&trail).unwrap();
        let back = row.into_trail().unwrap();

        assert_eq!(back.id, trail.id);
        assert_eq!(back.difficulty, trail.difficulty);
        assert_eq!(back.tags, trail.tags);
        assert_eq!(back.geometry, trail.geometry);
        assert_eq!(back.bbox, trail.bbox);
    }

    #[test]
    fn corrupt_tags_column_is_reported() {
        let trail = sample_trail();
        let mut row = TrailRow::from_trail(&trail).unwrap();
        row.tags = "not json".to_string();
        assert!(matches!(
            row.into_trail(),
            Err(StoreError::CorruptRow(_))
        ));
    }
}
