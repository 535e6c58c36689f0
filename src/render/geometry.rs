//! Landmass polygons and the spatial index used by the rasterizer.
//!
//! The reference geometry is a coarse GeoJSON document embedded in the
//! crate. A full-grid scan tests every cell against the landmass set, so a
//! uniform-grid bounding-box index shortlists candidate polygons per point
//! before the exact point-in-polygon test runs.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Embedded coarse world geometry.
const WORLD_GEOJSON: &str = include_str!("../data/world.geojson");

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("invalid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("geometry has no usable polygons")]
    Empty,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

/// Axis-aligned bounds of one polygon in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    fn from_ring(ring: &[(f64, f64)]) -> Self {
        let mut bbox = Self {
            min_lon: f64::MAX,
            min_lat: f64::MAX,
            max_lon: f64::MIN,
            max_lat: f64::MIN,
        };
        for &(lon, lat) in ring {
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.max_lat = bbox.max_lat.max(lat);
        }
        bbox
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }
}

/// A closed landmass outline. Only the exterior ring is kept; the coarse
/// reference geometry carries no holes worth rendering at terminal scale.
#[derive(Debug, Clone)]
pub struct Polygon {
    ring: Vec<(f64, f64)>,
    pub bbox: BoundingBox,
}

impl Polygon {
    /// Build from an exterior ring; returns None for degenerate input.
    pub fn new(mut ring: Vec<(f64, f64)>) -> Option<Self> {
        // Drop an explicit closing vertex; the test closes the ring itself.
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return None;
        }
        let bbox = BoundingBox::from_ring(&ring);
        Some(Self { ring, bbox })
    }

    /// Even-odd ray-casting point-in-polygon test.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if !self.bbox.contains(lon, lat) {
            return false;
        }
        let mut inside = false;
        let n = self.ring.len();
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.ring[i];
            let (xj, yj) = self.ring[j];
            if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// The full landmass set used for base map rasterization.
#[derive(Debug, Clone)]
pub struct WorldGeometry {
    pub polygons: Vec<Polygon>,
}

impl WorldGeometry {
    /// Parse a GeoJSON FeatureCollection of Polygon/MultiPolygon features.
    pub fn from_geojson_str(geojson: &str) -> Result<Self, GeometryError> {
        let collection: FeatureCollection = serde_json::from_str(geojson)?;
        let mut polygons = Vec::new();
        for feature in collection.features {
            match feature.geometry {
                Geometry::Polygon { coordinates } => {
                    push_exterior(&mut polygons, coordinates);
                }
                Geometry::MultiPolygon { coordinates } => {
                    for polygon in coordinates {
                        push_exterior(&mut polygons, polygon);
                    }
                }
            }
        }
        if polygons.is_empty() {
            return Err(GeometryError::Empty);
        }
        debug!(polygons = polygons.len(), "world geometry loaded");
        Ok(Self { polygons })
    }

    /// The coarse world geometry shipped with the crate.
    pub fn embedded() -> Result<Self, GeometryError> {
        Self::from_geojson_str(WORLD_GEOJSON)
    }
}

fn push_exterior(polygons: &mut Vec<Polygon>, rings: Vec<Vec<[f64; 2]>>) {
    if let Some(exterior) = rings.into_iter().next() {
        let ring = exterior.into_iter().map(|[lon, lat]| (lon, lat)).collect();
        if let Some(polygon) = Polygon::new(ring) {
            polygons.push(polygon);
        }
    }
}

/// Uniform-grid bounding-box index over the landmass set.
///
/// Buckets cover the full world extent; each holds the indices of every
/// polygon whose bounding box intersects the bucket rectangle. A point
/// query returns that shortlist for the exact test.
pub struct SpatialIndex {
    cols: usize,
    rows: usize,
    buckets: Vec<Vec<usize>>,
}

/// Bucket resolution: 10-degree cells.
const INDEX_COLS: usize = 36;
const INDEX_ROWS: usize = 18;

impl SpatialIndex {
    pub fn build(polygons: &[Polygon]) -> Self {
        let cols = INDEX_COLS;
        let rows = INDEX_ROWS;
        let mut buckets = vec![Vec::new(); cols * rows];

        for (bucket_idx, bucket) in buckets.iter_mut().enumerate() {
            let col = bucket_idx % cols;
            let row = bucket_idx / cols;
            let rect = BoundingBox {
                min_lon: -180.0 + col as f64 * 360.0 / cols as f64,
                max_lon: -180.0 + (col + 1) as f64 * 360.0 / cols as f64,
                min_lat: -90.0 + row as f64 * 180.0 / rows as f64,
                max_lat: -90.0 + (row + 1) as f64 * 180.0 / rows as f64,
            };
            for (poly_idx, polygon) in polygons.iter().enumerate() {
                if polygon.bbox.intersects(&rect) {
                    bucket.push(poly_idx);
                }
            }
        }

        Self { cols, rows, buckets }
    }

    /// Indices of polygons whose bounding box may cover the point.
    pub fn candidates(&self, lon: f64, lat: f64) -> &[usize] {
        let col = bucket_coord(lon, -180.0, 360.0, self.cols);
        let row = bucket_coord(lat, -90.0, 180.0, self.rows);
        &self.buckets[row * self.cols + col]
    }
}

fn bucket_coord(value: f64, min: f64, span: f64, size: usize) -> usize {
    let idx = ((value - min) / span * size as f64) as isize;
    idx.clamp(0, size as isize - 1) as usize
}
