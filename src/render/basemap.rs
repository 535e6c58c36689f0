//! Static ASCII base map: the landmass raster for one grid resolution.
//!
//! Rasterizing walks every cell once, classifying its center point as land
//! or ocean. The result is immutable and cached per resolution for the
//! session; live rendering only ever reads it.

use crate::render::geometry::{SpatialIndex, WorldGeometry};
use crate::render::projector::Projection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

/// Static classification of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Ocean,
    Land,
}

/// Immutable landmass raster at one grid resolution.
#[derive(Debug)]
pub struct BaseMap {
    pub width: u16,
    pub height: u16,
    cells: Vec<CellKind>,
}

impl BaseMap {
    /// Rasterize the landmass set onto the projection's grid.
    ///
    /// Each cell's center is unprojected back to latitude/longitude, the
    /// spatial index shortlists candidate polygons, and the exact
    /// point-in-polygon test decides the classification.
    pub fn rasterize(
        geometry: &WorldGeometry,
        index: &SpatialIndex,
        projection: &Projection,
    ) -> Self {
        let started = Instant::now();
        let width = projection.width;
        let height = projection.height;
        let mut cells = Vec::with_capacity(width as usize * height as usize);

        for row in 0..height {
            for col in 0..width {
                let (lat, lon) = projection.unproject(col, row);
                let is_land = index
                    .candidates(lon, lat)
                    .iter()
                    .any(|&i| geometry.polygons[i].contains(lon, lat));
                cells.push(if is_land { CellKind::Land } else { CellKind::Ocean });
            }
        }

        debug!(
            width = width,
            height = height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "base map rasterized"
        );
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn kind_at(&self, col: u16, row: u16) -> CellKind {
        self.cells[row as usize * self.width as usize + col as usize]
    }

    pub fn is_land(&self, col: u16, row: u16) -> bool {
        self.kind_at(col, row) == CellKind::Land
    }

    pub fn cells(&self) -> &[CellKind] {
        &self.cells
    }
}

/// Session cache of rasterized base maps, keyed by grid resolution.
///
/// Lookups clone an `Arc`, so an in-progress render keeps its map alive
/// while a resolution change builds and swaps in a new one. All cached maps
/// share this cache's projection bounds.
pub struct BaseMapCache {
    geometry: WorldGeometry,
    index: SpatialIndex,
    cache: Mutex<HashMap<(u16, u16), Arc<BaseMap>>>,
}

impl BaseMapCache {
    pub fn new(geometry: WorldGeometry) -> Self {
        let index = SpatialIndex::build(&geometry.polygons);
        Self {
            geometry,
            index,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the base map for a resolution, rasterizing on first use.
    pub fn get(&self, projection: &Projection) -> Arc<BaseMap> {
        let key = (projection.width, projection.height);
        {
            let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(map) = cache.get(&key) {
                return Arc::clone(map);
            }
        }

        // Rasterize outside the lock; a racing builder just does the same
        // work and the second insert wins harmlessly.
        let map = Arc::new(BaseMap::rasterize(&self.geometry, &self.index, projection));
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(cache.entry(key).or_insert(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_cache() -> BaseMapCache {
        BaseMapCache::new(WorldGeometry::embedded().unwrap())
    }

    #[test]
    fn test_rasterized_dimensions() {
        let cache = world_cache();
        let projection = Projection::new(80, 24);
        let map = cache.get(&projection);

        assert_eq!(map.width, 80);
        assert_eq!(map.height, 24);
        assert_eq!(map.cells().len(), 80 * 24);
    }

    #[test]
    fn test_map_has_both_land_and_ocean() {
        let cache = world_cache();
        let map = cache.get(&Projection::new(80, 24));

        let land = map.cells().iter().filter(|&&c| c == CellKind::Land).count();
        let ocean = map.cells().iter().filter(|&&c| c == CellKind::Ocean).count();
        assert!(land > 0, "no land rendered");
        assert!(ocean > land, "oceans should dominate the grid");
    }

    #[test]
    fn test_open_ocean_never_classified_land() {
        let cache = world_cache();
        let projection = Projection::new(120, 48);
        let map = cache.get(&projection);

        // Held-out open-ocean coordinates, well away from any coastline.
        for &(lat, lon) in &[(0.0, -30.0), (-30.0, -120.0), (-10.0, 80.0), (30.0, -150.0)] {
            let (col, row) = projection.project(lat, lon);
            assert!(
                !map.is_land(col, row),
                "({lat}, {lon}) rendered as land at ({col}, {row})"
            );
        }
    }

    #[test]
    fn test_continental_interiors_are_land() {
        let cache = world_cache();
        let projection = Projection::new(120, 48);
        let map = cache.get(&projection);

        for &(lat, lon) in &[(39.0, -98.0), (56.0, 40.0), (10.0, 20.0), (-25.0, 135.0)] {
            let (col, row) = projection.project(lat, lon);
            assert!(
                map.is_land(col, row),
                "({lat}, {lon}) rendered as ocean at ({col}, {row})"
            );
        }
    }

    #[test]
    fn test_cache_returns_same_map() {
        let cache = world_cache();
        let projection = Projection::new(40, 12);
        let first = cache.get(&projection);
        let second = cache.get(&projection);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cache_distinguishes_resolutions() {
        let cache = world_cache();
        let small = cache.get(&Projection::new(40, 12));
        let large = cache.get(&Projection::new(80, 24));
        assert!(!Arc::ptr_eq(&small, &large));
        assert_eq!(small.width, 40);
        assert_eq!(large.width, 80);
    }
}
