//! Equirectangular projection between geographic coordinates and the
//! character grid. Pure and deterministic: identical inputs always map to
//! the same cell, which keeps marker placement stable across refreshes.

/// Bounds of the rendered map in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl MapBounds {
    /// Full world extent.
    pub const WORLD: MapBounds = MapBounds {
        lat_min: -90.0,
        lat_max: 90.0,
        lon_min: -180.0,
        lon_max: 180.0,
    };

    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    pub fn lon_span(&self) -> f64 {
        self.lon_max - self.lon_min
    }
}

/// Projection of geographic coordinates onto a fixed-size character grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub width: u16,
    pub height: u16,
    pub bounds: MapBounds,
}

impl Projection {
    /// Full-world projection at the given grid resolution.
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_bounds(width, height, MapBounds::WORLD)
    }

    pub fn with_bounds(width: u16, height: u16, bounds: MapBounds) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            bounds,
        }
    }

    /// Map latitude/longitude to a grid cell as (col, row).
    ///
    /// Rounded, then clamped into the grid so the longitude wrap at the
    /// antimeridian cannot produce an out-of-range column.
    pub fn project(&self, lat: f64, lon: f64) -> (u16, u16) {
        let col = (lon - self.bounds.lon_min) / self.bounds.lon_span() * self.width as f64;
        let row = (self.bounds.lat_max - lat) / self.bounds.lat_span() * self.height as f64;
        (
            clamp_to(col.round(), self.width),
            clamp_to(row.round(), self.height),
        )
    }

    /// Geographic coordinates of a cell's center as (lat, lon).
    pub fn unproject(&self, col: u16, row: u16) -> (f64, f64) {
        let lon = self.bounds.lon_min
            + (col as f64 + 0.5) / self.width as f64 * self.bounds.lon_span();
        let lat = self.bounds.lat_max
            - (row as f64 + 0.5) / self.height as f64 * self.bounds.lat_span();
        (lat, lon)
    }
}

fn clamp_to(value: f64, size: u16) -> u16 {
    let max = (size - 1) as f64;
    value.clamp(0.0, max) as u16
}
