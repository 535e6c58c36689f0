//! Live frame composition: the cached base map plus current server markers.

use crate::monitor::registry::ServerEntry;
use crate::monitor::server::{ServerId, Status, StatusThresholds};
use crate::render::basemap::{BaseMap, CellKind};
use crate::render::projector::Projection;
use std::sync::Arc;

/// Glyphs for the static layer of the map.
const LAND_CHAR: char = '*';
const OCEAN_CHAR: char = ' ';

/// Per-cell classification of a rendered frame, for the consuming UI to
/// color cells without re-parsing characters. A marker cell records which
/// server won the cell for this render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    Ocean,
    Land,
    Marker(ServerId, Status),
}

/// One server marker placed on the grid for the current render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub id: ServerId,
    pub col: u16,
    pub row: u16,
    pub status: Status,
}

/// A rendered frame: the character grid and its parallel metadata grid.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    chars: Vec<char>,
    classes: Vec<CellClass>,
}

impl Frame {
    pub fn char_at(&self, col: u16, row: u16) -> char {
        self.chars[self.index(col, row)]
    }

    pub fn class_at(&self, col: u16, row: u16) -> CellClass {
        self.classes[self.index(col, row)]
    }

    /// One row of the character grid as plain text.
    pub fn row_text(&self, row: u16) -> String {
        let start = row as usize * self.width as usize;
        self.chars[start..start + self.width as usize]
            .iter()
            .collect()
    }

    fn index(&self, col: u16, row: u16) -> usize {
        row as usize * self.width as usize + col as usize
    }
}

/// Project every entry to a marker for the current pass.
pub fn project_markers(
    entries: &[Arc<ServerEntry>],
    projection: &Projection,
    thresholds: StatusThresholds,
) -> Vec<Marker> {
    entries
        .iter()
        .map(|entry| {
            let (col, row) = projection.project(entry.server.latitude, entry.server.longitude);
            Marker {
                id: entry.server.id,
                col,
                row,
                status: entry.status(thresholds),
            }
        })
        .collect()
}

/// Compose the base map with the given markers into a frame.
///
/// Collision tie-break: when several servers project to one cell, the most
/// severe status wins; equal severity falls back to the lowest server id.
/// The ordering is total, so repeated renders of the same state always
/// produce the same frame.
pub fn compose(base: &BaseMap, markers: &[Marker]) -> Frame {
    let width = base.width;
    let height = base.height;
    let mut chars = Vec::with_capacity(width as usize * height as usize);
    let mut classes = Vec::with_capacity(width as usize * height as usize);

    for cell in base.cells() {
        match cell {
            CellKind::Land => {
                chars.push(LAND_CHAR);
                classes.push(CellClass::Land);
            }
            CellKind::Ocean => {
                chars.push(OCEAN_CHAR);
                classes.push(CellClass::Ocean);
            }
        }
    }

    // Stamp in ascending precedence so the last write is the winner.
    let mut ordered: Vec<&Marker> = markers.iter().collect();
    ordered.sort_by(|a, b| {
        (a.status.severity(), b.id).cmp(&(b.status.severity(), a.id))
    });
    for marker in ordered {
        if marker.col >= width || marker.row >= height {
            continue;
        }
        let idx = marker.row as usize * width as usize + marker.col as usize;
        chars[idx] = marker.status.glyph();
        classes[idx] = CellClass::Marker(marker.id, marker.status);
    }

    Frame {
        width,
        height,
        chars,
        classes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::geometry::{SpatialIndex, WorldGeometry};

    fn small_base() -> BaseMap {
        let world = WorldGeometry::embedded().unwrap();
        let index = SpatialIndex::build(&world.polygons);
        BaseMap::rasterize(&world, &index, &Projection::new(40, 12))
    }

    fn marker(id: u64, col: u16, row: u16, status: Status) -> Marker {
        Marker {
            id: ServerId(id),
            col,
            row,
            status,
        }
    }

    #[test]
    fn test_compose_carries_base_classes() {
        let base = small_base();
        let frame = compose(&base, &[]);

        for row in 0..base.height {
            for col in 0..base.width {
                match base.kind_at(col, row) {
                    CellKind::Land => {
                        assert_eq!(frame.char_at(col, row), '*');
                        assert_eq!(frame.class_at(col, row), CellClass::Land);
                    }
                    CellKind::Ocean => {
                        assert_eq!(frame.char_at(col, row), ' ');
                        assert_eq!(frame.class_at(col, row), CellClass::Ocean);
                    }
                }
            }
        }
    }

    #[test]
    fn test_marker_overrides_base() {
        let base = small_base();
        let frame = compose(&base, &[marker(1, 5, 5, Status::Healthy)]);

        assert_eq!(frame.char_at(5, 5), '●');
        assert_eq!(
            frame.class_at(5, 5),
            CellClass::Marker(ServerId(1), Status::Healthy)
        );
    }

    #[test]
    fn test_collision_most_severe_wins() {
        let base = small_base();
        let frame = compose(
            &base,
            &[
                marker(1, 5, 5, Status::Healthy),
                marker(2, 5, 5, Status::Unreachable),
                marker(3, 5, 5, Status::Degraded),
            ],
        );

        assert_eq!(
            frame.class_at(5, 5),
            CellClass::Marker(ServerId(2), Status::Unreachable)
        );
    }

    #[test]
    fn test_collision_equal_severity_lowest_id_wins() {
        let base = small_base();
        // Same severity: id 2 must win regardless of marker order.
        let forward = compose(
            &base,
            &[marker(2, 5, 5, Status::Degraded), marker(7, 5, 5, Status::Degraded)],
        );
        let reversed = compose(
            &base,
            &[marker(7, 5, 5, Status::Degraded), marker(2, 5, 5, Status::Degraded)],
        );

        assert_eq!(
            forward.class_at(5, 5),
            CellClass::Marker(ServerId(2), Status::Degraded)
        );
        assert_eq!(
            reversed.class_at(5, 5),
            CellClass::Marker(ServerId(2), Status::Degraded),
            "tie-break must not depend on marker order"
        );
    }

    #[test]
    fn test_compose_is_deterministic() {
        let base = small_base();
        let markers = vec![
            marker(1, 3, 2, Status::Healthy),
            marker(2, 3, 2, Status::Critical),
            marker(3, 10, 8, Status::Unknown),
        ];
        let first = compose(&base, &markers);
        let second = compose(&base, &markers);

        for row in 0..first.height {
            assert_eq!(first.row_text(row), second.row_text(row));
        }
    }

    #[test]
    fn test_unknown_marker_glyph() {
        let base = small_base();
        let frame = compose(&base, &[marker(1, 0, 0, Status::Unknown)]);
        assert_eq!(frame.char_at(0, 0), '○');
    }
}
