//! Geographic-to-terminal rendering engine.

pub mod basemap;
pub mod geometry;
pub mod overlay;
pub mod projector;
pub mod sparkline;

pub use basemap::{BaseMap, BaseMapCache, CellKind};
pub use geometry::{BoundingBox, GeometryError, Polygon, SpatialIndex, WorldGeometry};
pub use overlay::{compose, project_markers, CellClass, Frame, Marker};
pub use projector::{MapBounds, Projection};
