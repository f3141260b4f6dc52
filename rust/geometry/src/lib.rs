//! Microclimate Geometry Processing
//!
//! Facet classification of urban surface meshes, 2D dissolve using i_overlay,
//! and the planar primitives and spatial index shared by the point filters.

pub mod bool2d;
pub mod classify;
pub mod error;
pub mod polygon;
pub mod primitives;
pub mod spatial;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector3};

pub use bool2d::{buffer_footprint, dissolve};
pub use classify::{
    CategorizedSurface, Category, ClassifiedSurfaces, ClassifierConfig, FacetClass, MeshClassifier,
    Orientation,
};
pub use error::{Error, Result};
pub use polygon::Polygon2D;
pub use primitives::{
    distance_from_origin, distance_to_polyline, facet_normal, planar_distance, within_buffer,
    Bounds2D,
};
pub use spatial::PlanarIndex;
