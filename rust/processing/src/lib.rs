// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Microclimate Processing
//!
//! Cached derivation stages of the microclimate viewer: surface
//! classification, building removal, near-surface air layers and
//! cross-section grids.
//!
//! ## Overview
//!
//! - **ArtifactCache**: content-addressed disk cache keyed by input digest and
//!   parameters
//! - **BuildingFilter**: keeps true ground-level points of the surface cloud
//! - **AirLayerExtractor**: air points in a band above the nearest ground
//! - **CrossSectionGridBuilder**: fishnet aggregation along a slice
//! - **SurfacePipeline**: the stages above behind one configured facade
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use microclimate_processing::{PipelineConfig, SurfacePipeline};
//!
//! let pipeline = SurfacePipeline::new(PipelineConfig::from_env())?;
//! let surfaces = pipeline.classify(&mesh)?;
//! let ground = pipeline.ground_points(&surface_points)?;
//! let layer = pipeline.air_layer(&air_points, &ground, 2.0)?;
//!
//! let slice = pipeline.slice(vec![[0.0, 0.0], [120.0, 40.0]])?;
//! let grid = pipeline.cross_section(&air_points, &slice, &table, "Tair", 12)?;
//! ```

pub mod air_layer;
pub mod aoi;
pub mod cache;
pub mod config;
pub mod cross_section;
pub mod error;
pub mod export;
pub mod ground;
pub mod jobs;
pub mod pipeline;
pub mod wind;

pub use air_layer::AirLayerExtractor;
pub use aoi::{aoi_series, aoi_series_many, AoiSeries, AreaOfInterest};
pub use cache::{ArtifactCache, ArtifactKey, ArtifactKind, CacheStats, InputDigest};
pub use config::{
    AirLayerConfig, BuildingFilterConfig, CacheConfig, CrossSectionConfig, PipelineConfig,
};
pub use cross_section::{
    CrossSectionGrid, CrossSectionGridBuilder, GridCell, SectionSample, SectionSelection,
    ValueRange,
};
pub use error::{Error, Result};
pub use export::{points_to_geojson, surface_to_geojson, ArtifactExporter, FeatureCollection};
pub use ground::BuildingFilter;
pub use jobs::{spawn_job, JobHandle};
pub use pipeline::SurfacePipeline;
pub use wind::{speed_levels, wind_direction, wind_field, WindSample};
