// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Microclimate Core
//!
//! Data model shared by the surface classification and spatial derivation
//! pipeline of the microclimate viewer.
//!
//! ## Overview
//!
//! - **Point clouds**: `surface` and `air` domain points keyed by `cell_ID`,
//!   validated record by record with an explicit [`LoadReport`]
//! - **Surface meshes**: triangulated building/ground facets with their
//!   coordinate reference system
//! - **Time series**: row-per-`(cell_ID, timeStep)` variable tables joined to
//!   point clouds on `cell_ID`
//! - **Slices**: cross-section polylines with a selection buffer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use microclimate_core::{PointCloud, PointDomain, PointRecord, TimeSeriesTable};
//!
//! let records = vec![PointRecord::new(Some(1), vec![10.0, 20.0, 0.5])];
//! let (cloud, report) = PointCloud::from_records(PointDomain::Surface, None, records);
//! assert!(report.is_clean());
//!
//! let mut table = TimeSeriesTable::new(["Tair", "UTCI"]);
//! table.insert_row(1, 12, vec![28.4, 31.0])?;
//! let tair = table.column_index("Tair")?;
//! assert_eq!(table.value(1, 12, tair), Some(28.4));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for points and slices

pub mod error;
pub mod mesh;
pub mod point;
pub mod slice;
pub mod table;

pub use error::{Error, Result};
pub use mesh::{Facet, FacetRing, SurfaceMesh};
pub use point::{LoadReport, PointCloud, PointDomain, PointRecord, RejectedRecord, SpatialPoint};
pub use slice::Slice;
pub use table::TimeSeriesTable;

/// Stable identifier linking a geometry point to its rows in a time series.
pub type CellId = u32;

/// Simulation time step (hour index in the source datasets).
pub type TimeStep = i32;
