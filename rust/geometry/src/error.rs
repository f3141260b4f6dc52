// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug)]
pub enum Error {
    /// A facet whose leading vertices are collinear or coincident.
    #[error("Degenerate geometry in facet {facet}: {reason}")]
    DegenerateGeometry { facet: usize, reason: String },

    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("Core data error: {0}")]
    Core(#[from] microclimate_core::Error),
}
