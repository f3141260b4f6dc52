// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the processing pipeline.

use microclimate_core::CellId;
use thiserror::Error;

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Processing error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a persisted artifact failed.
    #[error("Cache I/O error: {0}")]
    CacheIo(String),

    #[error("No ground point within {search_radius} of air point {point_id}")]
    NoNearestSurface { point_id: CellId, search_radius: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Background worker ended without a result")]
    WorkerLost,

    #[error("Geometry error: {0}")]
    Geometry(#[from] microclimate_geometry::Error),

    #[error("Core data error: {0}")]
    Core(#[from] microclimate_core::Error),
}

impl From<cacache::Error> for Error {
    fn from(err: cacache::Error) -> Self {
        Error::CacheIo(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::CacheIo(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CacheIo(format!("JSON error: {}", err))
    }
}
