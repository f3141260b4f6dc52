// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the data model.

use crate::{CellId, TimeStep};
use thiserror::Error;

/// Result type alias for data model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or querying the data model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A geometry record could not be turned into a point or facet.
    #[error("invalid record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// A variable column was requested that the table does not have.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A `(cell_ID, timeStep)` pair was inserted twice.
    #[error("duplicate row for cell {cell_id} at time step {time_step}")]
    DuplicateRow { cell_id: CellId, time_step: TimeStep },

    /// A row does not match the table's column layout.
    #[error("row has {found} values but the table has {expected} columns")]
    ColumnCountMismatch { expected: usize, found: usize },

    #[error("invalid polyline: {0}")]
    InvalidPolyline(String),
}
