// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-section fishnet aggregation.
//!
//! Points near a slice polyline are reprojected into a
//! `(distance from origin, height)` plane, joined to one time step of the
//! variable table, and averaged over a regular grid of square cells.
//!
//! Cells are half-open, `[x0, x0 + res) × [y0, y0 + res)`, so each sample
//! belongs to at most one cell. Only occupied cells are stored; a lattice
//! position without a cell has no data, never `0`.

use std::collections::BTreeMap;

use microclimate_core::{CellId, PointCloud, Slice, SpatialPoint, TimeSeriesTable, TimeStep};
use microclimate_geometry::{distance_from_origin, within_buffer, Bounds2D};
use serde::{Deserialize, Serialize};

use crate::config::CrossSectionConfig;
use crate::error::{Error, Result};

/// A point in the section plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionSample {
    pub cell_id: CellId,
    /// Horizontal distance from the slice origin
    pub distance: f64,
    pub height: f64,
    /// `None` when the table holds no value for this point
    pub value: Option<f64>,
}

/// Samples of one slice at one time step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionSelection {
    pub samples: Vec<SectionSample>,
    /// Selected points without a table row at the time step
    pub missing_rows: usize,
}

/// One fishnet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub column: usize,
    pub row: usize,
    /// Lower-left corner in the section plane
    pub min: [f64; 2],
    /// Positions of the member samples
    pub members: Vec<usize>,
    /// Mean of the members' defined values
    pub mean: Option<f64>,
}

/// Regular grid over the `(distance, height)` plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionGrid {
    pub origin: [f64; 2],
    pub resolution: f64,
    pub columns: usize,
    pub rows: usize,
    /// Occupied cells, ordered by row then column
    pub cells: Vec<GridCell>,
    pub samples: Vec<SectionSample>,
    /// Samples that fell outside every cell
    pub unmatched_points: usize,
    /// Selected points that had no table row
    pub missing_rows: usize,
}

impl CrossSectionGrid {
    /// An empty grid with no cells.
    pub fn empty(resolution: f64) -> Self {
        Self {
            origin: [0.0, 0.0],
            resolution,
            columns: 0,
            rows: 0,
            cells: Vec::new(),
            samples: Vec::new(),
            unmatched_points: 0,
            missing_rows: 0,
        }
    }

    /// Lay a `columns × rows` lattice from `origin` and aggregate `samples`
    /// into the cells they fall in.
    pub fn aggregate(
        samples: Vec<SectionSample>,
        origin: [f64; 2],
        resolution: f64,
        columns: usize,
        rows: usize,
    ) -> Self {
        let mut occupied: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        let mut unmatched = 0;
        for (i, sample) in samples.iter().enumerate() {
            let column = ((sample.distance - origin[0]) / resolution).floor();
            let row = ((sample.height - origin[1]) / resolution).floor();
            let inside = column >= 0.0 && row >= 0.0 && column < columns as f64 && row < rows as f64;
            if inside {
                occupied
                    .entry((row as usize, column as usize))
                    .or_default()
                    .push(i);
            } else {
                unmatched += 1;
            }
        }

        let cells = occupied
            .into_iter()
            .map(|((row, column), members)| GridCell {
                column,
                row,
                min: [
                    origin[0] + column as f64 * resolution,
                    origin[1] + row as f64 * resolution,
                ],
                mean: mean(members.iter().filter_map(|&i| samples[i].value)),
                members,
            })
            .collect();

        Self {
            origin,
            resolution,
            columns,
            rows,
            cells,
            samples,
            unmatched_points: unmatched,
            missing_rows: 0,
        }
    }

    /// The occupied cell at `(column, row)`; `None` for an empty position.
    pub fn cell(&self, column: usize, row: usize) -> Option<&GridCell> {
        self.cells
            .binary_search_by_key(&(row, column), |c| (c.row, c.column))
            .ok()
            .map(|i| &self.cells[i])
    }

    /// The cell containing a section-plane position.
    pub fn cell_at(&self, distance: f64, height: f64) -> Option<&GridCell> {
        let column = ((distance - self.origin[0]) / self.resolution).floor();
        let row = ((height - self.origin[1]) / self.resolution).floor();
        if column < 0.0 || row < 0.0 {
            return None;
        }
        self.cell(column as usize, row as usize)
    }

    /// Cells that hold an aggregate.
    pub fn cells_with_data(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter().filter(|c| c.mean.is_some())
    }

    /// Range of the cell aggregates, for colour normalisation.
    pub fn value_range(&self) -> Option<ValueRange> {
        ValueRange::from_values(self.cells.iter().filter_map(|c| c.mean))
    }

    /// Whether the lattice has no positions at all.
    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }
}

/// Minimum and maximum of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Range over the finite values; `None` if there are none.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// Map `value` into `[0, 1]`. A constant field maps everything to `0`.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 {
            return 0.0;
        }
        (value - self.min) / span
    }
}

/// Builds cross-section grids for slices through a point cloud.
#[derive(Debug, Clone, Default)]
pub struct CrossSectionGridBuilder {
    config: CrossSectionConfig,
}

impl CrossSectionGridBuilder {
    pub fn new(config: CrossSectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrossSectionConfig {
        &self.config
    }

    /// Points strictly within the slice buffer, with their distance from the
    /// slice origin. Order follows the cloud.
    pub fn select<'a>(&self, points: &'a PointCloud, slice: &Slice) -> Vec<(&'a SpatialPoint, f64)> {
        let origin = slice.origin();
        points
            .iter()
            .filter(|p| within_buffer(p.xy(), slice.polyline(), slice.buffer_radius()))
            .map(|p| (p, distance_from_origin(origin, p.xy())))
            .collect()
    }

    /// Select and join to the table at `time_step`.
    pub fn sample(
        &self,
        points: &PointCloud,
        slice: &Slice,
        table: &TimeSeriesTable,
        value_column: &str,
        time_step: TimeStep,
    ) -> Result<SectionSelection> {
        let column = table.column_index(value_column)?;
        let mut selection = SectionSelection::default();

        for (p, distance) in self.select(points, slice) {
            if !table.has_row(p.cell_id, time_step) {
                selection.missing_rows += 1;
                continue;
            }
            selection.samples.push(SectionSample {
                cell_id: p.cell_id,
                distance,
                height: p.z,
                value: table.value(p.cell_id, time_step, column),
            });
        }

        Ok(selection)
    }

    /// Build the fishnet grid of `value_column` at `time_step`.
    pub fn build_grid(
        &self,
        points: &PointCloud,
        slice: &Slice,
        resolution: f64,
        table: &TimeSeriesTable,
        value_column: &str,
        time_step: TimeStep,
    ) -> Result<CrossSectionGrid> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "grid resolution must be positive, got {resolution}"
            )));
        }

        let selection = self.sample(points, slice, table, value_column, time_step)?;
        let mut grid = self.grid_from_samples(selection.samples, resolution);
        grid.missing_rows = selection.missing_rows;

        if grid.unmatched_points > 0 {
            tracing::warn!(
                unmatched = grid.unmatched_points,
                "Section samples fell outside every grid cell"
            );
        }
        tracing::info!(
            samples = grid.samples.len(),
            columns = grid.columns,
            rows = grid.rows,
            missing_rows = grid.missing_rows,
            time_step,
            value_column,
            "Built cross-section grid"
        );

        Ok(grid)
    }

    /// Cover the sample extent with cells of side `resolution`.
    pub fn grid_from_samples(&self, samples: Vec<SectionSample>, resolution: f64) -> CrossSectionGrid {
        let Some(bounds) = Bounds2D::from_points(samples.iter().map(|s| [s.distance, s.height])) else {
            return CrossSectionGrid::empty(resolution);
        };

        let margin = self.config.origin_margin;
        let origin = [
            bounds.min[0] - margin * bounds.min[0].abs(),
            bounds.min[1] - margin * bounds.min[1].abs(),
        ];
        let columns = ((bounds.max[0] - origin[0]) / resolution).floor() as usize + 1;
        let rows = ((bounds.max[1] - origin[1]) / resolution).floor() as usize + 1;

        CrossSectionGrid::aggregate(samples, origin, resolution, columns, rows)
    }
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
