// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Area-of-interest time series.
//!
//! For a polygon drawn over the site, average one variable over the points
//! inside it at every time step of the table.

use std::collections::BTreeSet;

use microclimate_core::{CellId, PointCloud, TimeSeriesTable, TimeStep};
use microclimate_geometry::Polygon2D;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named selection polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    pub name: String,
    pub polygon: Polygon2D,
}

impl AreaOfInterest {
    pub fn new(name: impl Into<String>, polygon: Polygon2D) -> Self {
        Self {
            name: name.into(),
            polygon,
        }
    }

    /// Area from a single ring; fails if the ring encloses no area.
    pub fn from_ring(name: impl Into<String>, ring: Vec<[f64; 2]>) -> Result<Self> {
        Ok(Self::new(name, Polygon2D::try_new(ring)?))
    }

    /// `cell_ID`s of the points inside the polygon, ascending and unique.
    pub fn cells_within(&self, cloud: &PointCloud) -> Vec<CellId> {
        let cells: BTreeSet<CellId> = cloud
            .iter()
            .filter(|p| self.polygon.contains(p.xy()))
            .map(|p| p.cell_id)
            .collect();
        cells.into_iter().collect()
    }
}

/// Mean of one variable inside an area, per time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoiSeries {
    pub name: String,
    pub column: String,
    /// Number of distinct cells inside the area
    pub cells: usize,
    /// One entry per table time step; `None` where no cell has a value
    pub values: Vec<(TimeStep, Option<f64>)>,
}

impl AoiSeries {
    /// Time steps that carry a mean.
    pub fn defined(&self) -> impl Iterator<Item = (TimeStep, f64)> + '_ {
        self.values.iter().filter_map(|&(t, v)| v.map(|v| (t, v)))
    }
}

/// Per-time-step mean of `column` over the cells inside `aoi`.
pub fn aoi_series(
    cloud: &PointCloud,
    table: &TimeSeriesTable,
    aoi: &AreaOfInterest,
    column: &str,
) -> Result<AoiSeries> {
    let column_index = table.column_index(column)?;
    let cells = aoi.cells_within(cloud);

    let values = table
        .time_steps()
        .into_iter()
        .map(|t| {
            let (sum, count) = cells
                .iter()
                .filter_map(|&cell| table.value(cell, t, column_index))
                .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            (t, (count > 0).then(|| sum / count as f64))
        })
        .collect();

    Ok(AoiSeries {
        name: aoi.name.clone(),
        column: column.to_string(),
        cells: cells.len(),
        values,
    })
}

/// [`aoi_series`] for several areas at once, in input order.
pub fn aoi_series_many(
    cloud: &PointCloud,
    table: &TimeSeriesTable,
    aois: &[AreaOfInterest],
    column: &str,
) -> Result<Vec<AoiSeries>> {
    aois.par_iter()
        .map(|aoi| aoi_series(cloud, table, aoi, column))
        .collect()
}
