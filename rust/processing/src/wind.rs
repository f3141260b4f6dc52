// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wind derivations from the `WindX`/`WindY`/`WindSpeed` columns.

use microclimate_core::{CellId, TimeSeriesTable, TimeStep};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const WIND_X: &str = "WindX";
pub const WIND_Y: &str = "WindY";
pub const WIND_SPEED: &str = "WindSpeed";

/// Meteorological wind direction in degrees `[0, 360)`, the direction the
/// wind blows from, for a flow vector `(x, y)`.
pub fn wind_direction(x: f64, y: f64) -> f64 {
    (270.0 - y.atan2(x).to_degrees()).rem_euclid(360.0)
}

/// Speed and direction of one cell at one time step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    pub cell_id: CellId,
    pub speed: Option<f64>,
    /// `None` when either vector component is missing
    pub direction: Option<f64>,
}

/// Wind samples for every row at `time_step`, ordered by `cell_ID`.
pub fn wind_field(table: &TimeSeriesTable, time_step: TimeStep) -> Result<Vec<WindSample>> {
    let x = table.column_index(WIND_X)?;
    let y = table.column_index(WIND_Y)?;
    let speed = table.column_index(WIND_SPEED)?;

    Ok(table
        .rows_at(time_step)
        .into_iter()
        .map(|(cell_id, _)| {
            let direction = match (table.value(cell_id, time_step, x), table.value(cell_id, time_step, y)) {
                (Some(wx), Some(wy)) => Some(wind_direction(wx, wy)),
                _ => None,
            };
            WindSample {
                cell_id,
                speed: table.value(cell_id, time_step, speed),
                direction,
            }
        })
        .collect())
}

/// Speed bin edges for a wind rose.
///
/// Steps from `floor(min)` to `ceil(max)` inclusive by `(min + max) / 10`,
/// rounds half to even and removes duplicates. A non-positive step yields
/// just the floor and ceiling of the range.
pub fn speed_levels(speeds: &[f64]) -> Vec<i64> {
    let finite = speeds.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        return Vec::new();
    }

    let start = min.floor();
    let stop = max.ceil() + 1.0;
    let step = (min + max) / 10.0;

    let mut levels: Vec<i64> = if step > 0.0 {
        let count = ((stop - start) / step).ceil() as usize;
        (0..count)
            .map(|k| (start + k as f64 * step).round_ties_even() as i64)
            .collect()
    } else {
        vec![start as i64, max.ceil() as i64]
    };

    levels.sort_unstable();
    levels.dedup();
    levels
}
