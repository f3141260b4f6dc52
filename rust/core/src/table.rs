// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time-indexed variable tables.
//!
//! One row per `(cell_ID, timeStep)` with a fixed set of named numeric
//! columns (`Tair`, `UTCI`, `WindSpeed`, `WindX`, `WindY`, `RelatHumid`, ...).
//! Missing measurements are stored as `NaN` and read back as `None`.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::{CellId, TimeStep};

/// Row-per-`(cell_ID, timeStep)` table joined to point clouds on `cell_ID`.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesTable {
    columns: Vec<String>,
    rows: FxHashMap<(CellId, TimeStep), Vec<f64>>,
    time_steps: BTreeSet<TimeStep>,
}

impl TimeSeriesTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: FxHashMap::default(),
            time_steps: BTreeSet::new(),
        }
    }

    /// Insert one row. Values are in column order.
    pub fn insert_row(&mut self, cell_id: CellId, time_step: TimeStep, values: Vec<f64>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::ColumnCountMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }

        if self.rows.contains_key(&(cell_id, time_step)) {
            return Err(Error::DuplicateRow { cell_id, time_step });
        }

        self.rows.insert((cell_id, time_step), values);
        self.time_steps.insert(time_step);
        Ok(())
    }

    /// Variable column names in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Distinct time steps, ascending.
    pub fn time_steps(&self) -> Vec<TimeStep> {
        self.time_steps.iter().copied().collect()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Value of `column` for a cell at a time step; `None` if the row is
    /// absent or the value is missing.
    #[inline]
    pub fn value(&self, cell_id: CellId, time_step: TimeStep, column: usize) -> Option<f64> {
        self.rows
            .get(&(cell_id, time_step))
            .and_then(|row| row.get(column).copied())
            .filter(|v| !v.is_nan())
    }

    /// True if the table has any row for the cell at the time step.
    #[inline]
    pub fn has_row(&self, cell_id: CellId, time_step: TimeStep) -> bool {
        self.rows.contains_key(&(cell_id, time_step))
    }

    /// Time series of one variable at one cell, ascending by time step.
    pub fn series(&self, cell_id: CellId, column: &str) -> Result<Vec<(TimeStep, f64)>> {
        let column = self.column_index(column)?;
        Ok(self
            .time_steps
            .iter()
            .filter_map(|&t| self.value(cell_id, t, column).map(|v| (t, v)))
            .collect())
    }

    /// All rows at one time step as `(cell_ID, values)`, sorted by `cell_ID`.
    pub fn rows_at(&self, time_step: TimeStep) -> Vec<(CellId, &[f64])> {
        let mut rows: Vec<(CellId, &[f64])> = self
            .rows
            .iter()
            .filter(|((_, t), _)| *t == time_step)
            .map(|((cell_id, _), values)| (*cell_id, values.as_slice()))
            .collect();
        rows.sort_unstable_by_key(|(cell_id, _)| *cell_id);
        rows
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TimeSeriesTable {
        let mut table = TimeSeriesTable::new(["Tair", "UTCI"]);
        table.insert_row(1, 2, vec![25.0, 30.0]).unwrap();
        table.insert_row(1, 1, vec![24.0, f64::NAN]).unwrap();
        table.insert_row(2, 1, vec![22.5, 27.0]).unwrap();
        table
    }

    #[test]
    fn test_time_steps_sorted_and_unique() {
        assert_eq!(sample().time_steps(), vec![1, 2]);
    }

    #[test]
    fn test_missing_value_reads_as_none() {
        let table = sample();
        let utci = table.column_index("UTCI").unwrap();
        assert_eq!(table.value(1, 1, utci), None);
        assert_eq!(table.value(1, 2, utci), Some(30.0));
        assert_eq!(table.value(9, 2, utci), None);
        assert!(table.has_row(1, 1));
    }

    #[test]
    fn test_series_skips_missing() {
        let table = sample();
        assert_eq!(table.series(1, "Tair").unwrap(), vec![(1, 24.0), (2, 25.0)]);
        assert_eq!(table.series(1, "UTCI").unwrap(), vec![(2, 30.0)]);
    }

    #[test]
    fn test_rows_at_sorted_by_cell() {
        let table = sample();
        let cells: Vec<CellId> = table.rows_at(1).iter().map(|(c, _)| *c).collect();
        assert_eq!(cells, vec![1, 2]);
        assert!(table.rows_at(5).is_empty());
    }

    #[test]
    fn test_rejects_bad_rows() {
        let mut table = sample();
        assert_eq!(
            table.insert_row(1, 1, vec![0.0, 0.0]),
            Err(Error::DuplicateRow { cell_id: 1, time_step: 1 })
        );
        assert_eq!(
            table.insert_row(3, 1, vec![0.0]),
            Err(Error::ColumnCountMismatch { expected: 2, found: 1 })
        );
        assert_eq!(
            table.column_index("WindSpeed"),
            Err(Error::UnknownColumn("WindSpeed".to_string()))
        );
    }
}
