// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point clouds for the `surface` and `air` domains.
//!
//! Raw geometry records are validated one by one. A record that cannot be
//! turned into a point is reported in the [`LoadReport`] together with the
//! reason, never skipped silently.

use crate::error::{Error, Result};
use crate::CellId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which simulation grid a point cloud samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointDomain {
    /// Points on the ground and building surfaces.
    Surface,
    /// Points in the air volume above the surfaces.
    Air,
}

impl PointDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointDomain::Surface => "surface",
            PointDomain::Air => "air",
        }
    }
}

/// A single sample location with its `cell_ID`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialPoint {
    pub cell_id: CellId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SpatialPoint {
    #[inline]
    pub fn new(cell_id: CellId, x: f64, y: f64, z: f64) -> Self {
        Self { cell_id, x, y, z }
    }

    /// Horizontal position `(x, y)`.
    #[inline]
    pub fn xy(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// An unvalidated point record as delivered by the data loader.
///
/// `coords` holds `x, y, z` in that order; anything shorter is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub cell_id: Option<CellId>,
    pub coords: Vec<f64>,
}

impl PointRecord {
    pub fn new(cell_id: Option<CellId>, coords: Vec<f64>) -> Self {
        Self { cell_id, coords }
    }

    fn validate(&self, index: usize) -> Result<SpatialPoint> {
        let cell_id = self.cell_id.ok_or_else(|| Error::InvalidRecord {
            index,
            reason: "missing cell_ID".to_string(),
        })?;

        if self.coords.len() < 3 {
            return Err(Error::InvalidRecord {
                index,
                reason: format!("expected x, y, z but found {} coordinates", self.coords.len()),
            });
        }

        let (x, y, z) = (self.coords[0], self.coords[1], self.coords[2]);
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(Error::InvalidRecord {
                index,
                reason: format!("non-finite coordinate ({x}, {y}, {z})"),
            });
        }

        Ok(SpatialPoint::new(cell_id, x, y, z))
    }
}

/// A record rejected during loading.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub index: usize,
    pub error: Error,
}

/// Outcome of validating a batch of point records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedRecord>,
}

impl LoadReport {
    /// True when every record became a point.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Turns the report into an error carrying the first rejection.
    pub fn into_result(self) -> Result<usize> {
        match self.rejected.into_iter().next() {
            Some(rejected) => Err(rejected.error),
            None => Ok(self.accepted),
        }
    }
}

/// A point cloud for one domain.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointCloud {
    pub domain: PointDomain,
    /// Coordinate reference system name (e.g. "EPSG:32632")
    pub crs: Option<String>,
    pub points: Vec<SpatialPoint>,
}

impl PointCloud {
    pub fn new(domain: PointDomain, crs: Option<String>, points: Vec<SpatialPoint>) -> Self {
        Self {
            domain,
            crs,
            points,
        }
    }

    /// Validates raw records, keeping every valid one and reporting the rest.
    pub fn from_records<I>(domain: PointDomain, crs: Option<String>, records: I) -> (Self, LoadReport)
    where
        I: IntoIterator<Item = PointRecord>,
    {
        let mut points = Vec::new();
        let mut report = LoadReport::default();

        for (index, record) in records.into_iter().enumerate() {
            match record.validate(index) {
                Ok(point) => {
                    points.push(point);
                    report.accepted += 1;
                }
                Err(error) => report.rejected.push(RejectedRecord { index, error }),
            }
        }

        (Self::new(domain, crs, points), report)
    }

    /// Keeps the points for which `keep` returns true, preserving order and CRS.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&SpatialPoint) -> bool,
    {
        Self::new(
            self.domain,
            self.crs.clone(),
            self.points.iter().filter(|p| keep(p)).copied().collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpatialPoint> {
        self.points.iter()
    }
}
