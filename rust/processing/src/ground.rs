// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building removal for ground point clouds.
//!
//! The surface grid also samples building roofs, so a ground cloud holds
//! vertical stacks of points wherever a building stands. Points are grouped
//! into `(x, y)` columns; everything above a column's lowest point is
//! dropped, and so is every point within `neighbour_radius` of a column
//! minimum that rises more than `elevation_tolerance` above it.
//!
//! Both tests run against the unfiltered cloud, so the result does not depend
//! on point order.

use microclimate_core::{PointCloud, SpatialPoint};
use microclimate_geometry::PlanarIndex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::BuildingFilterConfig;

/// Horizontal position truncated to a fixed number of decimals.
type ColumnKey = (i64, i64);

/// Removes building points from a ground point cloud.
#[derive(Debug, Clone, Default)]
pub struct BuildingFilter {
    config: BuildingFilterConfig,
}

impl BuildingFilter {
    pub fn new(config: BuildingFilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildingFilterConfig {
        &self.config
    }

    /// Keep only ground-level points. Order and CRS are preserved.
    pub fn remove_buildings(&self, ground: &PointCloud) -> PointCloud {
        let points = &ground.points;
        let columns = self.columns(points);
        let index = PlanarIndex::build(points, self.config.neighbour_radius);

        let radius = self.config.neighbour_radius;
        let tolerance = self.config.elevation_tolerance;

        // (stacked, nearby) drop lists per column
        let drops: Vec<(Vec<usize>, Vec<usize>)> = columns
            .par_iter()
            .map(|members| {
                let base = lowest(points, members);
                let min_z = points[base].z;

                let stacked: Vec<usize> = members
                    .iter()
                    .copied()
                    .filter(|&i| points[i].z > min_z)
                    .collect();

                let nearby: Vec<usize> = index
                    .within_radius(points, points[base].x, points[base].y, radius)
                    .into_iter()
                    .filter(|&i| points[i].z > min_z + tolerance)
                    .collect();

                (stacked, nearby)
            })
            .collect();

        let mut dropped = vec![false; points.len()];
        let (mut stacked_count, mut nearby_count) = (0usize, 0usize);
        for (stacked, nearby) in &drops {
            for &i in stacked {
                if !dropped[i] {
                    dropped[i] = true;
                    stacked_count += 1;
                }
            }
            for &i in nearby {
                if !dropped[i] {
                    dropped[i] = true;
                    nearby_count += 1;
                }
            }
        }

        let kept: Vec<SpatialPoint> = points
            .iter()
            .zip(&dropped)
            .filter(|(_, d)| !**d)
            .map(|(p, _)| *p)
            .collect();

        tracing::info!(
            columns = columns.len(),
            kept = kept.len(),
            stacked = stacked_count,
            nearby = nearby_count,
            "Removed building points from ground cloud"
        );

        PointCloud::new(ground.domain, ground.crs.clone(), kept)
    }

    /// Point positions grouped by column, in ascending key order.
    fn columns(&self, points: &[SpatialPoint]) -> Vec<Vec<usize>> {
        let mut groups: FxHashMap<ColumnKey, Vec<usize>> = FxHashMap::default();
        for (i, p) in points.iter().enumerate() {
            groups.entry(self.column_key(p)).or_default().push(i);
        }

        let mut columns: Vec<(ColumnKey, Vec<usize>)> = groups.into_iter().collect();
        columns.sort_unstable_by_key(|(key, _)| *key);
        columns.into_iter().map(|(_, members)| members).collect()
    }

    fn column_key(&self, p: &SpatialPoint) -> ColumnKey {
        let scale = 10f64.powi(self.config.column_decimals as i32);
        ((p.x * scale).trunc() as i64, (p.y * scale).trunc() as i64)
    }
}

/// Lowest member of a column; ties go to the earliest point.
fn lowest(points: &[SpatialPoint], members: &[usize]) -> usize {
    members
        .iter()
        .copied()
        .fold(members[0], |best, i| if points[i].z < points[best].z { i } else { best })
}
