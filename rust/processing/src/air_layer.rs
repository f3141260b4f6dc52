// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Near-surface air layer extraction.
//!
//! Each air point is paired with its horizontally nearest ground point and
//! kept iff `0 <= air.z - ground.z < threshold`.

use microclimate_core::{PointCloud, SpatialPoint};
use microclimate_geometry::PlanarIndex;
use rayon::prelude::*;

use crate::config::AirLayerConfig;
use crate::error::{Error, Result};

/// Selects the air points in a band above the ground.
#[derive(Debug, Clone, Default)]
pub struct AirLayerExtractor {
    config: AirLayerConfig,
}

impl AirLayerExtractor {
    pub fn new(config: AirLayerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AirLayerConfig {
        &self.config
    }

    /// Height of every air point above its nearest ground point, in air
    /// point order.
    ///
    /// Fails with [`Error::NoNearestSurface`] for the first air point that has
    /// no ground point within `search_radius`.
    pub fn heights_above_ground(&self, air: &PointCloud, ground: &PointCloud) -> Result<Vec<f64>> {
        let index = PlanarIndex::build(&ground.points, self.config.index_cell_size);
        let search_radius = self.config.search_radius;

        let heights: Vec<Option<f64>> = air
            .points
            .par_iter()
            .map(|p| {
                index
                    .nearest(&ground.points, p.x, p.y, search_radius)
                    .map(|(i, _)| p.z - ground.points[i].z)
            })
            .collect();

        heights
            .into_iter()
            .zip(&air.points)
            .map(|(height, p)| {
                height.ok_or(Error::NoNearestSurface {
                    point_id: p.cell_id,
                    search_radius,
                })
            })
            .collect()
    }

    /// Keep the air points with `0 <= height above ground < threshold`.
    pub fn extract_near_surface_layer(
        &self,
        air: &PointCloud,
        ground: &PointCloud,
        threshold: f64,
    ) -> Result<PointCloud> {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "air layer threshold must be positive, got {threshold}"
            )));
        }

        let heights = self.heights_above_ground(air, ground)?;
        let layer: Vec<SpatialPoint> = air
            .points
            .iter()
            .zip(&heights)
            .filter(|(_, h)| (0.0..threshold).contains(*h))
            .map(|(p, _)| *p)
            .collect();

        tracing::info!(
            threshold,
            air = air.len(),
            kept = layer.len(),
            "Extracted near-surface air layer"
        );

        Ok(PointCloud::new(air.domain, air.crs.clone(), layer))
    }
}
