// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration loaded from environment variables.
//!
//! Every setting has a default; `MICROCLIMATE_*` variables override them and
//! fall back to the default when they do not parse.

use std::path::PathBuf;
use std::str::FromStr;

use microclimate_core::TimeStep;
use microclimate_geometry::ClassifierConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where persisted artifacts live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory of the content-addressed store.
    pub root: PathBuf,
    /// Prefix of every key, so several projects can share one root.
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let root = std::env::current_dir()
            .map(|dir| dir.join(".cache").join("microclimate"))
            .unwrap_or_else(|_| PathBuf::from("./.cache/microclimate"));
        Self {
            root,
            namespace: "microclimate".into(),
        }
    }
}

/// Building removal on the ground point cloud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingFilterConfig {
    /// Decimal places kept when grouping points into `(x, y)` columns.
    pub column_decimals: u32,
    /// Horizontal radius around each column minimum that is inspected.
    pub neighbour_radius: f64,
    /// Height above the column minimum beyond which a neighbour is dropped.
    pub elevation_tolerance: f64,
}

impl Default for BuildingFilterConfig {
    fn default() -> Self {
        Self {
            column_decimals: 2,
            neighbour_radius: 20.0,
            elevation_tolerance: 10.0,
        }
    }
}

/// Near-surface air layer extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirLayerConfig {
    /// Upper bound (exclusive) of the height above ground, in metres.
    pub threshold: f64,
    /// Horizontal distance beyond which no ground point counts as nearest.
    pub search_radius: f64,
    /// Cell size of the ground point index.
    pub index_cell_size: f64,
}

impl Default for AirLayerConfig {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            search_radius: 50.0,
            index_cell_size: 5.0,
        }
    }
}

/// Cross-section fishnet aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSectionConfig {
    /// Cell side length.
    pub resolution: f64,
    /// Selection distance around the slice polyline.
    pub buffer_radius: f64,
    /// Fraction of `|min|` by which the grid origin is pushed outward.
    pub origin_margin: f64,
    pub time_step: TimeStep,
    pub value_column: String,
}

impl Default for CrossSectionConfig {
    fn default() -> Self {
        Self {
            resolution: 10.0,
            buffer_radius: 1.0,
            origin_margin: 0.1,
            time_step: 12,
            value_column: "Tair".into(),
        }
    }
}

/// Configuration of the whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cache: CacheConfig,
    pub classifier: ClassifierConfig,
    pub building_filter: BuildingFilterConfig,
    pub air_layer: AirLayerConfig,
    pub cross_section: CrossSectionConfig,
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache = CacheConfig {
            root: std::env::var("MICROCLIMATE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache.root),
            namespace: std::env::var("MICROCLIMATE_CACHE_NAMESPACE")
                .unwrap_or(defaults.cache.namespace),
        };

        let classifier = ClassifierConfig {
            normal_tolerance: env_or("MICROCLIMATE_NORMAL_TOLERANCE", defaults.classifier.normal_tolerance),
            wall_buffer: env_or("MICROCLIMATE_WALL_BUFFER", defaults.classifier.wall_buffer),
        };

        let building_filter = BuildingFilterConfig {
            column_decimals: env_or("MICROCLIMATE_COLUMN_DECIMALS", defaults.building_filter.column_decimals),
            neighbour_radius: env_or("MICROCLIMATE_NEIGHBOUR_RADIUS", defaults.building_filter.neighbour_radius),
            elevation_tolerance: env_or(
                "MICROCLIMATE_ELEVATION_TOLERANCE",
                defaults.building_filter.elevation_tolerance,
            ),
        };

        let air_layer = AirLayerConfig {
            threshold: env_or("MICROCLIMATE_AIR_THRESHOLD", defaults.air_layer.threshold),
            search_radius: env_or("MICROCLIMATE_SEARCH_RADIUS", defaults.air_layer.search_radius),
            index_cell_size: env_or("MICROCLIMATE_INDEX_CELL_SIZE", defaults.air_layer.index_cell_size),
        };

        let cross_section = CrossSectionConfig {
            resolution: env_or("MICROCLIMATE_GRID_RESOLUTION", defaults.cross_section.resolution),
            buffer_radius: env_or("MICROCLIMATE_SLICE_BUFFER", defaults.cross_section.buffer_radius),
            origin_margin: env_or("MICROCLIMATE_ORIGIN_MARGIN", defaults.cross_section.origin_margin),
            time_step: env_or("MICROCLIMATE_TIME_STEP", defaults.cross_section.time_step),
            value_column: std::env::var("MICROCLIMATE_VALUE_COLUMN")
                .unwrap_or(defaults.cross_section.value_column),
        };

        Self {
            cache,
            classifier,
            building_filter,
            air_layer,
            cross_section,
        }
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("classifier.wall_buffer", self.classifier.wall_buffer),
            ("building_filter.neighbour_radius", self.building_filter.neighbour_radius),
            ("air_layer.threshold", self.air_layer.threshold),
            ("air_layer.search_radius", self.air_layer.search_radius),
            ("air_layer.index_cell_size", self.air_layer.index_cell_size),
            ("cross_section.resolution", self.cross_section.resolution),
            ("cross_section.buffer_radius", self.cross_section.buffer_radius),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidParameter(format!("{name} must be positive, got {value}")));
            }
        }

        if !(self.classifier.normal_tolerance >= 0.0) {
            return Err(Error::InvalidParameter(
                "classifier.normal_tolerance must not be negative".into(),
            ));
        }
        if !(self.cross_section.origin_margin >= 0.0) {
            return Err(Error::InvalidParameter(
                "cross_section.origin_margin must not be negative".into(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_program_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.classifier.wall_buffer, 0.001);
        assert_eq!(config.building_filter.neighbour_radius, 20.0);
        assert_eq!(config.building_filter.elevation_tolerance, 10.0);
        assert_eq!(config.air_layer.threshold, 2.0);
        assert_eq!(config.cross_section.resolution, 10.0);
        assert_eq!(config.cross_section.time_step, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("MICROCLIMATE_TEST_ONLY_VALUE", "not-a-number");
        assert_eq!(env_or("MICROCLIMATE_TEST_ONLY_VALUE", 3.5), 3.5);
        std::env::set_var("MICROCLIMATE_TEST_ONLY_VALUE", " 7 ");
        assert_eq!(env_or("MICROCLIMATE_TEST_ONLY_VALUE", 3_i32), 7);
        std::env::remove_var("MICROCLIMATE_TEST_ONLY_VALUE");
        assert_eq!(env_or("MICROCLIMATE_TEST_ONLY_VALUE", 1_u32), 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"air_layer": {"threshold": 3.0}}"#).unwrap();
        assert_eq!(config.air_layer.threshold, 3.0);
        assert_eq!(config.air_layer.search_radius, 50.0);
        assert_eq!(config.cross_section.value_column, "Tair");
    }

    #[test]
    fn test_validate_rejects_zero_resolution() {
        let mut config = PipelineConfig::default();
        config.cross_section.resolution = 0.0;
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));
    }
}
