// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GeoJSON export of classified surfaces and point subsets.
//!
//! Files are written next to each other in one output directory:
//! `ground.geojson`, `walls.geojson`, `rooftops.geojson`,
//! `ground_points.geojson` and `air_layer_<threshold>m.geojson`. Each file is
//! written to a temporary sibling and renamed into place.

use std::path::{Path, PathBuf};

use microclimate_core::PointCloud;
use microclimate_geometry::{CategorizedSurface, ClassifiedSurfaces, Polygon2D};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// GeoJSON `FeatureCollection` with the legacy named-CRS member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<NamedCrs>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCrs {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 3]),
    /// Polygons of closed rings, exterior first
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

impl FeatureCollection {
    fn new(crs: Option<&str>, features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection".into(),
            crs: crs.map(|name| {
                let mut properties = Map::new();
                properties.insert("name".into(), Value::from(name));
                NamedCrs {
                    kind: "name".into(),
                    properties,
                }
            }),
            features,
        }
    }
}

impl Feature {
    fn new(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self {
            kind: "Feature".into(),
            geometry,
            properties,
        }
    }
}

/// One multipolygon feature for the whole surface.
pub fn surface_to_geojson(surface: &CategorizedSurface) -> FeatureCollection {
    let polygons = surface.polygons.iter().map(polygon_rings).collect();

    let mut properties = Map::new();
    properties.insert("category".into(), Value::from(surface.category.as_str()));
    properties.insert("facets".into(), Value::from(surface.facet_ids.len()));
    properties.insert("area".into(), Value::from(surface.area()));

    FeatureCollection::new(
        surface.crs.as_deref(),
        vec![Feature::new(Geometry::MultiPolygon(polygons), properties)],
    )
}

/// One point feature per point, carrying its `cell_ID`.
pub fn points_to_geojson(cloud: &PointCloud) -> FeatureCollection {
    let features = cloud
        .iter()
        .map(|p| {
            let mut properties = Map::new();
            properties.insert("cell_ID".into(), Value::from(p.cell_id));
            Feature::new(Geometry::Point([p.x, p.y, p.z]), properties)
        })
        .collect();
    FeatureCollection::new(cloud.crs.as_deref(), features)
}

fn polygon_rings(polygon: &Polygon2D) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(&polygon.exterior)
        .chain(&polygon.holes)
        .map(|ring| {
            let mut closed = ring.clone();
            if let Some(&first) = ring.first() {
                closed.push(first);
            }
            closed
        })
        .collect()
}

/// Writes pipeline outputs into one directory.
#[derive(Debug, Clone)]
pub struct ArtifactExporter {
    dir: PathBuf,
}

impl ArtifactExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_surface(&self, surface: &CategorizedSurface) -> Result<PathBuf> {
        let name = format!("{}.geojson", surface.category.file_stem());
        self.write(&name, &surface_to_geojson(surface))
    }

    /// Write all three surfaces, in ground, wall, roof order.
    pub fn write_surfaces(&self, surfaces: &ClassifiedSurfaces) -> Result<Vec<PathBuf>> {
        surfaces.iter().map(|s| self.write_surface(s)).collect()
    }

    pub fn write_ground_points(&self, ground: &PointCloud) -> Result<PathBuf> {
        self.write("ground_points.geojson", &points_to_geojson(ground))
    }

    pub fn write_air_layer(&self, layer: &PointCloud, threshold: f64) -> Result<PathBuf> {
        let name = format!("air_layer_{}m.geojson", threshold);
        self.write(&name, &points_to_geojson(layer))
    }

    fn write(&self, name: &str, collection: &FeatureCollection) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        let data = serde_json::to_vec(collection)?;
        std::fs::write(&tmp, &data)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(path = %path.display(), size = data.len(), "Exported artifact");
        Ok(path)
    }
}
