// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end runs of the surface pipeline against a temporary cache.

use std::path::PathBuf;
use std::sync::Arc;

use approx::assert_relative_eq;
use microclimate_core::{PointCloud, PointDomain, SpatialPoint, SurfaceMesh, TimeSeriesTable};
use microclimate_geometry::Category;
use microclimate_processing::{
    ArtifactExporter, CacheConfig, CacheStats, Error, PipelineConfig, SurfacePipeline,
};

/// Temporary project directory, removed on drop.
struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn new(label: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "microclimate-pipeline-{label}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        Self { root }
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            cache: CacheConfig {
                root: self.root.join("cache"),
                namespace: "pipeline-test".into(),
            },
            ..PipelineConfig::default()
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One up-facing, one down-facing and one x-facing triangle.
fn scenario_mesh() -> SurfaceMesh {
    SurfaceMesh::from_rings(
        "surface_triangle",
        Some("EPSG:32632".into()),
        vec![
            vec![[0.0, 0.0, 3.0], [1.0, 0.0, 3.0], [0.0, 1.0, 3.0]],
            vec![[2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [3.0, 0.0, 0.0]],
            vec![[5.0, 0.0, 0.0], [5.0, 1.0, 0.0], [5.0, 0.0, 1.0]],
        ],
    )
    .unwrap()
}

#[test]
fn test_classification_is_cached_per_category() {
    init_tracing();
    let ws = Workspace::new("classify");
    let pipeline = SurfacePipeline::new(ws.config()).unwrap();
    let mesh = scenario_mesh();

    let first = pipeline.classify(&mesh).unwrap();
    assert_eq!(first.wall.polygons.len(), 1);
    assert_eq!(first.roof.facet_ids, vec![0, 1]);
    assert!(first.ground.is_empty());
    assert_eq!(pipeline.cache().stats(), CacheStats { hits: 0, misses: 3, writes: 3 });

    let second = pipeline.classify(&mesh).unwrap();
    assert_eq!(first, second);
    assert_eq!(pipeline.cache().stats(), CacheStats { hits: 3, misses: 3, writes: 3 });
}

#[test]
fn test_changed_mesh_is_not_served_from_cache() {
    let ws = Workspace::new("invalidation");
    let pipeline = SurfacePipeline::new(ws.config()).unwrap();

    let mesh = scenario_mesh();
    pipeline.classify(&mesh).unwrap();

    // Same name, moved wall: a file-existence check would wrongly hit
    let mut moved = mesh.clone();
    for v in moved.facets[2].vertices.iter_mut() {
        v[0] += 10.0;
    }
    let surfaces = pipeline.classify(&moved).unwrap();
    assert_eq!(pipeline.cache().stats().writes, 6);

    let wall = &surfaces.get(Category::Wall).polygons[0];
    assert!(wall.exterior.iter().all(|p| p[0] > 14.0));
}

#[test]
fn test_cache_survives_reopen() {
    let ws = Workspace::new("reopen");
    let mesh = scenario_mesh();

    let first = SurfacePipeline::new(ws.config()).unwrap().classify(&mesh).unwrap();

    let reopened = SurfacePipeline::new(ws.config()).unwrap();
    let second = reopened.classify(&mesh).unwrap();
    assert_eq!(first, second);
    assert_eq!(reopened.cache().stats(), CacheStats { hits: 3, misses: 0, writes: 0 });
}

#[test]
fn test_degenerate_mesh_fails_without_caching() {
    let ws = Workspace::new("degenerate");
    let pipeline = SurfacePipeline::new(ws.config()).unwrap();
    let mesh = SurfaceMesh::from_rings(
        "broken",
        None,
        vec![vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]],
    )
    .unwrap();

    let err = pipeline.classify(&mesh).unwrap_err();
    assert!(matches!(err, Error::Geometry(_)));
    assert_eq!(pipeline.cache().stats().writes, 0);
}

#[test]
fn test_ground_then_air_layer() {
    init_tracing();
    let ws = Workspace::new("air");
    let pipeline = SurfacePipeline::new(ws.config()).unwrap();

    let surface = PointCloud::new(
        PointDomain::Surface,
        None,
        vec![
            SpatialPoint::new(1, 0.0, 0.0, 0.0),
            SpatialPoint::new(2, 0.0, 0.0, 15.0),
        ],
    );
    let ground = pipeline.ground_points(&surface).unwrap();
    assert_eq!(ground.len(), 1);

    let air = PointCloud::new(
        PointDomain::Air,
        None,
        vec![
            SpatialPoint::new(10, 0.0, 0.0, 1.0),
            SpatialPoint::new(11, 0.0, 0.0, 3.0),
            SpatialPoint::new(12, 0.0, 0.0, 5.0),
        ],
    );
    let layer = pipeline.air_layer(&air, &ground, 2.0).unwrap();
    let ids: Vec<u32> = layer.iter().map(|p| p.cell_id).collect();
    assert_eq!(ids, vec![10]);

    // A different threshold is a different artifact
    let wider = pipeline.air_layer(&air, &ground, 4.0).unwrap();
    assert_eq!(wider.len(), 2);

    let again = pipeline.air_layer(&air, &ground, 2.0).unwrap();
    assert_eq!(again, layer);
    assert_eq!(pipeline.cache().stats(), CacheStats { hits: 1, misses: 3, writes: 3 });
}

#[test]
fn test_configured_air_threshold() {
    let ws = Workspace::new("threshold");
    let ground = PointCloud::new(PointDomain::Surface, None, vec![SpatialPoint::new(1, 0.0, 0.0, 0.0)]);
    let air = PointCloud::new(
        PointDomain::Air,
        None,
        vec![
            SpatialPoint::new(10, 0.0, 0.0, 1.0),
            SpatialPoint::new(11, 0.0, 0.0, 3.0),
            SpatialPoint::new(12, 0.0, 0.0, 5.0),
        ],
    );
    let ids = |layer: &PointCloud| layer.iter().map(|p| p.cell_id).collect::<Vec<u32>>();

    let default = SurfacePipeline::new(ws.config()).unwrap();
    assert_eq!(ids(&default.default_air_layer(&air, &ground).unwrap()), vec![10]);

    let json: PipelineConfig = serde_json::from_str(r#"{"air_layer": {"threshold": 4.0}}"#).unwrap();
    let from_json = SurfacePipeline::new(PipelineConfig { cache: ws.config().cache, ..json }).unwrap();
    assert_eq!(ids(&from_json.default_air_layer(&air, &ground).unwrap()), vec![10, 11]);

    std::env::set_var("MICROCLIMATE_AIR_THRESHOLD", "6");
    let env = PipelineConfig::from_env();
    std::env::remove_var("MICROCLIMATE_AIR_THRESHOLD");
    let from_env = SurfacePipeline::new(PipelineConfig { cache: ws.config().cache, ..env }).unwrap();
    assert_eq!(ids(&from_env.default_air_layer(&air, &ground).unwrap()), vec![10, 11, 12]);
}

#[test]
fn test_air_point_without_ground_fails() {
    let ws = Workspace::new("noground");
    let pipeline = SurfacePipeline::new(ws.config()).unwrap();
    let ground = PointCloud::new(PointDomain::Surface, None, Vec::new());
    let air = PointCloud::new(PointDomain::Air, None, vec![SpatialPoint::new(3, 0.0, 0.0, 1.0)]);

    let err = pipeline.air_layer(&air, &ground, 2.0).unwrap_err();
    assert!(matches!(err, Error::NoNearestSurface { point_id: 3, .. }));
}

#[test]
fn test_cross_section_cell_mean() {
    let ws = Workspace::new("section");
    let pipeline = SurfacePipeline::new(ws.config()).unwrap();

    let air = PointCloud::new(
        PointDomain::Air,
        None,
        vec![
            SpatialPoint::new(1, 2.0, 0.0, 1.0),
            SpatialPoint::new(2, 5.0, 0.0, 2.0),
        ],
    );
    let mut table = TimeSeriesTable::new(["Tair"]);
    table.insert_row(1, 12, vec![10.0]).unwrap();
    table.insert_row(2, 12, vec![20.0]).unwrap();

    let slice = pipeline.slice(vec![[0.0, 0.0], [50.0, 0.0]]).unwrap();
    let grid = pipeline.default_cross_section(&air, &slice, &table).unwrap();

    assert_eq!(grid.unmatched_points, 0);
    let cell = grid.cell_at(2.0, 1.0).unwrap();
    assert_eq!(cell.members.len(), 2);
    assert_relative_eq!(cell.mean.unwrap(), 15.0);
    assert_eq!(grid.cells.len(), 1);
}

#[test]
fn test_background_jobs() {
    let ws = Workspace::new("background");
    let pipeline = SurfacePipeline::new(ws.config()).unwrap();

    let surfaces = pipeline
        .classify_in_background(Arc::new(scenario_mesh()))
        .wait()
        .unwrap();
    assert_eq!(surfaces.wall.facet_ids, vec![2]);

    let ground = Arc::new(PointCloud::new(
        PointDomain::Surface,
        None,
        vec![SpatialPoint::new(1, 0.0, 0.0, 0.0)],
    ));
    let air = Arc::new(PointCloud::new(
        PointDomain::Air,
        None,
        vec![SpatialPoint::new(2, 0.5, 0.0, 0.5)],
    ));
    let layer = pipeline.air_layer_in_background(air, ground, 2.0).wait().unwrap();
    assert_eq!(layer.len(), 1);
}

#[test]
fn test_export_classified_outputs() {
    let ws = Workspace::new("export");
    let pipeline = SurfacePipeline::new(ws.config()).unwrap();
    let surfaces = pipeline.classify(&scenario_mesh()).unwrap();

    let exporter = ArtifactExporter::new(ws.root.join("out")).unwrap();
    let paths = exporter.write_surfaces(&surfaces).unwrap();
    let names: Vec<String> = paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["ground.geojson", "walls.geojson", "rooftops.geojson"]);

    let roofs: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths[2]).unwrap()).unwrap();
    assert_eq!(roofs["crs"]["properties"]["name"], "EPSG:32632");
    assert_eq!(roofs["features"][0]["properties"]["facets"], 2);
}
