// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface pipeline facade.
//!
//! Owns the configuration and the artifact cache and runs each stage through
//! the cache where its result is persisted: classification per category,
//! building removal and air layer extraction. Cross sections are computed on
//! demand.

use std::sync::Arc;

use microclimate_core::{PointCloud, Slice, SurfaceMesh, TimeSeriesTable, TimeStep};
use microclimate_geometry::{CategorizedSurface, Category, ClassifiedSurfaces, MeshClassifier};

use crate::air_layer::AirLayerExtractor;
use crate::cache::{ArtifactCache, ArtifactKey, ArtifactKind, InputDigest};
use crate::config::PipelineConfig;
use crate::cross_section::{CrossSectionGrid, CrossSectionGridBuilder};
use crate::error::Result;
use crate::ground::BuildingFilter;
use crate::jobs::{spawn_job, JobHandle};

/// Cached classification and point derivation for one project.
///
/// Cloning is cheap; clones share the cache.
#[derive(Debug, Clone)]
pub struct SurfacePipeline {
    config: PipelineConfig,
    cache: Arc<ArtifactCache>,
    classifier: MeshClassifier,
    building_filter: BuildingFilter,
    air_layer: AirLayerExtractor,
    cross_section: CrossSectionGridBuilder,
}

impl SurfacePipeline {
    /// Validate the configuration and open its cache.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(ArtifactCache::open(&config.cache)?);
        Ok(Self::with_cache(config, cache))
    }

    /// Share an already opened cache.
    pub fn with_cache(config: PipelineConfig, cache: Arc<ArtifactCache>) -> Self {
        Self {
            classifier: MeshClassifier::new(config.classifier),
            building_filter: BuildingFilter::new(config.building_filter),
            air_layer: AirLayerExtractor::new(config.air_layer),
            cross_section: CrossSectionGridBuilder::new(config.cross_section.clone()),
            config,
            cache,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Classify the mesh into ground, wall and roof surfaces.
    ///
    /// Each category is stored under its own key. The mesh is classified at
    /// most once per call, and not at all when every category is cached.
    pub fn classify(&self, mesh: &SurfaceMesh) -> Result<ClassifiedSurfaces> {
        let digest = InputDigest::of_mesh(mesh);
        let mut computed = None;

        let ground = self.cached_category(mesh, &digest, Category::Ground, &mut computed)?;
        let wall = self.cached_category(mesh, &digest, Category::Wall, &mut computed)?;
        let roof = self.cached_category(mesh, &digest, Category::Roof, &mut computed)?;

        tracing::info!(
            mesh = %mesh.name,
            facets = mesh.facet_count(),
            ground = ground.facet_ids.len(),
            walls = wall.facet_ids.len(),
            roofs = roof.facet_ids.len(),
            "Classified surface mesh"
        );

        Ok(ClassifiedSurfaces { ground, wall, roof })
    }

    /// Key of one classified category of a mesh.
    pub fn classification_key(&self, mesh_digest: &str, category: Category) -> ArtifactKey {
        let config = self.classifier.config();
        ArtifactKey::new(ArtifactKind::Classification, mesh_digest)
            .with_param("category", category.as_str())
            .with_param("normal_tolerance", config.normal_tolerance)
            .with_param("wall_buffer", config.wall_buffer)
    }

    fn cached_category(
        &self,
        mesh: &SurfaceMesh,
        digest: &str,
        category: Category,
        computed: &mut Option<ClassifiedSurfaces>,
    ) -> Result<CategorizedSurface> {
        let key = self.classification_key(digest, category);
        self.cache.get_or_compute(&key, || {
            let surfaces = match computed.take() {
                Some(surfaces) => surfaces,
                None => self.classifier.classify(mesh)?,
            };
            let surface = surfaces.get(category).clone();
            *computed = Some(surfaces);
            Ok(surface)
        })
    }

    /// Ground points with building samples removed.
    pub fn ground_points(&self, ground: &PointCloud) -> Result<PointCloud> {
        let config = self.building_filter.config();
        let key = ArtifactKey::new(ArtifactKind::GroundFilter, InputDigest::of_points(ground))
            .with_param("column_decimals", config.column_decimals)
            .with_param("neighbour_radius", config.neighbour_radius)
            .with_param("elevation_tolerance", config.elevation_tolerance);

        self.cache
            .get_or_compute(&key, || Ok(self.building_filter.remove_buildings(ground)))
    }

    /// Air points less than `threshold` above the filtered ground.
    ///
    /// `ground` should already have buildings removed (see
    /// [`ground_points`](Self::ground_points)).
    pub fn air_layer(
        &self,
        air: &PointCloud,
        ground: &PointCloud,
        threshold: f64,
    ) -> Result<PointCloud> {
        let config = self.air_layer.config();
        let digest = InputDigest::new()
            .update_points(air)
            .update_points(ground)
            .finish();
        let key = ArtifactKey::new(ArtifactKind::AirLayer, digest)
            .with_param("threshold", threshold)
            .with_param("search_radius", config.search_radius);

        self.cache.get_or_compute(&key, || {
            self.air_layer
                .extract_near_surface_layer(air, ground, threshold)
        })
    }

    /// [`air_layer`](Self::air_layer) with the configured threshold.
    pub fn default_air_layer(&self, air: &PointCloud, ground: &PointCloud) -> Result<PointCloud> {
        self.air_layer(air, ground, self.config.air_layer.threshold)
    }

    /// A slice through `polyline` with the configured buffer radius.
    pub fn slice(&self, polyline: Vec<[f64; 2]>) -> Result<Slice> {
        Ok(Slice::new(polyline, self.config.cross_section.buffer_radius)?)
    }

    /// Fishnet grid of `value_column` along `slice` at the configured
    /// resolution. Not cached.
    pub fn cross_section(
        &self,
        points: &PointCloud,
        slice: &Slice,
        table: &TimeSeriesTable,
        value_column: &str,
        time_step: TimeStep,
    ) -> Result<CrossSectionGrid> {
        self.cross_section.build_grid(
            points,
            slice,
            self.config.cross_section.resolution,
            table,
            value_column,
            time_step,
        )
    }

    /// Fishnet grid with the configured column and time step.
    pub fn default_cross_section(
        &self,
        points: &PointCloud,
        slice: &Slice,
        table: &TimeSeriesTable,
    ) -> Result<CrossSectionGrid> {
        let config = &self.config.cross_section;
        self.cross_section(points, slice, table, &config.value_column, config.time_step)
    }

    /// [`classify`](Self::classify) on the rayon pool.
    pub fn classify_in_background(&self, mesh: Arc<SurfaceMesh>) -> JobHandle<ClassifiedSurfaces> {
        let pipeline = self.clone();
        spawn_job(move || pipeline.classify(&mesh))
    }

    /// [`air_layer`](Self::air_layer) on the rayon pool.
    pub fn air_layer_in_background(
        &self,
        air: Arc<PointCloud>,
        ground: Arc<PointCloud>,
        threshold: f64,
    ) -> JobHandle<PointCloud> {
        let pipeline = self.clone();
        spawn_job(move || pipeline.air_layer(&air, &ground, threshold))
    }
}
