// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh Classifier - splits a surface mesh into ground, walls and roofs
//!
//! Each facet is bucketed by the vertical component of its unit normal:
//! - `|nz| = 1`: horizontal, mapped to [`Category::Roof`]
//! - `nz = 0`: vertical, mapped to [`Category::Wall`]
//! - anything else: sloped, mapped to [`Category::Ground`]
//!
//! The facet footprints of each category are then dissolved into one
//! (possibly multi-part) polygon. Wall footprints are buffered first since a
//! vertical facet projects onto a line.

use crate::bool2d::{buffer_footprint, dissolve};
use crate::error::Result;
use crate::polygon::{multi_area, Polygon2D};
use crate::primitives::facet_normal;
use microclimate_core::{Facet, SurfaceMesh};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Semantic class of a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Ground,
    Wall,
    Roof,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Ground, Category::Wall, Category::Roof];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ground => "ground",
            Category::Wall => "wall",
            Category::Roof => "roof",
        }
    }

    /// File stem used for exported surfaces.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Category::Ground => "ground",
            Category::Wall => "walls",
            Category::Roof => "rooftops",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometric bucket of a facet normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// `|nz| = 1`
    Horizontal,
    /// `nz = 0`
    Vertical,
    Sloped,
}

impl Orientation {
    /// Bucket a unit normal; `tolerance` applies to both tests.
    pub fn from_normal(nz: f64, tolerance: f64) -> Self {
        if (nz.abs() - 1.0).abs() <= tolerance {
            Orientation::Horizontal
        } else if nz.abs() <= tolerance {
            Orientation::Vertical
        } else {
            Orientation::Sloped
        }
    }

    /// Fixed orientation to category table.
    pub fn category(&self) -> Category {
        match self {
            Orientation::Horizontal => Category::Roof,
            Orientation::Vertical => Category::Wall,
            Orientation::Sloped => Category::Ground,
        }
    }
}

/// Classifier parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Allowed deviation of `nz` from exactly 0 or ±1
    pub normal_tolerance: f64,
    /// Buffer applied to wall footprints before the dissolve
    pub wall_buffer: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            normal_tolerance: 1e-9,
            wall_buffer: 0.001,
        }
    }
}

/// Classification of a single facet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacetClass {
    pub facet_id: usize,
    pub normal: [f64; 3],
    pub category: Category,
}

/// Dissolved footprint of every facet in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedSurface {
    pub category: Category,
    pub polygons: Vec<Polygon2D>,
    /// Ids of the member facets, ascending
    pub facet_ids: Vec<usize>,
    /// Coordinate reference system of the source mesh
    pub crs: Option<String>,
}

impl CategorizedSurface {
    pub fn empty(category: Category, crs: Option<String>) -> Self {
        Self {
            category,
            polygons: Vec::new(),
            facet_ids: Vec::new(),
            crs,
        }
    }

    pub fn area(&self) -> f64 {
        multi_area(&self.polygons)
    }

    pub fn is_empty(&self) -> bool {
        self.facet_ids.is_empty()
    }
}

/// The three categorized surfaces of one mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSurfaces {
    pub ground: CategorizedSurface,
    pub wall: CategorizedSurface,
    pub roof: CategorizedSurface,
}

impl ClassifiedSurfaces {
    pub fn get(&self, category: Category) -> &CategorizedSurface {
        match category {
            Category::Ground => &self.ground,
            Category::Wall => &self.wall,
            Category::Roof => &self.roof,
        }
    }

    /// Surfaces in `Category::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = &CategorizedSurface> {
        [&self.ground, &self.wall, &self.roof].into_iter()
    }
}

/// Facet classifier and per-category dissolver.
#[derive(Debug, Clone, Default)]
pub struct MeshClassifier {
    config: ClassifierConfig,
}

impl MeshClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one facet from its normal.
    pub fn classify_facet(&self, facet: &Facet) -> Result<FacetClass> {
        let normal = facet_normal(facet)?;
        let category = Orientation::from_normal(normal.z, self.config.normal_tolerance).category();
        Ok(FacetClass {
            facet_id: facet.id,
            normal: [normal.x, normal.y, normal.z],
            category,
        })
    }

    /// Classify every facet. Fails on the lowest-indexed degenerate facet.
    pub fn facet_classes(&self, mesh: &SurfaceMesh) -> Result<Vec<FacetClass>> {
        let results: Vec<Result<FacetClass>> = mesh
            .facets
            .par_iter()
            .map(|facet| self.classify_facet(facet))
            .collect();
        results.into_iter().collect()
    }

    /// Dissolve the facets of one category.
    pub fn classify_category(&self, mesh: &SurfaceMesh, category: Category) -> Result<CategorizedSurface> {
        let classes = self.facet_classes(mesh)?;
        Ok(self.dissolve_category(mesh, &classes, category))
    }

    /// Classify the mesh into ground, wall and roof surfaces.
    pub fn classify(&self, mesh: &SurfaceMesh) -> Result<ClassifiedSurfaces> {
        let classes = self.facet_classes(mesh)?;

        let (ground, (wall, roof)) = rayon::join(
            || self.dissolve_category(mesh, &classes, Category::Ground),
            || {
                rayon::join(
                    || self.dissolve_category(mesh, &classes, Category::Wall),
                    || self.dissolve_category(mesh, &classes, Category::Roof),
                )
            },
        );

        Ok(ClassifiedSurfaces { ground, wall, roof })
    }

    fn dissolve_category(
        &self,
        mesh: &SurfaceMesh,
        classes: &[FacetClass],
        category: Category,
    ) -> CategorizedSurface {
        // `classes` is parallel to `mesh.facets`
        let members: Vec<&Facet> = mesh
            .facets
            .iter()
            .zip(classes)
            .filter(|(_, class)| class.category == category)
            .map(|(facet, _)| facet)
            .collect();

        if members.is_empty() {
            return CategorizedSurface::empty(category, mesh.crs.clone());
        }

        let contours: Vec<Vec<[f64; 2]>> = if category == Category::Wall {
            members
                .iter()
                .flat_map(|f| buffer_footprint(&f.footprint(), self.config.wall_buffer))
                .collect()
        } else {
            members.iter().map(|f| f.footprint()).collect()
        };

        let mut facet_ids: Vec<usize> = members.iter().map(|f| f.id).collect();
        facet_ids.sort_unstable();

        CategorizedSurface {
            category,
            polygons: dissolve(&contours),
            facet_ids,
            crs: mesh.crs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_relative_eq;

    fn mesh(rings: Vec<Vec<[f64; 3]>>) -> SurfaceMesh {
        SurfaceMesh::from_rings("test", Some("EPSG:32632".to_string()), rings).unwrap()
    }

    /// Up-facing, down-facing and x-facing triangles
    fn scenario_mesh() -> SurfaceMesh {
        mesh(vec![
            vec![[0.0, 0.0, 3.0], [1.0, 0.0, 3.0], [0.0, 1.0, 3.0]],
            vec![[2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [3.0, 0.0, 0.0]],
            vec![[5.0, 0.0, 0.0], [5.0, 1.0, 0.0], [5.0, 0.0, 1.0]],
        ])
    }

    #[test]
    fn test_orientation_table() {
        assert_eq!(Orientation::from_normal(1.0, 1e-9), Orientation::Horizontal);
        assert_eq!(Orientation::from_normal(-1.0, 1e-9), Orientation::Horizontal);
        assert_eq!(Orientation::from_normal(0.0, 1e-9), Orientation::Vertical);
        assert_eq!(Orientation::from_normal(0.7, 1e-9), Orientation::Sloped);
        assert_eq!(Orientation::Horizontal.category(), Category::Roof);
        assert_eq!(Orientation::Vertical.category(), Category::Wall);
        assert_eq!(Orientation::Sloped.category(), Category::Ground);
    }

    #[test]
    fn test_scenario_normals() {
        let classifier = MeshClassifier::default();
        let classes = classifier.facet_classes(&scenario_mesh()).unwrap();

        assert_eq!(classes[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(classes[1].normal, [0.0, 0.0, -1.0]);
        assert_eq!(classes[2].normal, [1.0, 0.0, 0.0]);

        let categories: Vec<Category> = classes.iter().map(|c| c.category).collect();
        assert_eq!(categories, vec![Category::Roof, Category::Roof, Category::Wall]);
    }

    #[test]
    fn test_scenario_surfaces() {
        let surfaces = MeshClassifier::default().classify(&scenario_mesh()).unwrap();

        assert_eq!(surfaces.wall.polygons.len(), 1);
        assert_eq!(surfaces.wall.facet_ids, vec![2]);

        assert_eq!(surfaces.roof.facet_ids, vec![0, 1]);
        assert_relative_eq!(surfaces.roof.area(), 1.0, epsilon = 1e-6);

        assert!(surfaces.ground.is_empty());
        assert!(surfaces.ground.polygons.is_empty());
        assert_eq!(surfaces.ground.crs.as_deref(), Some("EPSG:32632"));
    }

    #[test]
    fn test_categories_partition_facets() {
        let m = mesh(vec![
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
            vec![[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
            vec![[1.0, 1.0, 2.0], [2.0, 1.0, 2.0], [1.0, 2.0, 2.0]],
            vec![[3.0, 3.0, 0.0], [4.0, 3.0, 0.5], [3.0, 4.0, 0.25]],
        ]);
        let surfaces = MeshClassifier::default().classify(&m).unwrap();

        let mut all: Vec<usize> = surfaces.iter().flat_map(|s| s.facet_ids.clone()).collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
        assert_eq!(surfaces.roof.facet_ids, vec![0, 3]);
        assert_eq!(surfaces.wall.facet_ids, vec![2]);
        assert_eq!(surfaces.ground.facet_ids, vec![1, 4]);
    }

    #[test]
    fn test_dissolve_matches_footprint_union() {
        // Two roof triangles forming a unit square, plus an overlapping third
        let m = mesh(vec![
            vec![[0.0, 0.0, 5.0], [1.0, 0.0, 5.0], [1.0, 1.0, 5.0]],
            vec![[0.0, 0.0, 5.0], [1.0, 1.0, 5.0], [0.0, 1.0, 5.0]],
            vec![[0.0, 0.0, 6.0], [1.0, 0.0, 6.0], [0.0, 1.0, 6.0]],
        ]);
        let roof = MeshClassifier::default().classify_category(&m, Category::Roof).unwrap();
        assert_eq!(roof.polygons.len(), 1);
        assert_relative_eq!(roof.area(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_adjoining_walls_close_into_one_polygon() {
        let m = mesh(vec![
            vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 0.0, 3.0]],
            vec![[4.0, 0.0, 0.0], [4.0, 4.0, 0.0], [4.0, 0.0, 3.0]],
        ]);
        let config = ClassifierConfig::default();
        let wall = MeshClassifier::new(config)
            .classify_category(&m, Category::Wall)
            .unwrap();

        assert_eq!(wall.polygons.len(), 1);
        let r = config.wall_buffer;
        // Two 4-unit segments, each buffered by r, must not exceed their capsule bound
        assert!(wall.area() > 0.0);
        assert!(wall.area() <= 2.0 * (4.0 + 2.0 * r) * 2.0 * r + 1e-9);
    }

    #[test]
    fn test_degenerate_facet_fails() {
        let m = mesh(vec![
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]],
        ]);
        let err = MeshClassifier::default().classify(&m).unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry { facet: 1, .. }));
    }

    #[test]
    fn test_reports_lowest_degenerate_facet() {
        let mut rings: Vec<Vec<[f64; 3]>> = (0..20_000)
            .map(|i| {
                let x = i as f64;
                vec![[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]]
            })
            .collect();
        let collinear = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
        rings[19_000] = collinear.clone();
        rings[7] = collinear;

        for _ in 0..5 {
            let err = MeshClassifier::default().facet_classes(&mesh(rings.clone())).unwrap_err();
            assert!(matches!(err, Error::DegenerateGeometry { facet: 7, .. }));
        }
    }

    #[test]
    fn test_empty_mesh_yields_empty_surfaces() {
        let surfaces = MeshClassifier::default().classify(&mesh(Vec::new())).unwrap();
        assert!(surfaces.iter().all(|s| s.is_empty() && s.polygons.is_empty()));
    }
}
