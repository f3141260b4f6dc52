// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface mesh data structures

use crate::error::{Error, Result};
use smallvec::SmallVec;

/// Facet ring storage; triangles stay on the stack.
pub type FacetRing = SmallVec<[[f64; 3]; 4]>;

/// One facet of the surface mesh: an ordered ring of at least 3 vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    /// Position of the facet in the source mesh
    pub id: usize,
    /// Ring vertices (x, y, z), without the closing duplicate
    pub vertices: FacetRing,
}

impl Facet {
    /// Create a facet from a ring, dropping a trailing vertex equal to the first.
    pub fn new(id: usize, ring: impl IntoIterator<Item = [f64; 3]>) -> Result<Self> {
        let mut vertices: FacetRing = ring.into_iter().collect();
        if vertices.len() > 3 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        if vertices.len() < 3 {
            return Err(Error::InvalidRecord {
                index: id,
                reason: format!("facet ring has {} vertices, need at least 3", vertices.len()),
            });
        }

        if vertices.iter().flatten().any(|c| !c.is_finite()) {
            return Err(Error::InvalidRecord {
                index: id,
                reason: "facet has a non-finite coordinate".to_string(),
            });
        }

        Ok(Self { id, vertices })
    }

    /// First three vertices, the ones that define the facet plane.
    #[inline]
    pub fn leading_triangle(&self) -> [[f64; 3]; 3] {
        [self.vertices[0], self.vertices[1], self.vertices[2]]
    }

    /// Horizontal projection of the ring.
    pub fn footprint(&self) -> Vec<[f64; 2]> {
        self.vertices.iter().map(|v| [v[0], v[1]]).collect()
    }

    /// Mean height of the ring vertices.
    pub fn mean_height(&self) -> f64 {
        self.vertices.iter().map(|v| v[2]).sum::<f64>() / self.vertices.len() as f64
    }
}

/// Triangulated building/ground mesh with its coordinate reference system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    /// Caller-chosen name, e.g. the source file stem
    pub name: String,
    /// Coordinate reference system name (e.g. "EPSG:32632")
    pub crs: Option<String>,
    pub facets: Vec<Facet>,
}

impl SurfaceMesh {
    pub fn new(name: impl Into<String>, crs: Option<String>, facets: Vec<Facet>) -> Self {
        Self {
            name: name.into(),
            crs,
            facets,
        }
    }

    /// Build a mesh from polygon-per-record rings; facet ids follow record order.
    pub fn from_rings<R>(name: impl Into<String>, crs: Option<String>, rings: R) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = [f64; 3]>,
    {
        let facets = rings
            .into_iter()
            .enumerate()
            .map(|(id, ring)| Facet::new(id, ring))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(name, crs, facets))
    }

    #[inline]
    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_closed_ring_is_opened() {
        let facet = Facet::new(
            0,
            [
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
            ],
        )
        .unwrap();
        assert_eq!(facet.vertices.len(), 3);
    }

    #[test]
    fn test_short_ring_rejected() {
        let err = Facet::new(4, [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { index: 4, .. }));
    }

    #[test]
    fn test_mean_height() {
        let facet = Facet::new(0, [[0.0, 0.0, 1.0], [1.0, 0.0, 2.0], [0.0, 1.0, 6.0]]).unwrap();
        assert_relative_eq!(facet.mean_height(), 3.0);
    }

    #[test]
    fn test_from_rings_assigns_ids_in_order() {
        let mesh = SurfaceMesh::from_rings(
            "surface_triangle",
            None,
            vec![
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                vec![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            ],
        )
        .unwrap();
        assert_eq!(mesh.facet_count(), 2);
        assert_eq!(mesh.facets[1].id, 1);
    }
}
