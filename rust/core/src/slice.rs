// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-section slice definitions

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2D polyline in world coordinates with a selection buffer.
///
/// The first vertex is the origin from which the along-slice distance of
/// every selected point is measured.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Slice {
    polyline: Vec<[f64; 2]>,
    buffer_radius: f64,
}

impl Slice {
    pub fn new(polyline: Vec<[f64; 2]>, buffer_radius: f64) -> Result<Self> {
        if polyline.len() < 2 {
            return Err(Error::InvalidPolyline(format!(
                "need at least 2 vertices, got {}",
                polyline.len()
            )));
        }
        if polyline.iter().flatten().any(|c| !c.is_finite()) {
            return Err(Error::InvalidPolyline("non-finite vertex".to_string()));
        }
        if !(buffer_radius.is_finite() && buffer_radius > 0.0) {
            return Err(Error::InvalidPolyline(format!(
                "buffer radius must be positive, got {buffer_radius}"
            )));
        }

        Ok(Self {
            polyline,
            buffer_radius,
        })
    }

    #[inline]
    pub fn origin(&self) -> [f64; 2] {
        self.polyline[0]
    }

    #[inline]
    pub fn polyline(&self) -> &[[f64; 2]] {
        &self.polyline
    }

    #[inline]
    pub fn buffer_radius(&self) -> f64 {
        self.buffer_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_first_vertex() {
        let slice = Slice::new(vec![[3.0, 4.0], [10.0, 4.0]], 1.0).unwrap();
        assert_eq!(slice.origin(), [3.0, 4.0]);
    }

    #[test]
    fn test_invalid_slices() {
        assert!(Slice::new(vec![[0.0, 0.0]], 1.0).is_err());
        assert!(Slice::new(vec![[0.0, 0.0], [1.0, 0.0]], 0.0).is_err());
        assert!(Slice::new(vec![[0.0, f64::INFINITY], [1.0, 0.0]], 1.0).is_err());
    }
}
