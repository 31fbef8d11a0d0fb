//! Axis-aligned bounding boxes in pixel XYXY format.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in pixel coordinates (xmin, ymin, xmax, ymax).
///
/// Note: this type does NOT enforce that min <= max in the constructor,
/// allowing "malformed" boxes to be represented. This is intentional -
/// format stages should be able to report bad input rather than panic
/// while parsing it.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBox {
    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Returns the width of the bounding box.
    ///
    /// May be negative if the box is malformed (xmax < xmin).
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Returns the height of the bounding box.
    ///
    /// May be negative if the box is malformed (ymax < ymin).
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns the area of the bounding box.
    ///
    /// May be negative if the box is malformed.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
    }

    /// Returns true if the box is properly ordered (min <= max for both axes).
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }
}

impl std::fmt::Debug for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBox")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let bbox = BBox::from_xyxy(10.0, 20.0, 110.0, 70.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 50.0);
        assert_eq!(bbox.area(), 5000.0);
    }

    #[test]
    fn test_malformed_box_is_representable() {
        let bbox = BBox::from_xyxy(100.0, 20.0, 10.0, 70.0);
        assert!(!bbox.is_ordered());
        assert!(bbox.width() < 0.0);
    }

    #[test]
    fn test_non_finite_detection() {
        let bbox = BBox::from_xyxy(f64::NAN, 0.0, 10.0, 10.0);
        assert!(!bbox.is_finite());
        assert!(BBox::from_xyxy(0.0, 0.0, 1.0, 1.0).is_finite());
    }
}
