//! This module implements the detector-frame geometry used by the cuts.

use crate::numeric::Float;
use nalgebra::SVector;

/// Spatial dimension of the detector frame
pub const SPACE_DIM: usize = 3;

/// A point in the detector frame (mm)
pub type Position = SVector<Float, SPACE_DIM>;

/// Convenience const for accessing the X coordinate of a position
///
/// X is the axis normal to the source foil, which sits at x = 0.
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a position
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a position
pub const Z: usize = 2;

/// Build a position from the raw coordinate triple stored in event records
pub fn position(xyz: &[Float; SPACE_DIM]) -> Position {
    Position::from_column_slice(xyz)
}

/// Straight-line distance between two points (mm)
pub fn distance(from: &Position, to: &Position) -> Float {
    (to - from).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = position(&[1., 2., 3.]);
        let b = position(&[4., 6., 3.]);
        assert_eq!(distance(&a, &b), 5.);
        assert_eq!(distance(&b, &a), 5.);
        assert_eq!(distance(&a, &a), 0.);
    }

    #[test]
    fn coordinate_indices() {
        let p = position(&[-1., 2., 7.]);
        assert_eq!((p[X], p[Y], p[Z]), (-1., 2., 7.));
    }
}
