//! Composing the active `<animateTransform>` results for one vector into a
//! single matrix, ported from the `Animatrix` loop in
//! `animation_timer()` (`animation_timing.cpp`).
//!
//! SVG only allows one transformation matrix to be active per vector at a
//! time; additional `<animateTransform>` elements are composed
//! multiplicatively unless one of them is in `REPLACE` mode, in which case
//! it overrides everything before it, including a pre-existing static
//! `transform` attribute (undone via matrix inversion rather than simply
//! discarded, so the attribute is not permanently destroyed).

use crate::matrix::Matrix2D;
use crate::transform::Additive;

/// One transform result queued for a vector this frame, in the order its
/// `<animateTransform>` element was declared.
pub struct QueuedTransform {
    pub additive: Additive,
    pub matrix: Matrix2D,
}

/// Compose `transforms` (oldest-declared first) against `existing`, the
/// vector's static `transform` attribute matrix. Returns the matrix that
/// should now be applied to the vector.
pub fn compose(existing: &Matrix2D, transforms: &[QueuedTransform]) -> Matrix2D {
    if transforms.is_empty() {
        return *existing;
    }

    let mut result = if transforms[0].additive == Additive::Replace {
        existing.invert().unwrap_or(Matrix2D::IDENTITY)
    } else {
        Matrix2D::IDENTITY
    };

    // Applied in reverse declaration order, as `animation_timer()` does
    // with `std::for_each(vt.transforms.rbegin(), vt.transforms.rend(), ...)`.
    for queued in transforms.iter().rev() {
        result.multiply_assign(&queued.matrix);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_queue_leaves_the_existing_matrix_untouched() {
        let existing = Matrix2D::translate(1.0, 2.0);
        assert_eq!(compose(&existing, &[]), existing);
    }

    #[test]
    fn sum_mode_composes_on_top_of_prior_transforms() {
        let existing = Matrix2D::IDENTITY;
        let transforms = vec![
            QueuedTransform { additive: Additive::Sum, matrix: Matrix2D::translate(1.0, 0.0) },
            QueuedTransform { additive: Additive::Sum, matrix: Matrix2D::translate(0.0, 1.0) },
        ];
        let m = compose(&existing, &transforms);
        assert_eq!(m.translate_x, 1.0);
        assert_eq!(m.translate_y, 1.0);
    }

    #[test]
    fn replace_mode_undoes_the_vectors_static_transform() {
        let existing = Matrix2D::translate(5.0, 5.0);
        let transforms = vec![QueuedTransform { additive: Additive::Replace, matrix: Matrix2D::translate(2.0, 2.0) }];
        let m = compose(&existing, &transforms);
        // existing inverted then the replace transform applied: net effect
        // is as if the vector had no static transform at all.
        let mut combined_with_existing = existing;
        combined_with_existing.multiply_assign(&m);
        assert!((combined_with_existing.translate_x - 2.0).abs() < 1e-9);
        assert!((combined_with_existing.translate_y - 2.0).abs() < 1e-9);
    }
}
