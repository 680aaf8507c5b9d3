//! The index/fraction selection shared by every animation kind's
//! calc-mode handling (`TRANSLATE`/`SCALE`/`ROTATE` in `anim_transform.cpp`,
//! and the point-list branch of `anim_motion::perform()` in
//! `animation_motion.cpp`): given `count` entries in a `values`/point
//! list and the current `seek` position, pick the bracketing pair
//! `(i, i + 1)` and the local interpolation fraction within that pair.

use crate::transform::CalcMode;

/// `count` must be at least 2 (callers fall back to `from`/`to`/`by` when
/// it is not). `distances`, if non-empty, holds the cumulative distance up
/// to and including each entry, required for `CalcMode::Paced`.
pub fn bracket(count: usize, seek: f64, calc_mode: CalcMode, distances: &[f64]) -> (usize, usize, f64) {
    debug_assert!(count >= 2);

    if calc_mode == CalcMode::Paced && !distances.is_empty() {
        let total = *distances.last().unwrap();
        let dist_pos = seek * total;
        let mut i = 0;
        while i < count - 2 && distances[i + 1] < dist_pos {
            i += 1;
        }
        let span = distances[i + 1] - distances[i];
        let seek_to = if span != 0.0 { ((dist_pos - distances[i]) / span).clamp(0.0, 1.0) } else { 0.0 };
        return (i, i + 1, seek_to);
    }

    let mut i = ((count - 1) as f64 * seek) as i64 as usize;
    if i >= count - 1 {
        i = count - 2;
    }
    let modv = 1.0 / (count - 1) as f64;
    let seek_to = if seek >= 1.0 { 1.0 } else { (seek % modv) / modv };
    let seek_to = if calc_mode == CalcMode::Discrete { 0.0 } else { seek_to };
    (i, i + 1, seek_to)
}

/// Cumulative Euclidean distance between successive `(x, y)` points, the
/// `distances` array `get_total_dist()`/`get_paired_dist()` build before a
/// `CalcMode::Paced` animation can be evaluated.
pub fn cumulative_distances(points: &[(f64, f64)]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len());
    let mut total = 0.0;
    distances.push(0.0);
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        total += ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        distances.push(total);
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_bracket_midpoint_of_three_values() {
        let (i, j, frac) = bracket(3, 0.5, CalcMode::Linear, &[]);
        assert_eq!((i, j), (1, 1));
        assert_eq!(frac, 0.0);
    }

    #[test]
    fn discrete_bracket_forces_zero_fraction() {
        let (_, _, frac) = bracket(3, 0.9, CalcMode::Discrete, &[]);
        assert_eq!(frac, 0.0);
    }

    #[test]
    fn cumulative_distances_of_a_right_triangle_path() {
        let distances = cumulative_distances(&[(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)]);
        assert_eq!(distances, vec![0.0, 3.0, 7.0]);
    }

    #[test]
    fn paced_bracket_uses_distance_fraction_not_index_fraction() {
        let distances = cumulative_distances(&[(0.0, 0.0), (1.0, 0.0), (10.0, 0.0)]);
        let (i, j, frac) = bracket(3, 0.5, CalcMode::Paced, &distances);
        assert_eq!((i, j), (1, 2));
        assert!((frac - (5.0 - 1.0) / (10.0 - 1.0)).abs() < 1e-9);
    }
}
