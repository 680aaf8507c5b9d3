//! `<animateMotion>`: moving a vector along an explicit point list or a
//! traced path, with optional auto-rotation to face the direction of
//! travel, ported from `anim_motion::precalc_angles`/`anim_motion::perform`
//! in `animation_motion.cpp`.

use crate::calc::{bracket, cumulative_distances};
use crate::matrix::Matrix2D;
use crate::transform::{read_numseq, CalcMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoRotate {
    Fixed,
    Auto,
    AutoReverse,
}

/// The angle, in degrees, between two points, matching `get_angle()`'s
/// `atan2`-based bearing used to orient a vector travelling from `a` to
/// `b`.
fn angle_between(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.1 - a.1).atan2(b.0 - a.0) * 180.0 / std::f64::consts::PI
}

/// Smoothed per-point heading, averaging each interior point's incoming
/// and outgoing bearing with its own so direction changes are not abrupt,
/// matching `anim_motion::precalc_angles`.
pub fn precalc_angles(points: &[(f64, f64)]) -> Vec<f64> {
    if points.len() < 2 {
        return Vec::new();
    }
    let n = points.len();
    let mut raw = vec![0.0; n];
    raw[0] = angle_between(points[0], points[1]);
    let mut prev = points[0];
    for i in 1..n - 1 {
        raw[i] = angle_between(prev, points[i]);
        prev = points[i];
    }
    raw[n - 1] = raw[n - 2];

    let mut angles = Vec::with_capacity(n);
    angles.push(raw[0]);
    for i in 1..n - 1 {
        angles.push((raw[i] + raw[i - 1] + raw[i + 1]) / 3.0);
    }
    angles.push(raw[n - 1]);
    angles
}

#[derive(Clone, Debug)]
pub struct MotionAnimation {
    pub calc_mode: CalcMode,
    pub auto_rotate: AutoRotate,
    /// Fixed rotation angle in degrees, used only when `auto_rotate` is
    /// `Fixed`.
    pub rotate: f64,
    /// Explicit `x,y` pairs, already traced from a path or parsed from a
    /// `values` list.
    pub points: Vec<(f64, f64)>,
    pub distances: Vec<f64>,
    pub angles: Vec<f64>,
}

impl MotionAnimation {
    /// Build a motion animation from an already-traced or already-parsed
    /// point list, precomputing the distance table (for `CalcMode::Paced`)
    /// and the smoothed heading table (for `AutoRotate::Auto`/`AutoReverse`).
    pub fn from_points(points: Vec<(f64, f64)>, calc_mode: CalcMode, auto_rotate: AutoRotate, rotate: f64) -> Self {
        let distances = cumulative_distances(&points);
        let angles = match auto_rotate {
            AutoRotate::Auto | AutoRotate::AutoReverse => precalc_angles(&points),
            AutoRotate::Fixed => Vec::new(),
        };
        Self { calc_mode, auto_rotate, rotate, points, distances, angles }
    }

    /// Parse a `values` list of `"x,y"` coordinate pairs directly, the
    /// non-path branch of `anim_motion::perform()`.
    pub fn from_values(values: &[String], calc_mode: CalcMode, auto_rotate: AutoRotate, rotate: f64) -> Option<Self> {
        let points: Vec<(f64, f64)> = values
            .iter()
            .map(|v| {
                let nums = read_numseq(v);
                Some((*nums.first()?, *nums.get(1)?))
            })
            .collect::<Option<_>>()?;
        Some(Self::from_points(points, calc_mode, auto_rotate, rotate))
    }

    /// The matrix to apply for the current `seek` position: a rotation (if
    /// auto-rotating or fixed-rotating) followed by a translation to the
    /// interpolated or (in `CalcMode::Discrete`) snapped position.
    pub fn perform(&self, seek: f64) -> Option<Matrix2D> {
        if self.points.len() < 2 {
            return None;
        }
        let (i, j, seek_to) = bracket(self.points.len(), seek, self.calc_mode, &self.distances);
        let a = self.points[i];
        let b = self.points[j];

        let angle = match self.auto_rotate {
            AutoRotate::Auto | AutoRotate::AutoReverse => {
                let mut a = self.angles[i] * (1.0 - seek_to) + self.angles[j] * seek_to;
                if self.auto_rotate == AutoRotate::AutoReverse {
                    a += 180.0;
                }
                Some(a)
            }
            AutoRotate::Fixed => None,
        };

        let mut m = Matrix2D::IDENTITY;
        if let Some(angle) = angle {
            m = Matrix2D::rotate(angle, 0.0, 0.0);
        } else if self.auto_rotate == AutoRotate::Fixed && self.rotate != 0.0 {
            m = Matrix2D::rotate(self.rotate, 0.0, 0.0);
        }

        // CMODE::DISCRETE snaps to whichever endpoint the seek fraction is
        // closer to rather than interpolating the translation.
        let (tx, ty) = if self.calc_mode == CalcMode::Discrete {
            if seek_to < 0.5 {
                a
            } else {
                b
            }
        } else {
            (a.0 + (b.0 - a.0) * seek_to, a.1 + (b.1 - a.1) * seek_to)
        };
        let mut translate = Matrix2D::translate(tx, ty);
        translate.multiply_assign(&m);
        Some(translate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precalc_angles_smooths_a_right_angle_turn() {
        let points = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let angles = precalc_angles(&points);
        assert_eq!(angles.len(), 3);
        // The middle point's heading is averaged between the incoming and
        // outgoing bearings, so it sits strictly between 0 and 90 degrees.
        assert!(angles[1] > 0.0 && angles[1] < 90.0);
    }

    #[test]
    fn linear_motion_interpolates_position_along_the_path() {
        let anim = MotionAnimation::from_points(
            vec![(0.0, 0.0), (10.0, 0.0)],
            CalcMode::Linear,
            AutoRotate::Fixed,
            0.0,
        );
        let m = anim.perform(0.5).unwrap();
        assert_eq!(m.translate_x, 5.0);
        assert_eq!(m.translate_y, 0.0);
    }

    #[test]
    fn discrete_motion_snaps_to_an_endpoint() {
        let anim = MotionAnimation::from_points(
            vec![(0.0, 0.0), (10.0, 0.0)],
            CalcMode::Discrete,
            AutoRotate::Fixed,
            0.0,
        );
        let m = anim.perform(0.9).unwrap();
        assert_eq!(m.translate_x, 10.0);
    }

    #[test]
    fn auto_rotate_orients_along_the_direction_of_travel() {
        let anim = MotionAnimation::from_points(
            vec![(0.0, 0.0), (10.0, 0.0)],
            CalcMode::Linear,
            AutoRotate::Auto,
            0.0,
        );
        let m = anim.perform(0.5).unwrap();
        // travelling due +x with angle 0 leaves shear components at 0
        assert!((m.shear_x).abs() < 1e-9);
    }

    #[test]
    fn from_values_parses_coordinate_pairs() {
        let anim = MotionAnimation::from_values(
            &["0,0".to_string(), "5,5".to_string()],
            CalcMode::Linear,
            AutoRotate::Fixed,
            0.0,
        )
        .unwrap();
        assert_eq!(anim.points, vec![(0.0, 0.0), (5.0, 5.0)]);
    }
}
