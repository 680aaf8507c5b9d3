//! `<animateTransform>` evaluation: calc modes, the five transform kinds,
//! and the per-frame `perform()` that produces a `Matrix2D`, ported from
//! `anim_transform::perform()` in `anim_transform.cpp`.

use crate::matrix::Matrix2D;
use crate::timing::AnimationTiming;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalcMode {
    Discrete,
    Linear,
    Paced,
    Spline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Additive {
    Replace,
    Sum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformKind {
    Translate,
    Scale,
    Rotate,
    SkewX,
    SkewY,
}

/// Split a semicolon-separated `values`/`keyTimes` list, trimming
/// whitespace around each entry the way the original's tokenizer tolerates
/// stray spaces around `;`.
pub fn split_semicolon_list(s: &str) -> Vec<String> {
    s.split(';').map(|part| part.trim().to_string()).filter(|p| !p.is_empty()).collect()
}

/// `read_numseq`: parse a whitespace/comma separated numeric tuple, e.g.
/// one entry of a `values` list such as `"10,20"` or `"10 20"`.
pub fn read_numseq(s: &str) -> Vec<f64> {
    s.split([',', ' '])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse::<f64>().ok())
        .collect()
}

const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

#[derive(Clone, Debug)]
pub struct TransformAnimation {
    pub kind: TransformKind,
    pub calc_mode: CalcMode,
    pub additive: Additive,
    pub accumulate: bool,
    pub values: Vec<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub by: Option<String>,
    /// Cumulative distance at each `values` entry, required for
    /// `CalcMode::Paced`; empty otherwise.
    pub distances: Vec<f64>,
}

impl TransformAnimation {
    /// Pick the two bracketing `values` entries and the local interpolation
    /// fraction for the current `seek` position, per calc mode. Returns
    /// `None` when there is no usable `values` list (caller falls back to
    /// from/to/by).
    fn value_pair(&self, seek: f64) -> Option<(usize, usize, f64)> {
        if self.values.len() < 2 {
            return None;
        }
        Some(crate::calc::bracket(self.values.len(), seek, self.calc_mode, &self.distances))
    }

    /// `anim_transform::perform()`: compute the matrix for the current
    /// `timing.seek` position. Returns `None` when none of
    /// `values`/`from`/`to`/`by` yields a usable pair, mirroring the
    /// original's early `break` out of the switch.
    pub fn perform(&self, timing: &AnimationTiming) -> Option<Matrix2D> {
        match self.kind {
            TransformKind::Translate | TransformKind::Scale => self.perform_point(timing),
            TransformKind::Rotate => self.perform_rotate(timing),
            TransformKind::SkewX => self.perform_skew(timing, true),
            TransformKind::SkewY => self.perform_skew(timing, false),
        }
    }

    fn perform_point(&self, timing: &AnimationTiming) -> Option<Matrix2D> {
        let (mut t_from, mut t_to);
        let seek_to;

        if let Some((i, j, s)) = self.value_pair(timing.seek) {
            let from_nums = read_numseq(&self.values[i]);
            let to_nums = read_numseq(&self.values[j]);
            t_from = (*from_nums.first()?, *from_nums.get(1).unwrap_or(&from_nums[0]));
            t_to = (*to_nums.first()?, *to_nums.get(1).unwrap_or(&to_nums[0]));
            seek_to = s;
        } else if let Some(from) = &self.from {
            let f = read_numseq(from);
            t_from = (*f.first()?, *f.get(1).unwrap_or(&0.0));
            if let Some(to) = &self.to {
                let v = read_numseq(to);
                t_to = (*v.first()?, *v.get(1).unwrap_or(&0.0));
            } else if let Some(by) = &self.by {
                let v = read_numseq(by);
                t_to = (t_from.0 + v.first().copied().unwrap_or(0.0), t_from.1 + v.get(1).copied().unwrap_or(0.0));
            } else {
                return None;
            }
            seek_to = timing.seek.min(1.0);
        } else {
            return None;
        }

        if self.kind == TransformKind::Scale {
            if t_from.1 == 0.0 {
                t_from.1 = t_from.0;
            }
            if t_to.1 == 0.0 {
                t_to.1 = t_to.0;
            }
        }

        let t_offset = t_to;
        if self.accumulate && timing.repeat_count != 0 {
            let acc = (t_offset.0 * timing.repeat_index as f64, t_offset.1 * timing.repeat_index as f64);
            t_from = (t_from.0 + acc.0, t_from.1 + acc.1);
            t_to = (t_to.0 + acc.0, t_to.1 + acc.1);
        }

        let mut x = t_from.0 + (t_to.0 - t_from.0) * seek_to;
        let mut y = t_from.1 + (t_to.1 - t_from.1) * seek_to;

        Some(match self.kind {
            TransformKind::Translate => Matrix2D::translate(x, y),
            TransformKind::Scale => {
                if y == 0.0 {
                    y = x;
                }
                if x == 0.0 {
                    x = y;
                }
                Matrix2D::scale(x, y)
            }
            _ => unreachable!(),
        })
    }

    fn perform_rotate(&self, timing: &AnimationTiming) -> Option<Matrix2D> {
        let (r_from, r_to, seek_to): ((f64, f64, f64), (f64, f64, f64), f64) =
            if let Some((i, j, s)) = self.value_pair(timing.seek) {
                let a = read_numseq(&self.values[i]);
                let b = read_numseq(&self.values[j]);
                (
                    (a.first().copied().unwrap_or(0.0), a.get(1).copied().unwrap_or(0.0), a.get(2).copied().unwrap_or(0.0)),
                    (b.first().copied().unwrap_or(0.0), b.get(1).copied().unwrap_or(0.0), b.get(2).copied().unwrap_or(0.0)),
                    s,
                )
            } else if let Some(from) = &self.from {
                let f = read_numseq(from);
                let from_t = (f.first().copied().unwrap_or(0.0), f.get(1).copied().unwrap_or(0.0), f.get(2).copied().unwrap_or(0.0));
                let to_t = if let Some(to) = &self.to {
                    let v = read_numseq(to);
                    (v.first().copied().unwrap_or(0.0), v.get(1).copied().unwrap_or(0.0), v.get(2).copied().unwrap_or(0.0))
                } else if let Some(by) = &self.by {
                    let v = read_numseq(by);
                    (
                        from_t.0 + v.first().copied().unwrap_or(0.0),
                        from_t.1 + v.get(1).copied().unwrap_or(0.0),
                        from_t.2 + v.get(2).copied().unwrap_or(0.0),
                    )
                } else {
                    return None;
                };
                (from_t, to_t, timing.seek.min(1.0))
            } else {
                return None;
            };

        let mut r_from = r_from;
        let mut r_to = r_to;
        if self.accumulate && timing.repeat_count != 0 {
            let n = timing.repeat_index as f64;
            let acc = (r_to.0 * n, r_to.1 * n, r_to.2 * n);
            r_from = (r_from.0 + acc.0, r_from.1 + acc.1, r_from.2 + acc.2);
            r_to = (r_to.0 + acc.0, r_to.1 + acc.1, r_to.2 + acc.2);
        }

        let angle = r_from.0 + (r_to.0 - r_from.0) * seek_to;
        let cx = r_from.1 + (r_to.1 - r_from.1) * seek_to;
        let cy = r_from.2 + (r_to.2 - r_from.2) * seek_to;
        Some(Matrix2D::rotate(angle, cx, cy))
    }

    fn perform_skew(&self, timing: &AnimationTiming, is_x: bool) -> Option<Matrix2D> {
        let (t_from, t_to, seek_to) = if let Some((i, j, s)) = self.value_pair(timing.seek) {
            let a = read_numseq(&self.values[i]);
            let b = read_numseq(&self.values[j]);
            (*a.first()?, *b.first()?, s)
        } else if let Some(from) = &self.from {
            let f = *read_numseq(from).first()?;
            let t = if let Some(to) = &self.to {
                *read_numseq(to).first()?
            } else if let Some(by) = &self.by {
                f + read_numseq(by).first().copied().unwrap_or(0.0)
            } else {
                return None;
            };
            (f, t, timing.seek.min(1.0))
        } else {
            return None;
        };

        let mut t_from = t_from;
        let mut t_to = t_to;
        if self.accumulate && timing.repeat_count != 0 {
            let acc = t_to * timing.repeat_index as f64;
            t_from += acc;
            t_to += acc;
        }

        let angle = t_from + (t_to - t_from) * seek_to;
        let mut m = Matrix2D::IDENTITY;
        if is_x {
            m.shear_x = (angle * DEG2RAD).tan();
        } else {
            m.shear_y = (angle * DEG2RAD).tan();
        }
        Some(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing_at(seek: f64) -> AnimationTiming {
        AnimationTiming { seek, repeat_count: 1, repeat_index: 0, ..Default::default() }
    }

    #[test]
    fn translate_from_to_interpolates_linearly() {
        let anim = TransformAnimation {
            kind: TransformKind::Translate,
            calc_mode: CalcMode::Linear,
            additive: Additive::Replace,
            accumulate: false,
            values: vec![],
            from: Some("0,0".into()),
            to: Some("100,200".into()),
            by: None,
            distances: vec![],
        };
        let m = anim.perform(&timing_at(0.5)).unwrap();
        assert_eq!(m.translate_x, 50.0);
        assert_eq!(m.translate_y, 100.0);
    }

    #[test]
    fn scale_defaults_y_to_x_when_only_one_component_given() {
        let anim = TransformAnimation {
            kind: TransformKind::Scale,
            calc_mode: CalcMode::Linear,
            additive: Additive::Replace,
            accumulate: false,
            values: vec![],
            from: Some("1".into()),
            to: Some("3".into()),
            by: None,
            distances: vec![],
        };
        let m = anim.perform(&timing_at(1.0)).unwrap();
        assert_eq!(m.scale_x, 3.0);
        assert_eq!(m.scale_y, 3.0);
    }

    #[test]
    fn values_list_picks_bracketing_pair_in_linear_mode() {
        let anim = TransformAnimation {
            kind: TransformKind::Translate,
            calc_mode: CalcMode::Linear,
            additive: Additive::Replace,
            accumulate: false,
            values: split_semicolon_list("0,0; 10,10; 20,20"),
            from: None,
            to: None,
            by: None,
            distances: vec![],
        };
        let m = anim.perform(&timing_at(0.75)).unwrap();
        assert_eq!(m.translate_x, 15.0);
    }

    #[test]
    fn discrete_mode_snaps_to_the_start_of_the_interval() {
        let anim = TransformAnimation {
            kind: TransformKind::Translate,
            calc_mode: CalcMode::Discrete,
            additive: Additive::Replace,
            accumulate: false,
            values: split_semicolon_list("0,0; 10,10; 20,20"),
            from: None,
            to: None,
            by: None,
            distances: vec![],
        };
        let m = anim.perform(&timing_at(0.4)).unwrap();
        assert_eq!(m.translate_x, 0.0);
    }

    #[test]
    fn rotate_interpolates_angle_and_center() {
        let anim = TransformAnimation {
            kind: TransformKind::Rotate,
            calc_mode: CalcMode::Linear,
            additive: Additive::Replace,
            accumulate: false,
            values: vec![],
            from: Some("0,0,0".into()),
            to: Some("90,10,10".into()),
            by: None,
            distances: vec![],
        };
        let m = anim.perform(&timing_at(0.5)).unwrap();
        // rotate(45, 5, 5) should have non-trivial shear components
        assert!(m.shear_y.abs() > 0.0);
    }

    #[test]
    fn skew_x_accumulates_across_repeats_when_requested() {
        let anim = TransformAnimation {
            kind: TransformKind::SkewX,
            calc_mode: CalcMode::Linear,
            additive: Additive::Sum,
            accumulate: true,
            values: vec![],
            from: Some("0".into()),
            to: Some("10".into()),
            by: None,
            distances: vec![],
        };
        let timing = AnimationTiming { seek: 1.0, repeat_count: 3, repeat_index: 1, ..Default::default() };
        let m = anim.perform(&timing).unwrap();
        // base 10 deg + one repeat's accumulated 10 deg offset = 20 deg
        let expected = (20.0f64 * DEG2RAD).tan();
        assert!((m.shear_x - expected).abs() < 1e-9);
    }
}
