//! `<animate>` on a scalar attribute (font-size, opacity, stroke-width,
//! and similar single-number properties), ported from `anim_value::perform`
//! and `anim_value::set_value` in `animation_value.cpp`. Colour and
//! enumerated-keyword targets (`fill`, `display`, `visibility`, ...) are
//! out of scope here; this module covers the numeric subset the timing
//! and calc-mode machinery is shared with.

use crate::calc::bracket;
use crate::transform::{read_numseq, Additive, CalcMode};
use compact_str::CompactString;

#[derive(Clone, Debug)]
pub struct ValueAnimation {
    pub target_attrib: CompactString,
    pub calc_mode: CalcMode,
    pub additive: Additive,
    pub accumulate: bool,
    pub values: Vec<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub by: Option<String>,
    pub distances: Vec<f64>,
}

impl ValueAnimation {
    /// The interpolated scalar for the current `seek` position, combined
    /// with `base` (the attribute's value before this animation is
    /// applied) per `additive`/`accumulate`, mirroring `set_value`'s use
    /// of `get_numeric_value(Vector, field)` as the starting point for
    /// additive animations.
    pub fn evaluate(&self, seek: f64, base: f64, repeat_count: i32, repeat_index: i32) -> Option<f64> {
        let (mut from, mut to, seek_to) = if self.values.len() >= 2 {
            let (i, j, s) = bracket(self.values.len(), seek, self.calc_mode, &self.distances);
            let from = read_numseq(&self.values[i]).first().copied()?;
            let to = read_numseq(&self.values[j]).first().copied()?;
            (from, to, s)
        } else if let Some(from_s) = &self.from {
            let from = read_numseq(from_s).first().copied()?;
            let to = if let Some(to_s) = &self.to {
                read_numseq(to_s).first().copied()?
            } else if let Some(by_s) = &self.by {
                from + read_numseq(by_s).first().copied().unwrap_or(0.0)
            } else {
                return None;
            };
            (from, to, seek.min(1.0))
        } else {
            return None;
        };

        if self.accumulate && repeat_count != 0 {
            let acc = to * repeat_index as f64;
            from += acc;
            to += acc;
        }

        let interpolated = from + (to - from) * seek_to;
        Some(match self.additive {
            Additive::Replace => interpolated,
            Additive::Sum => base + interpolated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_mode_ignores_the_attributes_current_value() {
        let anim = ValueAnimation {
            target_attrib: CompactString::new("opacity"),
            calc_mode: CalcMode::Linear,
            additive: Additive::Replace,
            accumulate: false,
            values: vec![],
            from: Some("0".into()),
            to: Some("1".into()),
            by: None,
            distances: vec![],
        };
        assert_eq!(anim.evaluate(0.5, 0.2, 1, 0), Some(0.5));
    }

    #[test]
    fn sum_mode_adds_to_the_base_value() {
        let anim = ValueAnimation {
            target_attrib: CompactString::new("stroke-width"),
            calc_mode: CalcMode::Linear,
            additive: Additive::Sum,
            accumulate: false,
            values: vec![],
            from: Some("1".into()),
            to: Some("2".into()),
            by: None,
            distances: vec![],
        };
        assert_eq!(anim.evaluate(1.0, 10.0, 1, 0), Some(12.0));
    }

    #[test]
    fn values_list_with_paced_calc_mode_uses_distance_fraction() {
        let anim = ValueAnimation {
            target_attrib: CompactString::new("font-size"),
            calc_mode: CalcMode::Paced,
            additive: Additive::Replace,
            accumulate: false,
            values: vec!["0".into(), "1".into(), "10".into()],
            from: None,
            to: None,
            by: None,
            distances: vec![0.0, 1.0, 10.0],
        };
        let v = anim.evaluate(0.5, 0.0, 1, 0).unwrap();
        assert!((v - (1.0 + (5.0 - 1.0) / (10.0 - 1.0) * (10.0 - 1.0))).abs() < 1e-9);
    }
}
