//! The SMIL begin/duration/repeat state machine every animation kind
//! shares, ported from `anim_base::started`/`anim_base::next_frame` in
//! `animation_timing.cpp`.

/// Shared timing state for one `<animate*>` element.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnimationTiming {
    pub first_time: f64,
    pub start_time: f64,
    pub end_time: f64,
    /// Seconds to wait after activation before the animation actually
    /// starts (`begin="2s"` style offsets).
    pub begin_offset: f64,
    pub duration: f64,
    /// -1 means indefinite repetition, matching `repeat_count < 0` in the
    /// original.
    pub repeat_count: i32,
    pub repeat_index: i32,
    pub repeat_duration: f64,
    /// Current normalised position in `[0, 1]` within the active cycle.
    pub seek: f64,
}

impl AnimationTiming {
    pub fn new(duration: f64, begin_offset: f64, repeat_count: i32, repeat_duration: f64) -> Self {
        Self { duration, begin_offset, repeat_count, repeat_duration, ..Default::default() }
    }

    /// `anim_base::started`: whether the animation should be considered
    /// active as of `current_time`.
    pub fn started(&mut self, current_time: f64) -> bool {
        if self.first_time == 0.0 {
            self.first_time = current_time;
        }

        if self.start_time != 0.0 {
            return true;
        }
        if self.repeat_index > 0 {
            return true;
        }

        if self.begin_offset != 0.0 {
            let elapsed = current_time - self.start_time;
            if elapsed < self.begin_offset {
                return false;
            }
        }

        self.start_time = current_time;
        true
    }

    /// `anim_base::next_frame`: advances `seek` and reports whether the
    /// animation has finished (no more cycles left to run).
    pub fn next_frame(&mut self, current_time: f64) -> bool {
        if self.end_time != 0.0 {
            return false;
        }

        let elapsed = current_time - self.start_time;

        self.seek = if self.duration == 0.0 { 0.0 } else { elapsed / self.duration };

        if self.seek >= 1.0 {
            if self.repeat_count < 0 || self.repeat_index + 1 < self.repeat_count {
                self.repeat_index += 1;
                self.start_time = current_time;
                self.seek = 0.0;
                return false;
            } else {
                if self.seek > 1.0 {
                    self.seek = 1.0;
                }
                return true;
            }
        }

        if self.repeat_duration > 0.0 && elapsed > self.repeat_duration {
            return true;
        }

        false
    }

    pub fn stop(&mut self, current_time: f64) {
        self.end_time = current_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_immediately_with_no_begin_offset() {
        let mut t = AnimationTiming::new(1.0, 0.0, 1, 0.0);
        assert!(t.started(0.0));
    }

    #[test]
    fn respects_begin_offset_before_first_start() {
        let mut t = AnimationTiming::new(1.0, 2.0, 1, 0.0);
        assert!(!t.started(1.0));
    }

    #[test]
    fn next_frame_reports_finished_after_single_repeat() {
        let mut t = AnimationTiming::new(1.0, 0.0, 1, 0.0);
        t.started(0.0);
        assert!(!t.next_frame(0.5));
        assert!((t.seek - 0.5).abs() < 1e-9);
        assert!(t.next_frame(1.5));
        assert_eq!(t.seek, 1.0);
    }

    #[test]
    fn next_frame_cycles_when_repeat_count_allows_more() {
        let mut t = AnimationTiming::new(1.0, 0.0, 3, 0.0);
        t.started(0.0);
        assert!(!t.next_frame(1.2));
        assert_eq!(t.repeat_index, 1);
        assert_eq!(t.seek, 0.0);
    }

    #[test]
    fn indefinite_repeat_count_never_finishes_from_seek_alone() {
        let mut t = AnimationTiming::new(1.0, 0.0, -1, 0.0);
        t.started(0.0);
        assert!(!t.next_frame(10.5));
        assert_eq!(t.seek, 0.0);
    }

    #[test]
    fn repeat_duration_caps_total_running_time() {
        let mut t = AnimationTiming::new(1.0, 0.0, -1, 2.0);
        t.started(0.0);
        assert!(t.next_frame(3.0));
    }
}
