//! SMIL-style animation evaluation for vector scenes: timing, calc modes,
//! and the three `<animate*>` kinds (`transform`, plain attribute
//! `value`, and `motion`), grounded in `original_source/src/svg/`
//! (`animation_timing.cpp`, `anim_transform.cpp`, `animation_value.cpp`,
//! `animation_motion.cpp`), per `spec.md` §4.9.

pub mod calc;
pub mod matrix;
pub mod motion;
pub mod scheduler;
pub mod timing;
pub mod transform;
pub mod value;

pub use calc::{bracket, cumulative_distances};
pub use matrix::Matrix2D;
pub use motion::{AutoRotate, MotionAnimation};
pub use scheduler::{compose, QueuedTransform};
pub use timing::AnimationTiming;
pub use transform::{read_numseq, split_semicolon_list, Additive, CalcMode, TransformAnimation, TransformKind};
pub use value::ValueAnimation;
