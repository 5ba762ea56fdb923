//! 动画系统
//!
//! 提供关键帧轨道、变换轨道和动画片段的采样。

mod clip;
mod frame;
mod track;
mod transform_track;

pub use clip::Clip;
pub use frame::{Frame, QuaternionFrame, ScalarFrame, TrackValue, VectorFrame};
pub use track::{Interpolation, QuaternionTrack, ScalarTrack, Track, VectorTrack};
pub use transform_track::TransformTrack;
