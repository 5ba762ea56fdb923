//! Anim Engine - 骨骼动画与 IK 运行时
//!
//! 提供以下功能：
//! - 关键帧轨道采样（常量 / 线性 / 三次 Hermite）
//! - 动画片段驱动整副骨骼姿势
//! - 姿势层次与全局变换、蒙皮矩阵调色板
//! - CCD / FABRIK 迭代 IK 求解与腿部落脚
//!
//! 文件解析、渲染、窗口输入均由外部负责。

pub mod animation;
pub mod config;
pub mod ik;
pub mod intersections;
pub mod skeleton;
pub mod transform;

pub use animation::{
    Clip, Frame, Interpolation, QuaternionTrack, ScalarTrack, Track, TrackValue,
    TransformTrack, VectorTrack,
};
pub use config::AnimConfig;
pub use ik::{ik_ccd, ik_fabrik, CcdSolver, FabrikSolver, IkFunction, IkLeg, IkSolverKind};
pub use intersections::{Ray, Triangle};
pub use skeleton::{Joint, Pose, Skeleton};
pub use transform::Transform;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimError {
    #[error("Joint not found: {0}")]
    JointNotFound(String),

    #[error("Joint index {index} out of range (pose has {len} joints)")]
    JointOutOfRange { index: usize, len: usize },

    #[error("Joint hierarchy contains a cycle through joint {0}")]
    HierarchyCycle(usize),

    #[error("Size mismatch for {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Frame {index} is not later than the previous frame")]
    UnorderedFrames { index: usize },

    #[error("Unknown interpolation: {0}")]
    UnknownInterpolation(String),

    #[error("Sampler layout error: {0}")]
    SamplerLayout(String),
}

pub type Result<T> = std::result::Result<T, AnimError>;
