//! 动画关键帧

use std::fmt::Debug;
use std::ops::{Add, Mul};

use glam::{Quat, Vec3};

use crate::transform::normalize_quat;

/// 可被轨道采样的值类型（标量 / 三维向量 / 四元数）
pub trait TrackValue: Copy + Debug + PartialEq + Add<Output = Self> + Mul<f32, Output = Self> {
    /// 每个值的浮点分量数
    const COMPONENTS: usize;

    /// 无效采样时返回的默认值
    ///
    /// 四元数为 (0, 0, 0, 0)，不是合法旋转。
    fn default_sample() -> Self;

    /// 线性插值
    fn interpolate(a: Self, b: Self, t: f32) -> Self;

    /// 读取关键帧值（四元数在此归一化）
    #[inline]
    fn read_value(self) -> Self {
        self
    }

    /// 让 `b` 与 `a` 位于同一邻域（四元数取最短路径）
    #[inline]
    fn neighborhood(_a: Self, b: Self) -> Self {
        b
    }

    /// Hermite 结果修正
    #[inline]
    fn adjust_hermite_result(self) -> Self {
        self
    }

    /// 从扁平浮点切片构造，长度必须等于 `COMPONENTS`
    fn from_components(components: &[f32]) -> Self;
}

impl TrackValue for f32 {
    const COMPONENTS: usize = 1;

    #[inline]
    fn default_sample() -> Self {
        0.0
    }

    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a + (b - a) * t
    }

    #[inline]
    fn from_components(components: &[f32]) -> Self {
        components[0]
    }
}

impl TrackValue for Vec3 {
    const COMPONENTS: usize = 3;

    #[inline]
    fn default_sample() -> Self {
        Vec3::ZERO
    }

    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }

    #[inline]
    fn from_components(components: &[f32]) -> Self {
        Vec3::new(components[0], components[1], components[2])
    }
}

impl TrackValue for Quat {
    const COMPONENTS: usize = 4;

    #[inline]
    fn default_sample() -> Self {
        Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)
    }

    /// nlerp，不是 slerp
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        let b = Self::neighborhood(a, b);
        normalize_quat(a * (1.0 - t) + b * t)
    }

    #[inline]
    fn read_value(self) -> Self {
        normalize_quat(self)
    }

    #[inline]
    fn neighborhood(a: Self, b: Self) -> Self {
        if a.dot(b) < 0.0 {
            -b
        } else {
            b
        }
    }

    #[inline]
    fn adjust_hermite_result(self) -> Self {
        normalize_quat(self)
    }

    #[inline]
    fn from_components(components: &[f32]) -> Self {
        Quat::from_xyzw(components[0], components[1], components[2], components[3])
    }
}

/// 关键帧
///
/// `in_tangent` / `out_tangent` 只在三次插值时使用。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame<T> {
    pub time: f32,
    pub in_tangent: T,
    pub out_tangent: T,
    pub value: T,
}

impl<T: TrackValue> Frame<T> {
    /// 切线为零的关键帧
    pub fn new(time: f32, value: T) -> Self {
        Self {
            time,
            in_tangent: T::default_sample(),
            out_tangent: T::default_sample(),
            value,
        }
    }

    pub fn with_tangents(time: f32, in_tangent: T, out_tangent: T, value: T) -> Self {
        Self {
            time,
            in_tangent,
            out_tangent,
            value,
        }
    }
}

impl<T: TrackValue> Default for Frame<T> {
    fn default() -> Self {
        Self::new(0.0, T::default_sample())
    }
}

pub type ScalarFrame = Frame<f32>;
pub type VectorFrame = Frame<Vec3>;
pub type QuaternionFrame = Frame<Quat>;
