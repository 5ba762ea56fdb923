//! 动画轨道
//!
//! 存储一条曲线的所有关键帧，并提供查找和插值功能。

use std::ops::{Index, IndexMut};
use std::str::FromStr;

use glam::{Quat, Vec3};

use super::frame::{Frame, TrackValue};
use crate::{AnimError, Result};

/// 插值方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// 阶梯，不插值
    Constant,
    #[default]
    Linear,
    /// 三次 Hermite
    Cubic,
}

impl FromStr for Interpolation {
    type Err = AnimError;

    /// 解析 glTF 采样器的插值名
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "STEP" => Ok(Self::Constant),
            "LINEAR" => Ok(Self::Linear),
            "CUBICSPLINE" => Ok(Self::Cubic),
            other => Err(AnimError::UnknownInterpolation(other.to_string())),
        }
    }
}

/// 动画轨道
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track<T> {
    frames: Vec<Frame<T>>,
    interpolation: Interpolation,
}

pub type ScalarTrack = Track<f32>;
pub type VectorTrack = Track<Vec3>;
pub type QuaternionTrack = Track<Quat>;

impl<T: TrackValue> Track<T> {
    /// 创建轨道，不校验时间顺序
    pub fn new(frames: Vec<Frame<T>>, interpolation: Interpolation) -> Self {
        Self { frames, interpolation }
    }

    /// 创建轨道，要求时间严格递增
    pub fn try_new(frames: Vec<Frame<T>>, interpolation: Interpolation) -> Result<Self> {
        if let Some(index) = first_unordered(&frames) {
            return Err(AnimError::UnorderedFrames { index });
        }
        Ok(Self::new(frames, interpolation))
    }

    /// 从 glTF 风格的扁平采样数据构造
    ///
    /// 三次插值时每个关键帧依次为 in / value / out，否则只有 value。
    pub fn from_sampler(interpolation: Interpolation, times: &[f32], values: &[f32]) -> Result<Self> {
        let per_value = T::COMPONENTS;
        let per_frame = if interpolation == Interpolation::Cubic {
            per_value * 3
        } else {
            per_value
        };

        if values.len() != times.len() * per_frame {
            return Err(AnimError::SamplerLayout(format!(
                "{} keys need {} floats, got {}",
                times.len(),
                times.len() * per_frame,
                values.len()
            )));
        }

        let frames = times
            .iter()
            .zip(values.chunks_exact(per_frame))
            .map(|(&time, chunk)| match interpolation {
                Interpolation::Cubic => Frame::with_tangents(
                    time,
                    T::from_components(&chunk[..per_value]),
                    T::from_components(&chunk[per_value * 2..]),
                    T::from_components(&chunk[per_value..per_value * 2]),
                ),
                _ => Frame::new(time, T::from_components(chunk)),
            })
            .collect();

        Ok(Self::new(frames, interpolation))
    }

    #[inline]
    pub fn frames(&self) -> &[Frame<T>] {
        &self.frames
    }

    /// 编辑关键帧（编辑器用）
    #[inline]
    pub fn frames_mut(&mut self) -> &mut Vec<Frame<T>> {
        &mut self.frames
    }

    #[inline]
    pub fn push_frame(&mut self, frame: Frame<T>) {
        self.frames.push(frame);
    }

    pub fn resize(&mut self, size: usize) {
        self.frames.resize(size, Frame::default());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    #[inline]
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// 至少两个关键帧才可采样
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.frames.len() >= 2
    }

    /// 时间是否严格递增
    pub fn is_time_ordered(&self) -> bool {
        first_unordered(&self.frames).is_none()
    }

    pub fn start_time(&self) -> f32 {
        self.frames.first().map_or(0.0, |f| f.time)
    }

    pub fn end_time(&self) -> f32 {
        self.frames.last().map_or(0.0, |f| f.time)
    }

    /// 采样；无效轨道返回 `T::default_sample()`
    pub fn sample(&self, time: f32, looping: bool) -> T {
        self.try_sample(time, looping).unwrap_or_else(T::default_sample)
    }

    /// 采样；无法采样时返回 `None`
    pub fn try_sample(&self, time: f32, looping: bool) -> Option<T> {
        match self.interpolation {
            Interpolation::Constant => self.sample_constant(time, looping),
            Interpolation::Linear => self.sample_linear(time, looping),
            Interpolation::Cubic => self.sample_cubic(time, looping),
        }
    }

    /// 查找 `time` 所在区间的起始关键帧
    ///
    /// 循环时把时间折回 `[start, end)` 后从后向前扫描；非循环时钳制到首尾区间。
    /// 少于两帧时返回 `None`。
    pub fn find_frame_index(&self, time: f32, looping: bool) -> Option<usize> {
        let size = self.frames.len();
        if size <= 1 {
            return None;
        }

        let time = if looping {
            let start = self.frames[0].time;
            let duration = self.frames[size - 1].time - start;
            if duration <= 0.0 {
                return None;
            }
            wrap_time(time, start, duration)
        } else {
            if time <= self.frames[0].time {
                return Some(0);
            }
            if time >= self.frames[size - 2].time {
                return Some(size - 2);
            }
            time
        };

        // 末帧不能作为区间起点
        self.frames
            .iter()
            .rposition(|frame| time >= frame.time)
            .map(|index| index.min(size - 2))
    }

    /// 把时间调整到轨道范围内（循环折回或钳制）
    pub fn adjust_time_to_fit_track(&self, time: f32, looping: bool) -> f32 {
        let size = self.frames.len();
        if size <= 1 {
            return 0.0;
        }

        let start = self.frames[0].time;
        let end = self.frames[size - 1].time;
        let duration = end - start;
        if duration <= 0.0 {
            return 0.0;
        }

        if looping {
            wrap_time(time, start, duration)
        } else {
            time.clamp(start, end)
        }
    }

    fn sample_constant(&self, time: f32, looping: bool) -> Option<T> {
        let index = self.find_frame_index(time, looping)?;
        self.frames.get(index).map(|frame| frame.value.read_value())
    }

    fn sample_linear(&self, time: f32, looping: bool) -> Option<T> {
        let (this, next, t) = self.segment(time, looping)?;
        Some(T::interpolate(this.value.read_value(), next.value.read_value(), t))
    }

    fn sample_cubic(&self, time: f32, looping: bool) -> Option<T> {
        let (this, next, t) = self.segment(time, looping)?;
        let frame_delta = next.time - this.time;

        let point1 = this.value.read_value();
        let slope1 = this.out_tangent * frame_delta;
        let point2 = next.value.read_value();
        let slope2 = next.in_tangent * frame_delta;

        Some(hermite(t, point1, slope1, point2, slope2))
    }

    /// 找到包含 `time` 的区间及区间内的插值参数
    fn segment(&self, time: f32, looping: bool) -> Option<(&Frame<T>, &Frame<T>, f32)> {
        let index = self.find_frame_index(time, looping)?;
        if index + 1 >= self.frames.len() {
            return None;
        }

        let this = &self.frames[index];
        let next = &self.frames[index + 1];
        let frame_delta = next.time - this.time;
        if frame_delta <= 0.0 {
            return None;
        }

        let track_time = self.adjust_time_to_fit_track(time, looping);
        Some((this, next, (track_time - this.time) / frame_delta))
    }
}

impl<T> Index<usize> for Track<T> {
    type Output = Frame<T>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.frames[index]
    }
}

impl<T> IndexMut<usize> for Track<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.frames[index]
    }
}

/// 三次 Hermite 基函数求值
fn hermite<T: TrackValue>(t: f32, point1: T, slope1: T, point2: T, slope2: T) -> T {
    let tt = t * t;
    let ttt = tt * t;

    let point2 = T::neighborhood(point1, point2);

    let h1 = 2.0 * ttt - 3.0 * tt + 1.0;
    let h2 = -2.0 * ttt + 3.0 * tt;
    let h3 = ttt - 2.0 * tt + t;
    let h4 = ttt - tt;

    (point1 * h1 + point2 * h2 + slope1 * h3 + slope2 * h4).adjust_hermite_result()
}

/// 把时间折回 `[start, start + duration)`
#[inline]
pub(crate) fn wrap_time(time: f32, start: f32, duration: f32) -> f32 {
    let mut local = (time - start) % duration;
    if local < 0.0 {
        local += duration;
    }
    // 负的微小余数加上 duration 后可能舍入到区间终点
    let wrapped = local + start;
    if wrapped >= start + duration {
        start
    } else {
        wrapped
    }
}

fn first_unordered<T>(frames: &[Frame<T>]) -> Option<usize> {
    frames
        .windows(2)
        .position(|pair| pair[1].time <= pair[0].time)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Interpolation; 3] = [
        Interpolation::Constant,
        Interpolation::Linear,
        Interpolation::Cubic,
    ];

    fn scalar(frames: &[(f32, f32)], interpolation: Interpolation) -> ScalarTrack {
        Track::new(
            frames.iter().map(|&(t, v)| Frame::new(t, v)).collect(),
            interpolation,
        )
    }

    #[test]
    fn test_invalid_track() {
        for interpolation in ALL {
            for ignored in [0.0, 42.0, -10.0] {
                for time in [0.0, 10.0, -42.0] {
                    for looping in [false, true] {
                        let empty = scalar(&[], interpolation);
                        let one = scalar(&[(ignored, 3.0)], interpolation);
                        assert_eq!(empty.find_frame_index(time, looping), None);
                        assert_eq!(one.find_frame_index(time, looping), None);
                        assert_eq!(empty.sample(time, looping), 0.0);
                        assert_eq!(one.sample(time, looping), 0.0);
                        assert!(one.try_sample(time, looping).is_none());
                    }
                }
            }
        }

        let q = QuaternionTrack::new(vec![Frame::new(0.0, Quat::IDENTITY)], Interpolation::Linear);
        assert_eq!(q.sample(0.5, false), Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_find_frame_index() {
        for interpolation in ALL {
            let track = scalar(&[(0.0, 0.0), (1.0, 0.0)], interpolation);
            let many = scalar(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)], interpolation);

            assert_eq!(track.find_frame_index(0.0, false), Some(0));
            assert_eq!(track.find_frame_index(10.0, false), Some(0));
            assert_eq!(track.find_frame_index(-10.0, false), Some(0));

            assert_eq!(many.find_frame_index(0.0, false), Some(0));
            assert_eq!(many.find_frame_index(1.5, false), Some(1));
            assert_eq!(many.find_frame_index(2.5, false), Some(2));

            assert_eq!(many.find_frame_index(3.5, false), Some(2));
            assert_eq!(many.find_frame_index(3.5, true), Some(0));
            assert_eq!(many.find_frame_index(4.5, true), Some(1));
            assert_eq!(many.find_frame_index(-0.5, true), Some(2));
        }
    }

    #[test]
    fn test_adjust_time_to_fit_track() {
        let track = scalar(&[(1.0, 0.0), (3.0, 0.0)], Interpolation::Linear);
        assert_eq!(track.adjust_time_to_fit_track(0.0, false), 1.0);
        assert_eq!(track.adjust_time_to_fit_track(5.0, false), 3.0);
        assert_eq!(track.adjust_time_to_fit_track(2.0, false), 2.0);
        assert!((track.adjust_time_to_fit_track(4.5, true) - 2.5).abs() < 1e-6);
        assert!((track.adjust_time_to_fit_track(0.5, true) - 2.5).abs() < 1e-6);

        let flat = scalar(&[(1.0, 0.0), (1.0, 0.0)], Interpolation::Linear);
        assert_eq!(flat.adjust_time_to_fit_track(0.7, true), 0.0);
    }

    #[test]
    fn test_linear_scalar_scenario() {
        let track = scalar(&[(0.0, 0.0), (1.0, 1.0)], Interpolation::Linear);
        assert_eq!(track.sample(0.0, false), 0.0);
        assert!((track.sample(0.5, false) - 0.5).abs() < 1e-6);
        assert!((track.sample(1.5, true) - 0.5).abs() < 1e-6);
        assert_eq!(track.sample(7.0, false), 1.0);
    }

    #[test]
    fn test_constant_track_does_not_blend() {
        let track = scalar(
            &[(0.25, 0.0), (0.45, 1.0), (0.6, 0.0), (0.75, 1.0)],
            Interpolation::Constant,
        );
        assert_eq!(track.sample(0.3, false), 0.0);
        assert_eq!(track.sample(0.5, false), 1.0);
        assert_eq!(track.sample(0.7, false), 0.0);
        assert_eq!(track.sample(0.44, true), 0.0);
    }

    #[test]
    fn test_looping_wrap_law() {
        let track = scalar(&[(0.5, 2.0), (1.25, -1.0), (2.5, 4.0)], Interpolation::Linear);
        let span = 2.0;
        for &t in &[0.6, 1.0, 1.9, 2.3] {
            let base = track.sample(t, true);
            for k in [-2.0_f32, -1.0, 1.0, 3.0] {
                let shifted = track.sample(t + k * span, true);
                assert!((base - shifted).abs() < 1e-4, "t={} k={}", t, k);
            }
        }
    }

    #[test]
    fn test_looping_just_before_start_wraps_to_first_frame() {
        let frames = vec![
            Frame::new(0.0, Vec3::ONE),
            Frame::new(1.0, Vec3::splat(2.0)),
        ];
        let time = -1e-8;

        let linear = VectorTrack::new(frames.clone(), Interpolation::Linear);
        assert_eq!(linear.find_frame_index(time, true), Some(0));
        assert!(linear.adjust_time_to_fit_track(time, true) < 1.0);
        assert!(linear.sample(time, true).abs_diff_eq(Vec3::ONE, 1e-5));

        let constant = VectorTrack::new(frames, Interpolation::Constant);
        assert_eq!(constant.sample(time, true), Vec3::ONE);

        let rotations = QuaternionTrack::new(
            vec![
                Frame::new(0.0, Quat::IDENTITY),
                Frame::new(1.0, Quat::from_rotation_z(1.0)),
            ],
            Interpolation::Linear,
        );
        let q = rotations.sample(time, true);
        assert!((q.length() - 1.0).abs() < 1e-5, "{:?}", q);
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1e-5));

        // 带偏移的起点也同样折回
        let shifted = scalar(&[(0.5, 3.0), (2.0, 6.0)], Interpolation::Constant);
        assert_eq!(shifted.find_frame_index(0.5 - 1e-7, true), Some(0));
        assert_eq!(shifted.sample(0.5 - 1e-7, true), 3.0);
    }

    #[test]
    fn test_quaternion_linear_midpoint() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_y(1.0);
        let track = QuaternionTrack::new(
            vec![Frame::new(0.0, a), Frame::new(1.0, b)],
            Interpolation::Linear,
        );
        let mid = track.sample(0.5, false);
        assert!(mid.abs_diff_eq(Quat::from_rotation_y(0.5), 1e-5));
    }

    #[test]
    fn test_quaternion_neighborhood() {
        let a = Quat::from_rotation_x(0.2);
        let b = -Quat::from_rotation_x(0.6);
        for interpolation in [Interpolation::Linear, Interpolation::Cubic] {
            let track = QuaternionTrack::new(vec![Frame::new(0.0, a), Frame::new(1.0, b)], interpolation);
            let mid = track.sample(0.5, false);
            assert!(mid.abs_diff_eq(Quat::from_rotation_x(0.4), 1e-4), "{:?}", mid);
        }
    }

    #[test]
    fn test_cubic_hermite() {
        let flat = scalar(&[(0.0, 0.0), (1.0, 1.0)], Interpolation::Cubic);
        assert!((flat.sample(0.5, false) - 0.5).abs() < 1e-6);
        assert!((flat.sample(0.25, false) - 0.15625).abs() < 1e-6);

        // 单位斜率的 Hermite 退化为直线
        let ramp = ScalarTrack::new(
            vec![
                Frame::with_tangents(0.0, 0.0, 0.5, 0.0),
                Frame::with_tangents(2.0, 0.5, 0.0, 1.0),
            ],
            Interpolation::Cubic,
        );
        assert!((ramp.sample(0.5, false) - 0.25).abs() < 1e-5);
        assert!((ramp.sample(1.5, false) - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_vector_track() {
        let track = VectorTrack::new(
            vec![Frame::new(0.0, Vec3::ZERO), Frame::new(2.0, Vec3::new(2.0, 4.0, -2.0))],
            Interpolation::Linear,
        );
        assert!(track.sample(1.0, false).abs_diff_eq(Vec3::new(1.0, 2.0, -1.0), 1e-6));
        assert_eq!(track.start_time(), 0.0);
        assert_eq!(track.end_time(), 2.0);
    }

    #[test]
    fn test_non_monotonic_frames_are_total() {
        let frames = vec![Frame::new(0.0, 1.0), Frame::new(2.0, 2.0), Frame::new(1.0, 3.0)];
        assert!(matches!(
            ScalarTrack::try_new(frames.clone(), Interpolation::Linear),
            Err(AnimError::UnorderedFrames { index: 2 })
        ));

        for interpolation in ALL {
            let track = ScalarTrack::new(frames.clone(), interpolation);
            assert!(!track.is_time_ordered());
            for &time in &[-1.0, 0.0, 0.5, 1.5, 2.5, 10.0] {
                for looping in [false, true] {
                    // 不崩溃，结果有限
                    assert!(track.sample(time, looping).is_finite());
                }
            }
        }
    }

    #[test]
    fn test_from_sampler() {
        assert_eq!("STEP".parse::<Interpolation>().unwrap(), Interpolation::Constant);
        assert_eq!("CUBICSPLINE".parse::<Interpolation>().unwrap(), Interpolation::Cubic);
        assert!("SMOOTH".parse::<Interpolation>().is_err());

        let linear = VectorTrack::from_sampler(
            Interpolation::Linear,
            &[0.0, 1.0],
            &[0.0, 0.0, 0.0, 1.0, 2.0, 3.0],
        )
        .unwrap();
        assert_eq!(linear[1].value, Vec3::new(1.0, 2.0, 3.0));

        let cubic = ScalarTrack::from_sampler(Interpolation::Cubic, &[0.0, 1.0], &[7.0, 1.0, 8.0, 9.0, 2.0, 10.0])
            .unwrap();
        assert_eq!(cubic[0].in_tangent, 7.0);
        assert_eq!(cubic[0].value, 1.0);
        assert_eq!(cubic[0].out_tangent, 8.0);
        assert_eq!(cubic[1].value, 2.0);

        assert!(matches!(
            QuaternionTrack::from_sampler(Interpolation::Linear, &[0.0], &[0.0, 0.0, 1.0]),
            Err(AnimError::SamplerLayout(_))
        ));
    }
}
