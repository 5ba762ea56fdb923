//! 变换轨道 - 绑定到单个关节的位置 / 旋转 / 缩放三条轨道

use super::track::{QuaternionTrack, VectorTrack};
use crate::transform::Transform;

/// 变换轨道
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformTrack {
    /// 驱动的关节索引
    pub joint_id: usize,
    pub position: VectorTrack,
    pub rotation: QuaternionTrack,
    pub scale: VectorTrack,
}

impl TransformTrack {
    /// 三条空的线性轨道
    pub fn new(joint_id: usize) -> Self {
        Self {
            joint_id,
            ..Self::default()
        }
    }

    /// 任意一条子轨道有效即有效
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.position.is_valid() || self.rotation.is_valid() || self.scale.is_valid()
    }

    /// 有效子轨道中最早的开始时间，没有有效子轨道时为 0
    pub fn start_time(&self) -> f32 {
        self.valid_ranges()
            .map(|(start, _)| start)
            .reduce(f32::min)
            .unwrap_or(0.0)
    }

    /// 有效子轨道中最晚的结束时间，没有有效子轨道时为 0
    pub fn end_time(&self) -> f32 {
        self.valid_ranges()
            .map(|(_, end)| end)
            .reduce(f32::max)
            .unwrap_or(0.0)
    }

    /// 采样；无效的子轨道直接沿用 `reference` 的对应分量
    pub fn sample(&self, reference: &Transform, time: f32, looping: bool) -> Transform {
        Transform {
            position: if self.position.is_valid() {
                self.position.sample(time, looping)
            } else {
                reference.position
            },
            rotation: if self.rotation.is_valid() {
                self.rotation.sample(time, looping)
            } else {
                reference.rotation
            },
            scale: if self.scale.is_valid() {
                self.scale.sample(time, looping)
            } else {
                reference.scale
            },
        }
    }

    fn valid_ranges(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        let position = self
            .position
            .is_valid()
            .then(|| (self.position.start_time(), self.position.end_time()));
        let rotation = self
            .rotation
            .is_valid()
            .then(|| (self.rotation.start_time(), self.rotation.end_time()));
        let scale = self
            .scale
            .is_valid()
            .then(|| (self.scale.start_time(), self.scale.end_time()));

        [position, rotation, scale].into_iter().flatten()
    }
}
