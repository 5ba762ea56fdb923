//! 姿势 - 扁平关节数组 + 父索引
//!
//! 层次结构用索引表示，全局变换沿父索引循环向上累积，不使用递归。

use std::ops::{Index, IndexMut};

use glam::Mat4;

use crate::transform::Transform;
use crate::{AnimError, Result};

/// 关节
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Joint {
    /// 父关节索引（`None` 表示根）
    pub parent: Option<usize>,
    /// 相对父关节的本地变换
    pub local: Transform,
}

impl Joint {
    #[inline]
    pub fn new(parent: Option<usize>, local: Transform) -> Self {
        Self { parent, local }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// 某一时刻整副骨骼的本地变换
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    joints: Vec<Joint>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    /// `len` 个单位变换的根关节
    pub fn with_len(len: usize) -> Self {
        Self {
            joints: vec![Joint::default(); len],
        }
    }

    pub fn from_joints(joints: Vec<Joint>) -> Self {
        Self { joints }
    }

    pub fn resize(&mut self, len: usize) {
        self.joints.resize(len, Joint::default());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    #[inline]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    #[inline]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.joints[index].parent
    }

    #[inline]
    pub fn set_parent(&mut self, index: usize, parent: Option<usize>) {
        self.joints[index].parent = parent;
    }

    #[inline]
    pub fn local_transform(&self, index: usize) -> Transform {
        self.joints[index].local
    }

    #[inline]
    pub fn set_local_transform(&mut self, index: usize, transform: Transform) {
        self.joints[index].local = transform;
    }

    /// 计算关节的全局变换
    ///
    /// 从本地变换开始，沿父索引逐级 `combine(parent.local, accumulated)`。
    /// 最多走 `len` 步，遇到环或越界父索引时截断并告警。
    pub fn global_transform(&self, index: usize) -> Transform {
        let mut result = self.joints[index].local;
        let mut parent = self.joints[index].parent;
        let mut hops = 0;

        while let Some(p) = parent {
            let Some(joint) = self.joints.get(p) else {
                log::warn!("[Pose] 关节 {} 的父索引 {} 越界", index, p);
                break;
            };
            hops += 1;
            if hops > self.joints.len() {
                log::warn!("[Pose] 关节 {} 的父链存在环，已截断", index);
                break;
            }
            result = joint.local.combine(&result);
            parent = joint.parent;
        }

        result
    }

    /// 所有关节的全局变换
    pub fn global_transforms(&self) -> Vec<Transform> {
        (0..self.joints.len()).map(|i| self.global_transform(i)).collect()
    }

    /// 矩阵调色板（每个关节的全局矩阵，供蒙皮使用）
    pub fn matrix_palette(&self) -> Vec<Mat4> {
        let mut out = Vec::with_capacity(self.joints.len());
        self.matrix_palette_into(&mut out);
        out
    }

    /// 写入已有缓冲区，避免每帧分配
    pub fn matrix_palette_into(&self, out: &mut Vec<Mat4>) {
        out.clear();
        out.extend((0..self.joints.len()).map(|i| self.global_transform(i).to_matrix()));
    }

    /// 校验层次结构：父索引在范围内且无环
    pub fn validate_hierarchy(&self) -> Result<()> {
        let len = self.joints.len();
        for (index, joint) in self.joints.iter().enumerate() {
            let mut parent = joint.parent;
            let mut hops = 0;
            while let Some(p) = parent {
                if p >= len {
                    return Err(AnimError::JointOutOfRange { index: p, len });
                }
                hops += 1;
                if hops > len {
                    return Err(AnimError::HierarchyCycle(index));
                }
                parent = self.joints[p].parent;
            }
        }
        Ok(())
    }
}

impl Index<usize> for Pose {
    type Output = Joint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.joints[index]
    }
}

impl IndexMut<usize> for Pose {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.joints[index]
    }
}
