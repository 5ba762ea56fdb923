//! 骨骼系统
//!
//! - Pose: 关节数组 + 父索引，负责本地 / 全局变换
//! - Skeleton: 静态层次，持有静止姿势、绑定姿势与逆绑定矩阵

mod pose;

pub use pose::{Joint, Pose};

use glam::Mat4;

use crate::transform::MAT4_EPSILON;
use crate::{AnimError, Result};

/// 骨骼
///
/// 构造后不可变，逆绑定矩阵可在任意多个姿势之间只读共享。
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    rest_pose: Pose,
    bind_pose: Pose,
    /// `inverse_bind_pose[i]` = 绑定姿势中关节 i 世界矩阵的逆
    inverse_bind_pose: Vec<Mat4>,
    joint_names: Vec<String>,
}

impl Skeleton {
    /// 创建骨骼并预计算逆绑定矩阵
    pub fn new(rest_pose: Pose, bind_pose: Pose, joint_names: Vec<String>) -> Result<Self> {
        if bind_pose.len() != rest_pose.len() {
            return Err(AnimError::SizeMismatch {
                what: "bind pose",
                expected: rest_pose.len(),
                actual: bind_pose.len(),
            });
        }
        if joint_names.len() != rest_pose.len() {
            return Err(AnimError::SizeMismatch {
                what: "joint names",
                expected: rest_pose.len(),
                actual: joint_names.len(),
            });
        }
        rest_pose.validate_hierarchy()?;
        bind_pose.validate_hierarchy()?;

        let inverse_bind_pose = (0..bind_pose.len())
            .map(|i| {
                let world = bind_pose.global_transform(i).to_matrix();
                if world.determinant().abs() < MAT4_EPSILON {
                    log::warn!(
                        "[Skeleton] 关节 '{}' 的绑定矩阵不可逆，使用单位矩阵",
                        joint_names[i]
                    );
                    Mat4::IDENTITY
                } else {
                    world.inverse()
                }
            })
            .collect();

        Ok(Self {
            rest_pose,
            bind_pose,
            inverse_bind_pose,
            joint_names,
        })
    }

    #[inline]
    pub fn rest_pose(&self) -> &Pose {
        &self.rest_pose
    }

    #[inline]
    pub fn bind_pose(&self) -> &Pose {
        &self.bind_pose
    }

    #[inline]
    pub fn inverse_bind_pose(&self) -> &[Mat4] {
        &self.inverse_bind_pose
    }

    #[inline]
    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    #[inline]
    pub fn joint_name(&self, index: usize) -> Option<&str> {
        self.joint_names.get(index).map(String::as_str)
    }

    /// 按名称查找关节索引
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joint_names.iter().position(|n| n == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.joint_names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joint_names.is_empty()
    }

    /// 蒙皮矩阵 = 全局矩阵 * 逆绑定矩阵
    pub fn skin_palette(&self, pose: &Pose) -> Vec<Mat4> {
        pose.matrix_palette()
            .into_iter()
            .zip(&self.inverse_bind_pose)
            .map(|(world, inverse_bind)| world * *inverse_bind)
            .collect()
    }
}
