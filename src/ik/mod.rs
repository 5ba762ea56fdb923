//! IK 求解
//!
//! 两种迭代求解器共享同一签名：对一条无分支的本地变换链（索引 0 为根，
//! 末尾为末端执行器）求解，使末端到达世界空间目标。
//! - CCD: 逐关节旋转
//! - FABRIK: 在世界位置上前后往返，保持链长

mod ccd;
mod fabrik;
mod leg;

pub use ccd::{ik_ccd, CcdSolver};
pub use fabrik::{ik_fabrik, FabrikSolver};
pub use leg::{rotate_joint_toward, IkLeg};

use glam::Vec3;

use crate::transform::Transform;

/// 求解函数签名：(链, 目标, 迭代次数, 收敛阈值) -> 是否收敛
pub type IkFunction = fn(&mut [Transform], &Transform, u32, f32) -> bool;

/// 求解器类型，运行时可切换
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IkSolverKind {
    #[default]
    Ccd,
    Fabrik,
}

impl IkSolverKind {
    #[inline]
    pub fn function(self) -> IkFunction {
        match self {
            Self::Ccd => ik_ccd,
            Self::Fabrik => ik_fabrik,
        }
    }

    #[inline]
    pub fn solve(self, chain: &mut [Transform], target: &Transform, steps: u32, threshold: f32) -> bool {
        (self.function())(chain, target, steps, threshold)
    }
}

/// 链上第 `index` 个关节的全局变换
pub fn chain_global_transform(chain: &[Transform], index: usize) -> Transform {
    chain[..index]
        .iter()
        .rev()
        .fold(chain[index], |world, parent| parent.combine(&world))
}

/// 链上每个关节的世界位置
pub fn chain_world_positions(chain: &[Transform]) -> Vec<Vec3> {
    let mut world = Transform::IDENTITY;
    chain
        .iter()
        .map(|local| {
            world = world.combine(local);
            world.position
        })
        .collect()
}
