//! CCD 求解器 - 循环坐标下降
//!
//! 从末端前一个关节向根逐个旋转，使 关节→末端 对准 关节→目标。

use std::ops::{Index, IndexMut};

use glam::Quat;

use super::chain_global_transform;
use crate::config::get_config;
use crate::transform::{normalize_quat, rotation_between, Transform};

/// 对本地变换链执行 CCD 求解
///
/// 只使用目标的位置。迭代耗尽仍未收敛时返回 `false`，链保持最后一次尝试的状态。
pub fn ik_ccd(chain: &mut [Transform], target: &Transform, steps: u32, threshold: f32) -> bool {
    let size = chain.len();
    if size == 0 {
        return false;
    }

    let config = get_config();
    let last = size - 1;
    let threshold_sq = threshold * threshold;
    let goal = target.position;

    for step in 0..steps {
        let effector = chain_global_transform(chain, last).position;
        if goal.distance_squared(effector) < threshold_sq {
            if config.debug_log {
                log::debug!("[IK] CCD 第 {} 次迭代收敛", step);
            }
            return true;
        }

        for j in (0..last).rev() {
            let effector = chain_global_transform(chain, last).position;
            let world = chain_global_transform(chain, j);

            let to_effector = effector - world.position;
            let to_goal = goal - world.position;
            let effector_to_goal = if to_goal.length_squared() > config.ccd_min_goal_distance_sq {
                rotation_between(to_effector, to_goal)
            } else {
                Quat::IDENTITY
            };

            // 世界空间的增量旋转换算到关节本地空间
            // inverse() 按单位四元数取共轭，结果需重新归一化，否则误差逐步累积
            let local_rotate = world.rotation.inverse() * effector_to_goal * world.rotation;
            chain[j].rotation = normalize_quat(chain[j].rotation * local_rotate);

            let effector = chain_global_transform(chain, last).position;
            if goal.distance_squared(effector) < threshold_sq {
                if config.debug_log {
                    log::debug!("[IK] CCD 第 {} 次迭代在关节 {} 收敛", step, j);
                }
                return true;
            }
        }
    }

    if config.debug_log {
        let effector = chain_global_transform(chain, last).position;
        log::debug!(
            "[IK] CCD {} 次迭代未收敛，剩余距离 {}",
            steps,
            goal.distance(effector)
        );
    }
    false
}

/// 持有链的 CCD 求解器
#[derive(Clone, Debug, PartialEq)]
pub struct CcdSolver {
    chain: Vec<Transform>,
    steps: u32,
    threshold: f32,
}

impl Default for CcdSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CcdSolver {
    /// 空链，迭代次数与阈值取自全局配置
    pub fn new() -> Self {
        let config = get_config();
        Self {
            chain: Vec::new(),
            steps: config.ik_steps,
            threshold: config.ik_threshold,
        }
    }

    pub fn with_chain(chain: Vec<Transform>) -> Self {
        Self { chain, ..Self::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn resize(&mut self, size: usize) {
        self.chain.resize(size, Transform::IDENTITY);
    }

    #[inline]
    pub fn chain(&self) -> &[Transform] {
        &self.chain
    }

    #[inline]
    pub fn chain_mut(&mut self) -> &mut [Transform] {
        &mut self.chain
    }

    #[inline]
    pub fn global_transform(&self, index: usize) -> Transform {
        chain_global_transform(&self.chain, index)
    }

    #[inline]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    #[inline]
    pub fn set_steps(&mut self, steps: u32) {
        self.steps = steps;
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[inline]
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn solve(&mut self, target: &Transform) -> bool {
        ik_ccd(&mut self.chain, target, self.steps, self.threshold)
    }
}

impl Index<usize> for CcdSolver {
    type Output = Transform;

    fn index(&self, index: usize) -> &Self::Output {
        &self.chain[index]
    }
}

impl IndexMut<usize> for CcdSolver {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.chain[index]
    }
}
