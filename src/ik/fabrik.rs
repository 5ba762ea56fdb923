//! FABRIK 求解器 - 前后往返到达
//!
//! 在世界位置缓冲上交替执行反向（从目标）和正向（从基座）两遍，
//! 每遍都按固定链长重新放置关节，最后把世界位置换算回本地旋转。

use std::ops::{Index, IndexMut};

use glam::Vec3;

use super::chain_global_transform;
use crate::config::get_config;
use crate::transform::{normalize_quat, normalize_vec3, rotation_between, Transform};

/// 链转世界位置，同时记录每段链长（`lengths[0]` 恒为 0）
fn chain_to_world(chain: &[Transform], world: &mut [Vec3], lengths: &mut [f32]) {
    for i in 0..chain.len() {
        world[i] = chain_global_transform(chain, i).position;
        lengths[i] = if i == 0 { 0.0 } else { world[i].distance(world[i - 1]) };
    }
}

/// 把世界位置换算回本地旋转，只修改旋转，不修改平移
fn world_to_chain(chain: &mut [Transform], world: &[Vec3]) {
    for i in 0..chain.len().saturating_sub(1) {
        let current = chain_global_transform(chain, i);
        let next = chain_global_transform(chain, i + 1).position;
        let inverse_rotation = current.rotation.inverse();

        let to_next = inverse_rotation * (next - current.position);
        let to_desired = inverse_rotation * (world[i + 1] - current.position);

        let delta = rotation_between(to_next, to_desired);
        chain[i].rotation = normalize_quat(chain[i].rotation * delta);
    }
}

/// 反向：末端放到目标，向根逐个按链长回拉
fn iterate_backward(world: &mut [Vec3], lengths: &[f32], goal: Vec3) {
    let Some(last) = world.len().checked_sub(1) else {
        return;
    };
    world[last] = goal;

    for i in (0..last).rev() {
        let direction = normalize_vec3(world[i] - world[i + 1]);
        world[i] = world[i + 1] + direction * lengths[i + 1];
    }
}

/// 正向：根放回基座，向末端逐个按链长前推
fn iterate_forward(world: &mut [Vec3], lengths: &[f32], base: Vec3) {
    if world.is_empty() {
        return;
    }
    world[0] = base;

    for i in 1..world.len() {
        let direction = normalize_vec3(world[i] - world[i - 1]);
        world[i] = world[i - 1] + direction * lengths[i];
    }
}

/// 使用调用方提供的缓冲求解，缓冲长度必须与链相同
fn solve_with_buffers(
    chain: &mut [Transform],
    world: &mut [Vec3],
    lengths: &mut [f32],
    target: &Transform,
    steps: u32,
    threshold: f32,
) -> bool {
    let size = chain.len();
    if size == 0 {
        return false;
    }

    let debug = get_config().debug_log;
    let last = size - 1;
    let threshold_sq = threshold * threshold;
    let goal = target.position;

    chain_to_world(chain, world, lengths);
    let base = world[0];

    for step in 0..steps {
        if goal.distance_squared(world[last]) < threshold_sq {
            world_to_chain(chain, world);
            if debug {
                log::debug!("[IK] FABRIK 第 {} 次迭代收敛", step);
            }
            return true;
        }

        iterate_backward(world, lengths, goal);
        iterate_forward(world, lengths, base);
    }

    // 失败时也要让本地旋转反映最后一次世界位置
    world_to_chain(chain, world);
    let distance_sq = goal.distance_squared(chain_global_transform(chain, last).position);
    let converged = distance_sq < threshold_sq;

    if debug {
        log::debug!(
            "[IK] FABRIK {} 次迭代后{}，剩余距离 {}",
            steps,
            if converged { "收敛" } else { "未收敛" },
            distance_sq.sqrt()
        );
    }
    converged
}

/// 对本地变换链执行 FABRIK 求解
///
/// 只使用目标的位置。每次调用都分配临时的世界位置与链长缓冲，
/// 需要复用缓冲时使用 [`FabrikSolver`]。
pub fn ik_fabrik(chain: &mut [Transform], target: &Transform, steps: u32, threshold: f32) -> bool {
    let mut world = vec![Vec3::ZERO; chain.len()];
    let mut lengths = vec![0.0; chain.len()];
    solve_with_buffers(chain, &mut world, &mut lengths, target, steps, threshold)
}

/// 持有链和工作缓冲的 FABRIK 求解器
#[derive(Clone, Debug, PartialEq)]
pub struct FabrikSolver {
    chain: Vec<Transform>,
    world_chain: Vec<Vec3>,
    lengths: Vec<f32>,
    steps: u32,
    threshold: f32,
}

impl Default for FabrikSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FabrikSolver {
    /// 空链，迭代次数与阈值取自全局配置
    pub fn new() -> Self {
        let config = get_config();
        Self {
            chain: Vec::new(),
            world_chain: Vec::new(),
            lengths: Vec::new(),
            steps: config.ik_steps,
            threshold: config.ik_threshold,
        }
    }

    pub fn with_chain(chain: Vec<Transform>) -> Self {
        let mut solver = Self::new();
        solver.world_chain = vec![Vec3::ZERO; chain.len()];
        solver.lengths = vec![0.0; chain.len()];
        solver.chain = chain;
        solver
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// 链与两个工作缓冲一起调整长度
    pub fn resize(&mut self, size: usize) {
        self.chain.resize(size, Transform::IDENTITY);
        self.world_chain.resize(size, Vec3::ZERO);
        self.lengths.resize(size, 0.0);
    }

    #[inline]
    pub fn chain(&self) -> &[Transform] {
        &self.chain
    }

    #[inline]
    pub fn chain_mut(&mut self) -> &mut [Transform] {
        &mut self.chain
    }

    /// 上一次求解结束时的世界位置
    #[inline]
    pub fn world_chain(&self) -> &[Vec3] {
        &self.world_chain
    }

    /// 上一次求解使用的链长
    #[inline]
    pub fn lengths(&self) -> &[f32] {
        &self.lengths
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
        solve_with_buffers(
            &mut self.chain,
            &mut self.world_chain,
            &mut self.lengths,
            target,
            self.steps,
            self.threshold,
        )
    }
}

impl Index<usize> for FabrikSolver {
    type Output = Transform;

    fn index(&self, index: usize) -> &Self::Output {
        &self.chain[index]
    }
}

impl IndexMut<usize> for FabrikSolver {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.chain[index]
    }
}
