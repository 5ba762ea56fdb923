//! 腿部 IK - 髋 / 膝 / 踝三关节链
//!
//! 每帧从动画姿势构建链（根在模型空间），求解后把结果写回姿势副本，
//! 髋关节重新表达到它在骨骼中的真实父关节下。

use glam::Vec3;

use super::{chain_world_positions, CcdSolver, FabrikSolver, IkSolverKind};
use crate::config::get_config;
use crate::skeleton::{Pose, Skeleton};
use crate::transform::{normalize_quat, rotation_between, Transform};
use crate::{AnimError, Result};

/// 方向判定阈值：当前方向与期望方向的点积需大于此值
const SAME_SIDE_DOT: f32 = 0.00001;

/// 腿部 IK
#[derive(Clone, Debug)]
pub struct IkLeg {
    /// 最近一次求解后的姿势副本
    ik_pose: Pose,

    hip: usize,
    knee: usize,
    ankle: usize,
    toe: usize,

    /// 踝关节离地高度，目标沿 +Y 抬高这么多
    ankle_to_ground_offset: f32,

    ccd: CcdSolver,
    fabrik: FabrikSolver,

    debug_points: Vec<Vec3>,
    debug_lines: Vec<Vec3>,
}

impl IkLeg {
    /// 按名称解析四个关节，找不到的名称回退为关节 0
    pub fn new(skeleton: &Skeleton, hip: &str, knee: &str, ankle: &str, toe: &str) -> Self {
        let resolve = |name: &str| {
            skeleton.joint_index(name).unwrap_or_else(|| {
                log::warn!("[IK] 骨骼中找不到关节 '{}'，使用关节 0", name);
                0
            })
        };
        Self::with_indices(skeleton, resolve(hip), resolve(knee), resolve(ankle), resolve(toe))
    }

    /// 按名称解析四个关节，任一名称不存在时返回错误
    pub fn try_new(skeleton: &Skeleton, hip: &str, knee: &str, ankle: &str, toe: &str) -> Result<Self> {
        let resolve = |name: &str| {
            skeleton
                .joint_index(name)
                .ok_or_else(|| AnimError::JointNotFound(name.to_string()))
        };
        Ok(Self::with_indices(
            skeleton,
            resolve(hip)?,
            resolve(knee)?,
            resolve(ankle)?,
            resolve(toe)?,
        ))
    }

    fn with_indices(skeleton: &Skeleton, hip: usize, knee: usize, ankle: usize, toe: usize) -> Self {
        let mut ccd = CcdSolver::new();
        ccd.resize(3);
        let mut fabrik = FabrikSolver::new();
        fabrik.resize(3);

        Self {
            ik_pose: skeleton.rest_pose().clone(),
            hip,
            knee,
            ankle,
            toe,
            ankle_to_ground_offset: get_config().ankle_to_ground_offset,
            ccd,
            fabrik,
            debug_points: Vec::with_capacity(3),
            debug_lines: Vec::with_capacity(4),
        }
    }

    /// 让踝关节到达 `ankle_target`（世界空间）
    ///
    /// `model` 为角色的模型变换。结果写入 [`adjusted_pose`](Self::adjusted_pose)，
    /// 返回求解器是否收敛；未收敛时仍写入最后一次尝试的结果。
    pub fn solve_for_leg(
        &mut self,
        kind: IkSolverKind,
        model: &Transform,
        pose: &Pose,
        ankle_target: Vec3,
    ) -> bool {
        let len = pose.len();
        if self.hip >= len || self.knee >= len || self.ankle >= len {
            log::warn!(
                "[IK] 腿部关节 ({}, {}, {}) 超出姿势范围 {}",
                self.hip,
                self.knee,
                self.ankle,
                len
            );
            return false;
        }

        let chain = [
            model.combine(&pose.global_transform(self.hip)),
            pose[self.knee].local,
            pose[self.ankle].local,
        ];
        let target = Transform::from_position(ankle_target + Vec3::Y * self.ankle_to_ground_offset);

        let (solved, solved_chain) = match kind {
            IkSolverKind::Ccd => {
                self.ccd.chain_mut().copy_from_slice(&chain);
                (self.ccd.solve(&target), self.ccd.chain())
            }
            IkSolverKind::Fabrik => {
                self.fabrik.chain_mut().copy_from_slice(&chain);
                (self.fabrik.solve(&target), self.fabrik.chain())
            }
        };

        let root_world = match pose.parent(self.hip) {
            Some(parent) => model.combine(&pose.global_transform(parent)),
            None => *model,
        };

        self.ik_pose.clone_from(pose);
        self.ik_pose[self.hip].local = root_world.inverse().combine(&solved_chain[0]);
        self.ik_pose[self.knee].local = solved_chain[1];
        self.ik_pose[self.ankle].local = solved_chain[2];

        let points = chain_world_positions(solved_chain);
        self.debug_points.clear();
        self.debug_points.extend_from_slice(&points);
        self.debug_lines.clear();
        for segment in points.windows(2) {
            self.debug_lines.extend_from_slice(segment);
        }

        solved
    }

    /// 在调整后的姿势上旋转踝关节，使 踝→脚尖 指向 `toe_target`（世界空间）
    ///
    /// 当前方向与期望方向不在同一半空间时不做调整，返回 `false`。
    pub fn align_ankle_to_toe(&mut self, model: &Transform, toe_target: Vec3) -> bool {
        if self.ankle >= self.ik_pose.len() || self.toe >= self.ik_pose.len() {
            return false;
        }
        let ankle_world = model.combine(&self.ik_pose.global_transform(self.ankle)).position;
        let toe_world = model.combine(&self.ik_pose.global_transform(self.toe)).position;

        rotate_joint_toward(
            &mut self.ik_pose,
            model,
            self.ankle,
            toe_world - ankle_world,
            toe_target - ankle_world,
        )
    }

    #[inline]
    pub fn adjusted_pose(&self) -> &Pose {
        &self.ik_pose
    }

    #[inline]
    pub fn hip(&self) -> usize {
        self.hip
    }

    #[inline]
    pub fn knee(&self) -> usize {
        self.knee
    }

    #[inline]
    pub fn ankle(&self) -> usize {
        self.ankle
    }

    #[inline]
    pub fn toe(&self) -> usize {
        self.toe
    }

    #[inline]
    pub fn ankle_offset(&self) -> f32 {
        self.ankle_to_ground_offset
    }

    #[inline]
    pub fn set_ankle_offset(&mut self, offset: f32) {
        self.ankle_to_ground_offset = offset;
    }

    #[inline]
    pub fn steps(&self) -> u32 {
        self.ccd.steps()
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.ccd.threshold()
    }

    /// 同时设置两个求解器的迭代次数
    pub fn set_steps(&mut self, steps: u32) {
        self.ccd.set_steps(steps);
        self.fabrik.set_steps(steps);
    }

    /// 同时设置两个求解器的收敛阈值
    pub fn set_threshold(&mut self, threshold: f32) {
        self.ccd.set_threshold(threshold);
        self.fabrik.set_threshold(threshold);
    }

    /// 求解后链上三个关节的世界位置
    #[inline]
    pub fn debug_points(&self) -> &[Vec3] {
        &self.debug_points
    }

    /// 髋→膝、膝→踝 两段线的端点，成对排列
    #[inline]
    pub fn debug_lines(&self) -> &[Vec3] {
        &self.debug_lines
    }
}

/// 旋转 `joint`，使世界方向 `current` 转到 `desired`
///
/// 增量在世界空间计算后换算到关节本地空间。两个方向的点积不大于
/// 阈值时（夹角接近或超过 90°）不做修改，返回 `false`。
pub fn rotate_joint_toward(
    pose: &mut Pose,
    model: &Transform,
    joint: usize,
    current: Vec3,
    desired: Vec3,
) -> bool {
    if joint >= pose.len() || current.dot(desired) <= SAME_SIDE_DOT {
        return false;
    }

    let world = model.combine(&pose.global_transform(joint));
    let delta = rotation_between(current, desired);
    let local_rotate = world.rotation.inverse() * delta * world.rotation;

    let local = &mut pose[joint].local;
    local.rotation = normalize_quat(local.rotation * local_rotate);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Joint;
    use glam::Quat;

    const NAMES: [&str; 5] = ["pelvis", "hip", "knee", "ankle", "toe"];

    /// 骨盆在 (0, 2, 0)，腿沿 -Y 伸直，每节长 1，脚尖朝 +Z
    fn leg_skeleton() -> Skeleton {
        let pose = Pose::from_joints(vec![
            Joint::new(None, Transform::from_position(Vec3::new(0.0, 2.0, 0.0))),
            Joint::new(Some(0), Transform::from_position(Vec3::new(0.5, 0.0, 0.0))),
            Joint::new(Some(1), Transform::from_position(Vec3::new(0.0, -1.0, 0.0))),
            Joint::new(Some(2), Transform::from_position(Vec3::new(0.0, -1.0, 0.0))),
            Joint::new(Some(3), Transform::from_position(Vec3::new(0.0, 0.0, 0.3))),
        ]);
        let names = NAMES.iter().map(|n| n.to_string()).collect();
        Skeleton::new(pose.clone(), pose, names).unwrap()
    }

    fn leg(skeleton: &Skeleton) -> IkLeg {
        let mut leg = IkLeg::try_new(skeleton, "hip", "knee", "ankle", "toe").unwrap();
        leg.set_steps(50);
        leg.set_threshold(0.001);
        leg
    }

    fn model() -> Transform {
        Transform::new(
            Vec3::new(3.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::ONE,
        )
    }

    #[test]
    fn test_joint_lookup() {
        let skeleton = leg_skeleton();
        let leg = IkLeg::new(&skeleton, "hip", "knee", "ankle", "toe");
        assert_eq!((leg.hip(), leg.knee(), leg.ankle(), leg.toe()), (1, 2, 3, 4));

        let fallback = IkLeg::new(&skeleton, "hip", "shin", "ankle", "toe");
        assert_eq!(fallback.knee(), 0);

        assert_eq!(
            IkLeg::try_new(&skeleton, "hip", "shin", "ankle", "toe").err(),
            Some(AnimError::JointNotFound("shin".to_string()))
        );
    }

    #[test]
    fn test_solve_reaches_target_in_model_space() {
        let skeleton = leg_skeleton();
        let pose = skeleton.rest_pose().clone();

        for kind in [IkSolverKind::Ccd, IkSolverKind::Fabrik] {
            for model in [Transform::IDENTITY, model()] {
                let mut leg = leg(&skeleton);
                let target = model.transform_point(Vec3::new(0.5, 0.5, 0.3));
                assert!(leg.solve_for_leg(kind, &model, &pose, target), "{:?}", kind);

                let adjusted = leg.adjusted_pose();
                let ankle = model.combine(&adjusted.global_transform(3)).position;
                assert!(ankle.distance(target) < 0.0011, "{:?} {:?}", kind, ankle);

                // 骨盆和髋的位置不变，只改旋转
                assert_eq!(adjusted[0], pose[0]);
                assert!(adjusted[1].local.position.abs_diff_eq(pose[1].local.position, 1e-4));
                assert_eq!(adjusted[2].local.position, pose[2].local.position);
            }
        }
    }

    #[test]
    fn test_ankle_offset_raises_target() {
        let skeleton = leg_skeleton();
        let pose = skeleton.rest_pose().clone();
        let mut leg = leg(&skeleton);
        leg.set_ankle_offset(0.2);
        assert_eq!(leg.ankle_offset(), 0.2);

        let target = Vec3::new(0.5, 0.3, 0.3);
        assert!(leg.solve_for_leg(IkSolverKind::Fabrik, &Transform::IDENTITY, &pose, target));
        let ankle = leg.adjusted_pose().global_transform(3).position;
        assert!(ankle.distance(Vec3::new(0.5, 0.5, 0.3)) < 0.0011);
    }

    #[test]
    fn test_debug_geometry() {
        let skeleton = leg_skeleton();
        let pose = skeleton.rest_pose().clone();
        let mut leg = leg(&skeleton);
        assert!(leg.debug_points().is_empty());

        // 目标就在踝上，链不动
        let target = Vec3::new(0.5, 0.0, 0.0);
        assert!(leg.solve_for_leg(IkSolverKind::Ccd, &Transform::IDENTITY, &pose, target));
        let hip = Vec3::new(0.5, 2.0, 0.0);
        let knee = Vec3::new(0.5, 1.0, 0.0);
        let ankle = Vec3::new(0.5, 0.0, 0.0);

        let points = leg.debug_points();
        assert_eq!(points.len(), 3);
        for (p, expected) in points.iter().zip([hip, knee, ankle]) {
            assert!(p.abs_diff_eq(expected, 1e-5));
        }
        let lines = leg.debug_lines();
        assert_eq!(lines.len(), 4);
        for (p, expected) in lines.iter().zip([hip, knee, knee, ankle]) {
            assert!(p.abs_diff_eq(expected, 1e-5));
        }
    }

    #[test]
    fn test_root_hip_uses_model_only() {
        // 髋关节没有父关节
        let pose = Pose::from_joints(vec![
            Joint::new(None, Transform::from_position(Vec3::new(0.0, 2.0, 0.0))),
            Joint::new(Some(0), Transform::from_position(Vec3::new(0.0, -1.0, 0.0))),
            Joint::new(Some(1), Transform::from_position(Vec3::new(0.0, -1.0, 0.0))),
            Joint::new(Some(2), Transform::from_position(Vec3::new(0.0, 0.0, 0.3))),
        ]);
        let names = ["hip", "knee", "ankle", "toe"].iter().map(|n| n.to_string()).collect();
        let skeleton = Skeleton::new(pose.clone(), pose.clone(), names).unwrap();
        let mut leg = leg(&skeleton);

        let model = model();
        let target = model.transform_point(Vec3::new(0.0, 0.5, 0.3));
        assert!(leg.solve_for_leg(IkSolverKind::Fabrik, &model, &pose, target));

        let adjusted = leg.adjusted_pose();
        assert!(adjusted[0].local.position.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-4));
        let ankle = model.combine(&adjusted.global_transform(2)).position;
        assert!(ankle.distance(target) < 0.0011);
    }

    #[test]
    fn test_out_of_range_joints_are_rejected() {
        let skeleton = leg_skeleton();
        let mut leg = leg(&skeleton);
        let short = Pose::with_len(2);
        assert!(!leg.solve_for_leg(IkSolverKind::Ccd, &Transform::IDENTITY, &short, Vec3::ZERO));
        assert_eq!(leg.adjusted_pose(), skeleton.rest_pose());
    }

    #[test]
    fn test_align_ankle_to_toe() {
        let skeleton = leg_skeleton();
        let pose = skeleton.rest_pose().clone();
        let mut leg = leg(&skeleton);
        let model = model();
        let ankle_target = model.transform_point(Vec3::new(0.5, 0.0, 0.0));
        assert!(leg.solve_for_leg(IkSolverKind::Ccd, &model, &pose, ankle_target));

        // 脚尖朝下，点积为 0，不调整
        let before = leg.adjusted_pose().clone();
        let below = model.transform_point(Vec3::new(0.5, -0.3, 0.0));
        assert!(!leg.align_ankle_to_toe(&model, below));
        assert_eq!(leg.adjusted_pose(), &before);

        // 脚尖向上翘
        let raised = model.transform_point(Vec3::new(0.5, 0.1, 0.3));
        assert!(leg.align_ankle_to_toe(&model, raised));

        let adjusted = leg.adjusted_pose();
        let ankle = model.combine(&adjusted.global_transform(3)).position;
        let toe = model.combine(&adjusted.global_transform(4)).position;
        assert!(ankle.abs_diff_eq(ankle_target, 1e-4));
        assert!((toe - ankle).normalize().dot((raised - ankle).normalize()) > 0.9999);
        assert!((toe.distance(ankle) - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_rotate_joint_toward_local_space() {
        let mut pose = Pose::from_joints(vec![
            Joint::new(None, Transform::new(Vec3::ZERO, Quat::from_rotation_z(0.4), Vec3::ONE)),
            Joint::new(Some(0), Transform::from_position(Vec3::X)),
            Joint::new(Some(1), Transform::from_position(Vec3::X)),
        ]);
        let joint_pos = pose.global_transform(1).position;
        let current = pose.global_transform(2).position - joint_pos;
        let desired = Vec3::new(0.3, 1.0, 0.2);

        assert!(rotate_joint_toward(&mut pose, &Transform::IDENTITY, 1, current, desired));
        let child = pose.global_transform(2).position - pose.global_transform(1).position;
        assert!(child.normalize().abs_diff_eq(desired.normalize(), 1e-5));
        assert!(!rotate_joint_toward(&mut pose, &Transform::IDENTITY, 9, current, desired));
    }
}
