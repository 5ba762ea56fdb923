//! 变换 - 位置 / 旋转 / 缩放三元组
//!
//! 组合、求逆、插值，以及退化输入的保护性辅助函数。

use glam::{Mat4, Quat, Vec3};

/// 向量退化判定阈值（长度平方）
pub const VEC3_EPSILON: f32 = 0.000001;
/// 四元数退化判定阈值（长度平方）
pub const QUAT_EPSILON: f32 = 0.000001;
/// 矩阵行列式退化判定阈值
pub const MAT4_EPSILON: f32 = 0.000001;

/// 骨骼变换数据
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// 仅平移的变换
    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    /// 组合：把 `child` 表达到 `self`（父）所在的空间
    ///
    /// - 缩放逐分量相乘
    /// - 旋转 = 父旋转 * 子旋转（先应用子旋转）
    /// - 位置 = 父位置 + 父旋转 * (父缩放 * 子位置)
    pub fn combine(&self, child: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale * child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale * child.scale,
        }
    }

    /// 求逆，接近零的缩放分量求逆为零
    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();
        let inv = |s: f32| if s.abs() < VEC3_EPSILON { 0.0 } else { 1.0 / s };
        let scale = Vec3::new(inv(self.scale.x), inv(self.scale.y), inv(self.scale.z));
        let position = rotation * (scale * -self.position);

        Transform { position, rotation, scale }
    }

    /// 线性混合，旋转走最短路径的 nlerp
    pub fn mix(&self, other: &Transform, t: f32) -> Transform {
        let mut to_rotation = other.rotation;
        if self.rotation.dot(to_rotation) < 0.0 {
            to_rotation = -to_rotation;
        }
        let rotation = normalize_quat(self.rotation + (to_rotation - self.rotation) * t);

        Transform {
            position: self.position.lerp(other.position, t),
            rotation,
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// 变换点（含平移）
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    /// 变换方向（不含平移）
    #[inline]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * (self.scale * vector)
    }

    /// 转换为 4x4 矩阵
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// 从矩阵分解
    #[inline]
    pub fn from_matrix(m: Mat4) -> Self {
        let (scale, rotation, position) = m.to_scale_rotation_translation();
        Self { position, rotation, scale }
    }

    /// 近似相等（四元数 q 与 -q 视为同一旋转）
    pub fn abs_diff_eq(&self, other: &Transform, max_abs_diff: f32) -> bool {
        let rotation_eq = self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
            || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff);
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && rotation_eq
            && self.scale.abs_diff_eq(other.scale, max_abs_diff)
    }
}

/// 归一化四元数，长度接近零时返回单位旋转
pub fn normalize_quat(q: Quat) -> Quat {
    let len_sq = q.length_squared();
    if len_sq < QUAT_EPSILON {
        log::warn!("[Transform] 四元数长度接近零，回退为单位旋转: {:?}", q);
        return Quat::IDENTITY;
    }
    q * len_sq.sqrt().recip()
}

/// 归一化向量，长度接近零时原样返回
#[inline]
pub fn normalize_vec3(v: Vec3) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq < VEC3_EPSILON {
        return v;
    }
    v * len_sq.sqrt().recip()
}

/// 把方向 `from` 转到方向 `to` 的最短弧旋转
pub fn rotation_between(from: Vec3, to: Vec3) -> Quat {
    if from.length_squared() < VEC3_EPSILON || to.length_squared() < VEC3_EPSILON {
        log::warn!("[Transform] 旋转方向长度接近零，回退为单位旋转");
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(from.normalize(), to.normalize())
}
