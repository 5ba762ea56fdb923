//! 射线与三角形求交，用于脚部贴地时探测地面高度

use glam::Vec3;

use crate::transform::normalize_vec3;

/// Möller–Trumbore 的退化阈值
const RAYCAST_EPSILON: f32 = 0.0000001;

/// 射线，方向默认竖直向下
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Default for Ray {
    fn default() -> Self {
        Self::down(Vec3::ZERO)
    }
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// 从 `origin` 竖直向下
    #[inline]
    pub fn down(origin: Vec3) -> Self {
        Self {
            origin,
            direction: Vec3::NEG_Y,
        }
    }
}

/// 三角形，法线在构造时计算
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub normal: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            v0,
            v1,
            v2,
            normal: normalize_vec3((v1 - v0).cross(v2 - v0)),
        }
    }
}

/// 射线与三角形求交，只返回射线正方向上的交点
pub fn raycast_triangle(ray: &Ray, triangle: &Triangle) -> Option<Vec3> {
    let edge1 = triangle.v1 - triangle.v0;
    let edge2 = triangle.v2 - triangle.v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    // 射线与三角形平行
    if a.abs() < RAYCAST_EPSILON {
        return None;
    }

    let f = a.recip();
    let s = ray.origin - triangle.v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > RAYCAST_EPSILON).then(|| ray.origin + ray.direction * t)
}

/// 把网格顶点组装成三角形
///
/// `indices` 为空时按顶点顺序每三个一组；不足三个的尾部被忽略。
pub fn triangles_from_mesh(positions: &[Vec3], indices: &[u32]) -> Vec<Triangle> {
    if indices.is_empty() {
        return positions
            .chunks_exact(3)
            .map(|v| Triangle::new(v[0], v[1], v[2]))
            .collect();
    }

    let vertex = |i: u32| positions.get(i as usize).copied();
    indices
        .chunks_exact(3)
        .filter_map(|tri| match (vertex(tri[0]), vertex(tri[1]), vertex(tri[2])) {
            (Some(v0), Some(v1), Some(v2)) => Some(Triangle::new(v0, v1, v2)),
            _ => {
                log::warn!("[Intersections] 三角形索引 {:?} 超出顶点范围 {}", tri, positions.len());
                None
            }
        })
        .collect()
}

/// 射线与一组三角形求交，返回离射线起点最近的交点
pub fn raycast_triangles(ray: &Ray, triangles: &[Triangle]) -> Option<Vec3> {
    triangles
        .iter()
        .filter_map(|triangle| raycast_triangle(ray, triangle))
        .min_by(|a, b| {
            let da = a.distance_squared(ray.origin);
            let db = b.distance_squared(ray.origin);
            da.total_cmp(&db)
        })
}
