//! 动画 / IK 全局配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 动画配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct AnimConfig {
    // ========== IK 求解 ==========
    /// 每次求解的最大迭代次数，默认 15
    pub ik_steps: u32,
    /// 末端到目标的收敛距离，默认 0.00001
    pub ik_threshold: f32,
    /// CCD 中关节到目标向量长度平方的下限，低于此值跳过该关节
    pub ccd_min_goal_distance_sq: f32,

    // ========== 腿部 ==========
    /// 新建 IkLeg 时的脚踝离地偏移，默认 0.0
    pub ankle_to_ground_offset: f32,

    // ========== 调试 ==========
    /// 是否输出求解调试日志，默认 false
    pub debug_log: bool,
}

impl Default for AnimConfig {
    fn default() -> Self {
        Self {
            // ====== IK 求解 ======
            // 迭代次数越大越精确，但每帧开销越大
            ik_steps: 15,
            ik_threshold: 0.00001,
            ccd_min_goal_distance_sq: 0.00001,

            // ====== 腿部 ======
            // 脚踝并不贴地，需要把偏移计入目标点
            ankle_to_ground_offset: 0.0,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

/// 全局配置实例
static ANIM_CONFIG: Lazy<RwLock<AnimConfig>> = Lazy::new(|| RwLock::new(AnimConfig::default()));

/// 获取当前配置（只读）
pub fn get_config() -> AnimConfig {
    ANIM_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: AnimConfig) {
    *ANIM_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *ANIM_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = AnimConfig::default();
}
