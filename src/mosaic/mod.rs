mod assigner;
mod history;
mod plan;

use serde::Serialize;

pub use self::assigner::*;
pub use self::history::*;
pub use self::plan::*;
use crate::error::{MosaicError, Result};
use crate::feature::{FeatureVector, Level};

/// 默认每层查询数量，仅在不使用重复窗口时生效
pub const DEFAULT_IMAGE_QUERY_LIMIT: usize = 16;
/// 默认宽高比误差
pub const DEFAULT_ASPECT_TOLERANCE: f32 = 0.1;

/// 目标图片的采样接口
pub trait TileSampler {
    /// 目标图片的宽高比
    fn frame_aspect(&self) -> f32;

    /// 图块 `(x, y)` 在 `level` 层级上的采样，网格为 `grid x grid`
    fn tile_sample(&self, x: u32, y: u32, grid: u32, level: Level) -> Result<FeatureVector>;
}

/// 马赛克任务参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MosaicConfig {
    /// 每边的图块数量
    pub grid: u32,
    /// 最近使用的多少张图片不参与查询，0 表示关闭
    pub repeat_window: usize,
    /// 每层查询的候选数量，`repeat_window > 0` 时固定为 1
    pub image_query_limit: usize,
    /// 宽高比允许的误差
    pub aspect_tolerance: f32,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            grid: 16,
            repeat_window: 0,
            image_query_limit: DEFAULT_IMAGE_QUERY_LIMIT,
            aspect_tolerance: DEFAULT_ASPECT_TOLERANCE,
        }
    }
}

impl MosaicConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid == 0 {
            return Err(MosaicError::InvalidConfig {
                name: "grid",
                reason: "必须大于 0".to_owned(),
            });
        }
        if self.image_query_limit == 0 {
            return Err(MosaicError::InvalidConfig {
                name: "image_query_limit",
                reason: "必须大于 0".to_owned(),
            });
        }
        if !(self.aspect_tolerance.is_finite() && self.aspect_tolerance > 0.0) {
            return Err(MosaicError::InvalidConfig {
                name: "aspect_tolerance",
                reason: format!("必须为正数，实际为 {}", self.aspect_tolerance),
            });
        }
        Ok(())
    }

    /// 实际使用的每层查询数量
    pub fn query_limit(&self) -> usize {
        if self.repeat_window > 0 { 1 } else { self.image_query_limit }
    }
}
