use std::fmt;

use serde::Serialize;

use crate::error::{MosaicError, Result};

/// 颜色采样层级，对应 1x1、2x2、4x4 的采样网格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub enum Level {
    L0 = 0,
    L1 = 1,
    L2 = 2,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::L0, Level::L1, Level::L2];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// 每个方向上的采样数
    pub const fn grid(self) -> u32 {
        1 << (self as u32)
    }

    /// 采样点数量
    pub const fn samples(self) -> usize {
        1 << (2 * self as usize)
    }

    /// 特征向量长度，每个采样点为 RGB 三个分量
    pub const fn arity(self) -> usize {
        3 * self.samples()
    }
}

impl TryFrom<u8> for Level {
    type Error = MosaicError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Level::L0),
            1 => Ok(Level::L1),
            2 => Ok(Level::L2),
            _ => Err(MosaicError::InvalidLevel(value)),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level as u8
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// 某一层级上的 RGB 采样值，按行优先顺序排列
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    level: Level,
    values: Vec<f32>,
}

impl FeatureVector {
    /// 创建特征向量，长度必须等于该层级的 `arity`
    pub fn for_level(level: Level, values: Vec<f32>) -> Result<Self> {
        if values.len() != level.arity() {
            return Err(MosaicError::DimensionMismatch {
                level: level.into(),
                expected: level.arity(),
                actual: values.len(),
            });
        }
        Ok(Self { level, values })
    }

    /// 从数据库中的字节序列还原，字节序与本机一致
    pub fn from_bytes(level: Level, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(MosaicError::DimensionMismatch {
                level: level.into(),
                expected: level.arity(),
                actual: bytes.len() / 4,
            });
        }
        // 数据库中的字节不保证 4 字节对齐
        let values = bytes.chunks_exact(4).map(bytemuck::pod_read_unaligned::<f32>).collect();
        Self::for_level(level, values)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.values).to_vec()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// 按顺序返回每个采样点的 `[r, g, b]`
    pub fn samples(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.values.chunks_exact(3).map(|rgb| [rgb[0], rgb[1], rgb[2]])
    }
}

/// 排序距离：展平后的平方欧氏距离
pub fn ranking_distance(stored: &[f32], target: &[f32]) -> f32 {
    stored.iter().zip(target).map(|(s, t)| (s - t).powi(2)).sum()
}

/// 精排距离：先按通道累加有符号差值，再取模长并除以采样点数量
///
/// 注意这是"平均差值的模长"，不是"各采样点距离的平均值"，
/// 正负差值会相互抵消。
pub fn point_distance(stored: &FeatureVector, target: &FeatureVector) -> f32 {
    let mut acc = [0f32; 3];
    let mut count = 0usize;
    for (s, t) in stored.samples().zip(target.samples()) {
        for c in 0..3 {
            acc[c] += s[c] - t[c];
        }
        count += 1;
    }
    if count == 0 {
        return f32::INFINITY;
    }
    acc.iter().map(|v| v * v).sum::<f32>().sqrt() / count as f32
}
