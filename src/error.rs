use thiserror::Error;

/// 马赛克核心的错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MosaicError {
    /// 不支持的采样层级，只允许 0、1、2
    #[error("不支持的采样层级: {0}")]
    InvalidLevel(u8),
    /// 特征向量长度与层级不匹配
    #[error("层级 {level} 需要 {expected} 个分量，实际为 {actual}")]
    DimensionMismatch { level: u8, expected: usize, actual: usize },
    /// 某个图块找不到任何候选图片，整个任务失败
    #[error("图块 ({x}, {y}) 找不到候选图片")]
    NoCandidateFound { x: u32, y: u32 },
    /// 任务参数无效
    #[error("无效的参数 {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },
    /// 任务被取消
    #[error("任务已取消")]
    Cancelled,
    /// 任务状态不允许该操作
    #[error("任务状态错误: {0}")]
    InvalidState(&'static str),
}

pub type Result<T, E = MosaicError> = std::result::Result<T, E>;
