use sqlx::FromRow;

use crate::index::ImageRecord;

/// 图片记录
#[derive(Debug, Clone, FromRow)]
pub struct ImageRow {
    /// 图片 ID
    pub id: i64,
    /// 相对于图库根目录的路径
    pub path: String,
    /// 图片 blake3 哈希
    pub hash: Vec<u8>,
    /// 文件格式
    pub format: String,
    pub width: i64,
    pub height: i64,
    /// 宽高比
    pub frame_aspect: f64,
    /// 是否参与匹配
    pub active: bool,
    /// 文件修改时间，Unix 秒
    pub orig_timestamp: Option<i64>,
}

impl From<ImageRow> for ImageRecord {
    fn from(row: ImageRow) -> Self {
        ImageRecord {
            id: row.id,
            path: row.path,
            frame_aspect: row.frame_aspect as f32,
            active: row.active,
        }
    }
}

/// 某一层级的颜色特征
#[derive(Debug, Clone, FromRow)]
pub struct FeatureRow {
    pub image_id: i64,
    pub level: i64,
    /// 按本机字节序排列的 f32 序列
    pub vector: Vec<u8>,
}

/// 待写入的图片信息
pub struct NewImage<'a> {
    pub path: &'a str,
    pub hash: &'a [u8],
    pub format: &'a str,
    pub width: i64,
    pub height: i64,
    pub frame_aspect: f64,
    pub orig_timestamp: Option<i64>,
}
