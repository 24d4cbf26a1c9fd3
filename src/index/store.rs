use std::collections::HashMap;

use serde::Serialize;

use crate::feature::{FeatureVector, Level};

/// 图片 ID，与数据库主键一致，跨运行保持稳定
pub type ImageId = i64;

/// 参与匹配的图片信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    /// 图片 ID
    pub id: ImageId,
    /// 相对于图库根目录的路径
    pub path: String,
    /// 宽高比
    pub frame_aspect: f32,
    /// 是否参与匹配
    pub active: bool,
}

/// 特征存储的只读接口
///
/// 一次马赛克任务期间不会有写入，因此实现无需考虑并发写。
pub trait FeatureStore {
    /// 遍历所有图片记录，包括未激活的
    fn images(&self) -> Box<dyn Iterator<Item = &ImageRecord> + '_>;

    /// 查找图片在某一层级的特征，未入库的返回 `None`
    fn feature(&self, id: ImageId, level: Level) -> Option<&FeatureVector>;
}

/// 内存中的特征快照
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    images: Vec<ImageRecord>,
    positions: HashMap<ImageId, usize>,
    features: HashMap<(ImageId, Level), FeatureVector>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加图片记录，ID 重复时覆盖旧记录
    pub fn insert_image(&mut self, record: ImageRecord) {
        match self.positions.get(&record.id) {
            Some(&pos) => self.images[pos] = record,
            None => {
                self.positions.insert(record.id, self.images.len());
                self.images.push(record);
            }
        }
    }

    /// 添加特征，层级由特征向量本身决定
    pub fn insert_feature(&mut self, id: ImageId, feature: FeatureVector) {
        self.features.insert((id, feature.level()), feature);
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageRecord> {
        self.positions.get(&id).map(|&pos| &self.images[pos])
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl FeatureStore for MemoryStore {
    fn images(&self) -> Box<dyn Iterator<Item = &ImageRecord> + '_> {
        Box::new(self.images.iter())
    }

    fn feature(&self, id: ImageId, level: Level) -> Option<&FeatureVector> {
        self.features.get(&(id, level))
    }
}
