use std::collections::HashMap;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::config::ConfDir;
use crate::db::{self, Database, ImageRow, NewImage, crud};
use crate::feature::{FeatureVector, Level};
use crate::index::{ColorFeatureIndex, ImageId, ImageRecord, MemoryStore};
use crate::sampler::ImageInfo;

pub struct MosaicDBBuilder {
    conf_dir: ConfDir,
    wal: bool,
}

impl MosaicDBBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self { conf_dir, wal: true }
    }

    /// 是否使用 WAL 模式，默认开启
    pub fn wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    pub async fn open(self) -> Result<MosaicDB> {
        if !self.conf_dir.path().exists() {
            std::fs::create_dir_all(self.conf_dir.path())?;
        }
        let db = db::init_db(self.conf_dir.database(), self.wal).await?;
        Ok(MosaicDB { db })
    }
}

/// 数据库统计
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Stats {
    pub images: i64,
    pub active: i64,
    /// 三个层级特征均已入库的图片
    pub complete: i64,
}

pub struct MosaicDB {
    db: Database,
}

impl MosaicDB {
    /// 检查图片哈希是否已存在
    pub async fn check_hash(&self, hash: &[u8]) -> Result<bool> {
        Ok(crud::check_image_hash(&self.db, hash).await?)
    }

    /// 更新图片路径
    pub async fn update_image_path(&self, hash: &[u8], path: &str) -> Result<()> {
        Ok(crud::update_image_path(&self.db, hash, path).await?)
    }

    /// 添加图片记录和三个层级的特征，返回图片 ID
    ///
    /// # Arguments
    ///
    /// * `path` - 相对于图库根目录的路径
    /// * `info` - 图片信息与特征
    /// * `orig_timestamp` - 文件修改时间
    pub async fn add_image(
        &self,
        path: &str,
        info: &ImageInfo,
        orig_timestamp: Option<i64>,
    ) -> Result<ImageId> {
        let mut tx = self.db.begin().await?;
        let id = crud::upsert_image(
            &mut *tx,
            &NewImage {
                path,
                hash: &info.hash,
                format: &info.format,
                width: info.width as i64,
                height: info.height as i64,
                frame_aspect: info.frame_aspect as f64,
                orig_timestamp,
            },
        )
        .await?;
        for feature in &info.features {
            crud::store_feature(&mut *tx, id, feature.level().into(), &feature.to_bytes()).await?;
        }
        tx.commit().await?;
        Ok(id)
    }

    /// 将数据库中的记录与特征一次性加载到内存，构建索引
    pub async fn load_index(&self) -> Result<ColorFeatureIndex<MemoryStore>> {
        let mut store = MemoryStore::new();
        for row in crud::get_images(&self.db).await? {
            store.insert_image(ImageRecord::from(row));
        }

        let features = crud::get_active_features(&self.db).await?;
        let total = features.len();
        for row in features {
            let level = Level::try_from(row.level as u8)
                .with_context(|| format!("图片 {} 的特征层级无效", row.image_id))?;
            let vector = FeatureVector::from_bytes(level, &row.vector)
                .with_context(|| format!("图片 {} 的 {} 级特征已损坏", row.image_id, level))?;
            store.insert_feature(row.image_id, vector);
        }

        info!("已加载 {} 张图片，{} 条特征", store.len(), total);
        Ok(ColorFeatureIndex::new(store))
    }

    /// 查询一组图片的路径
    pub async fn image_paths(&self, ids: &[ImageId]) -> Result<HashMap<ImageId, String>> {
        let mut paths = HashMap::new();
        for &id in ids {
            if paths.contains_key(&id) {
                continue;
            }
            let path = crud::get_image_path(&self.db, id).await?;
            debug!("图片 {} => {}", id, path);
            paths.insert(id, path);
        }
        Ok(paths)
    }

    pub async fn images(&self) -> Result<Vec<ImageRow>> {
        Ok(crud::get_images(&self.db).await?)
    }

    pub async fn set_active(&self, id: ImageId, active: bool) -> Result<()> {
        Ok(crud::set_active(&self.db, id, active).await?)
    }

    pub async fn delete_image(&self, id: ImageId) -> Result<()> {
        Ok(crud::delete_image(&self.db, id).await?)
    }

    pub async fn stats(&self) -> Result<Stats> {
        let (images, active, complete) = crud::get_count(&self.db).await?;
        Ok(Stats { images, active, complete })
    }
}
