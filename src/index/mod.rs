mod store;

use std::cmp::Ordering;
use std::collections::HashSet;

use log::trace;

pub use self::store::*;
use crate::error::{MosaicError, Result};
use crate::feature::{FeatureVector, Level, point_distance, ranking_distance};

/// 单次查询的参数
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    /// 目标采样，长度必须与查询层级一致
    pub target: &'a FeatureVector,
    /// 目标宽高比
    pub aspect_ratio: f32,
    /// 宽高比允许的误差，严格小于
    pub aspect_tolerance: f32,
    /// 需要排除的图片
    pub exclude: &'a HashSet<ImageId>,
    /// 最多返回的候选数量
    pub limit: usize,
}

/// 查询返回的候选图片，距离为排序距离
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: ImageId,
    pub distance: f32,
}

impl Candidate {
    fn cmp_rank(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.id.cmp(&other.id))
    }
}

/// 基于颜色特征的最近邻索引，每次查询做一次全量扫描
pub struct ColorFeatureIndex<S> {
    store: S,
}

impl<S: FeatureStore> ColorFeatureIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 在指定层级上查找颜色最接近的图片，按排序距离升序返回
    ///
    /// 只考虑已激活、宽高比满足要求且不在排除列表中的图片，
    /// 缺少该层级特征的图片会被跳过。距离相同时按 ID 升序。
    pub fn query(&self, level: u8, query: &Query<'_>) -> Result<Vec<Candidate>> {
        let level = Level::try_from(level)?;
        if query.target.level() != level {
            return Err(MosaicError::DimensionMismatch {
                level: level.into(),
                expected: level.arity(),
                actual: query.target.as_slice().len(),
            });
        }

        let target = query.target.as_slice();
        let mut candidates = self
            .store
            .images()
            .filter(|image| {
                image.active
                    && (image.frame_aspect - query.aspect_ratio).abs() < query.aspect_tolerance
                    && !query.exclude.contains(&image.id)
            })
            .filter_map(|image| {
                let feature = self.store.feature(image.id, level)?;
                Some(Candidate {
                    id: image.id,
                    distance: ranking_distance(feature.as_slice(), target),
                })
            })
            .collect::<Vec<_>>();

        if candidates.len() > query.limit {
            if query.limit > 0 {
                candidates.select_nth_unstable_by(query.limit - 1, Candidate::cmp_rank);
            }
            candidates.truncate(query.limit);
        }
        candidates.sort_unstable_by(Candidate::cmp_rank);

        trace!("层级 {} 查询得到 {} 个候选", level, candidates.len());
        Ok(candidates)
    }

    /// 计算精排距离，图片缺少该层级特征时返回无穷大
    pub fn point_distance(&self, id: ImageId, level: Level, target: &FeatureVector) -> f32 {
        match self.store.feature(id, level) {
            Some(feature) => point_distance(feature, target),
            None => f32::INFINITY,
        }
    }
}
