use crate::feature::{FeatureVector, Level};
use crate::index::{Candidate, ColorFeatureIndex, FeatureStore, ImageId};

/// 融合后的候选项，距离为精排距离
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedCandidate {
    pub id: ImageId,
    pub level: Level,
    pub distance: f32,
}

/// 将三个层级的查询结果合并为一个有序列表
///
/// 每个 `(图片, 层级)` 都用精排距离重新打分，按 `(距离, 层级, ID)` 升序排列。
/// 同一张图片在多个层级出现时会保留多条记录，去重由调用方负责。
pub fn fuse<S: FeatureStore>(
    index: &ColorFeatureIndex<S>,
    results: &[Vec<Candidate>; 3],
    targets: &[FeatureVector; 3],
) -> Vec<FusedCandidate> {
    let mut fused = Level::ALL
        .iter()
        .flat_map(|&level| {
            let target = &targets[level.index()];
            results[level.index()].iter().map(move |candidate| FusedCandidate {
                id: candidate.id,
                level,
                distance: index.point_distance(candidate.id, level, target),
            })
        })
        .collect::<Vec<_>>();

    fused.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.level.cmp(&b.level))
            .then(a.id.cmp(&b.id))
    });
    fused
}
