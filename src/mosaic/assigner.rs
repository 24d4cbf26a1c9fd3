use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use super::{MosaicConfig, MosaicPlan, TileSampler, UsageHistory, raster_order};
use crate::error::{MosaicError, Result};
use crate::feature::{FeatureVector, Level};
use crate::index::{ColorFeatureIndex, FeatureStore, ImageId, Query};
use crate::ranker::{FusedCandidate, fuse};

/// 并行预计算时每批处理的图块数量
const PREFETCH_TILES: usize = 256;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Done,
    Failed,
}

/// 所有候选都已用过时，被迫重复使用图片的记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReuseEvent {
    pub x: u32,
    pub y: u32,
    /// 从 1 开始的图块序号
    pub sequence: u64,
    pub image_id: ImageId,
}

/// 一次任务的结果
#[derive(Debug, Clone)]
pub struct Assignment {
    pub plan: MosaicPlan,
    pub reused: Vec<ReuseEvent>,
}

/// 所有候选都已用过时选取的下标，只依赖从 1 开始的图块序号
///
/// 整数的哈希取其自身，因此等价于 `sequence mod count`。
pub fn fallback_index(sequence: u64, count: usize) -> usize {
    (sequence % count as u64) as usize
}

/// 为每个图块挑选一张图片
pub struct TileAssigner<'a, S> {
    index: &'a ColorFeatureIndex<S>,
    config: MosaicConfig,
    history: UsageHistory,
    state: JobState,
    progress: Option<ProgressBar>,
}

impl<'a, S> TileAssigner<'a, S>
where
    S: FeatureStore + Sync,
{
    pub fn new(index: &'a ColorFeatureIndex<S>, config: MosaicConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            index,
            config,
            history: UsageHistory::new(config.repeat_window),
            state: JobState::Idle,
            progress: None,
        })
    }

    /// 每完成一个图块更新一次进度条
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = Some(pb);
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    pub fn run<T: TileSampler + Sync>(&mut self, sampler: &T) -> Result<Assignment> {
        self.run_with_cancel(sampler, &AtomicBool::new(false))
    }

    /// 执行任务，`cancel` 被置位后停止并丢弃已完成的部分
    pub fn run_with_cancel<T: TileSampler + Sync>(
        &mut self,
        sampler: &T,
        cancel: &AtomicBool,
    ) -> Result<Assignment> {
        if self.state == JobState::Running {
            return Err(MosaicError::InvalidState("任务正在运行"));
        }
        self.history.reset();
        self.state = JobState::Running;

        info!(
            "开始生成马赛克：{0}x{0}，重复窗口 {1}，每层查询 {2} 张",
            self.config.grid,
            self.config.repeat_window,
            self.config.query_limit()
        );

        let result = if self.config.repeat_window == 0 {
            self.assign_prefetched(sampler, cancel)
        } else {
            self.assign_sequential(sampler, cancel)
        };

        match &result {
            Ok(assignment) => {
                self.state = JobState::Done;
                info!(
                    "马赛克生成完成，使用 {} 张不同图片，重复使用 {} 次",
                    self.history.used_count(),
                    assignment.reused.len()
                );
            }
            Err(e) => {
                self.state = JobState::Failed;
                warn!("马赛克生成失败: {}", e);
            }
        }
        result
    }

    /// 有重复窗口时，查询依赖前一个图块的选择，只能逐个处理
    fn assign_sequential<T: TileSampler>(
        &mut self,
        sampler: &T,
        cancel: &AtomicBool,
    ) -> Result<Assignment> {
        let grid = self.config.grid;
        let aspect = sampler.frame_aspect();
        let mut assignment =
            Assignment { plan: MosaicPlan::new(grid, aspect), reused: vec![] };

        for (seq, (x, y)) in (1u64..).zip(raster_order(grid)) {
            if cancel.load(Ordering::Relaxed) {
                return Err(MosaicError::Cancelled);
            }
            let exclude = self.history.recent();
            let candidates = tile_candidates(self.index, &self.config, sampler, x, y, &exclude)?;
            self.commit(&mut assignment, &candidates, x, y, seq)?;
        }

        Ok(assignment)
    }

    /// 没有重复窗口时，查询与历史无关，可以先并行算出候选再按顺序选择
    fn assign_prefetched<T: TileSampler + Sync>(
        &mut self,
        sampler: &T,
        cancel: &AtomicBool,
    ) -> Result<Assignment> {
        let grid = self.config.grid;
        let aspect = sampler.frame_aspect();
        let mut assignment =
            Assignment { plan: MosaicPlan::new(grid, aspect), reused: vec![] };
        let tiles = raster_order(grid).collect::<Vec<_>>();
        let exclude = HashSet::new();

        let mut seq = 1u64;
        for chunk in tiles.chunks(PREFETCH_TILES) {
            if cancel.load(Ordering::Relaxed) {
                return Err(MosaicError::Cancelled);
            }
            let index = self.index;
            let config = &self.config;
            let exclude = &exclude;
            let prefetched = chunk
                .par_iter()
                .map(|&(x, y)| tile_candidates(index, config, sampler, x, y, exclude))
                .collect::<Result<Vec<_>>>()?;

            for (&(x, y), candidates) in chunk.iter().zip(prefetched) {
                self.commit(&mut assignment, &candidates, x, y, seq)?;
                seq += 1;
            }
        }

        Ok(assignment)
    }

    /// 选择并记录一个图块的图片
    fn commit(
        &mut self,
        assignment: &mut Assignment,
        candidates: &[FusedCandidate],
        x: u32,
        y: u32,
        seq: u64,
    ) -> Result<()> {
        let (id, reused) = self
            .select(candidates, seq)
            .ok_or(MosaicError::NoCandidateFound { x, y })?;

        if reused {
            warn!("图块 ({}, {}) 的候选均已使用，重复使用图片 {}", x, y, id);
            assignment.reused.push(ReuseEvent { x, y, sequence: seq, image_id: id });
        } else {
            debug!("图块 ({}, {}) 选择图片 {}", x, y, id);
        }

        self.history.commit(id);
        assignment.plan.push(x, y, id);
        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
        Ok(())
    }

    /// 优先选择本次任务中从未用过的图片，否则按序号确定性地挑选一个
    fn select(&self, candidates: &[FusedCandidate], seq: u64) -> Option<(ImageId, bool)> {
        if candidates.is_empty() {
            return None;
        }
        if let Some(c) = candidates.iter().find(|c| !self.history.was_used(c.id)) {
            return Some((c.id, false));
        }
        let idx = fallback_index(seq, candidates.len());
        Some((candidates[idx].id, true))
    }
}

/// 对一个图块执行采样、三层查询与融合
fn tile_candidates<S: FeatureStore, T: TileSampler>(
    index: &ColorFeatureIndex<S>,
    config: &MosaicConfig,
    sampler: &T,
    x: u32,
    y: u32,
    exclude: &HashSet<ImageId>,
) -> Result<Vec<FusedCandidate>> {
    let grid = config.grid;
    let targets: [FeatureVector; 3] = [
        sampler.tile_sample(x, y, grid, Level::L0)?,
        sampler.tile_sample(x, y, grid, Level::L1)?,
        sampler.tile_sample(x, y, grid, Level::L2)?,
    ];

    let aspect_ratio = sampler.frame_aspect();
    let query = |level: Level| {
        index.query(
            level.into(),
            &Query {
                target: &targets[level.index()],
                aspect_ratio,
                aspect_tolerance: config.aspect_tolerance,
                exclude,
                limit: config.query_limit(),
            },
        )
    };
    let results = [query(Level::L0)?, query(Level::L1)?, query(Level::L2)?];

    Ok(fuse(index, &results, &targets))
}
