use std::collections::{HashSet, VecDeque};

use crate::index::ImageId;

/// 一次马赛克任务中的图片使用记录
///
/// - `recent`：最近使用的 `window` 张图片，查询时排除
/// - `used`：本次任务中用过的所有图片，选择时优先跳过
#[derive(Debug, Clone, Default)]
pub struct UsageHistory {
    window: usize,
    recent: VecDeque<ImageId>,
    used: HashSet<ImageId>,
}

impl UsageHistory {
    pub fn new(window: usize) -> Self {
        Self { window, recent: VecDeque::with_capacity(window), used: HashSet::new() }
    }

    pub fn reset(&mut self) {
        self.recent.clear();
        self.used.clear();
    }

    /// 记录一次使用
    pub fn commit(&mut self, id: ImageId) {
        if self.window > 0 {
            if self.recent.len() == self.window {
                self.recent.pop_front();
            }
            self.recent.push_back(id);
        }
        self.used.insert(id);
    }

    /// 当前窗口内的图片，窗口为 0 时为空
    pub fn recent(&self) -> HashSet<ImageId> {
        self.recent.iter().copied().collect()
    }

    pub fn was_used(&self, id: ImageId) -> bool {
        self.used.contains(&id)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }
}
