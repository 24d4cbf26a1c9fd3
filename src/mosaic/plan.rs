use serde::{Deserialize, Serialize};

use crate::index::ImageId;

/// 单个图块的分配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileAssignment {
    pub x: u32,
    pub y: u32,
    pub image_id: ImageId,
}

/// 马赛克方案，图块按行优先顺序排列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicPlan {
    /// 每边的图块数量
    pub grid: u32,
    /// 目标图片的宽高比
    pub frame_aspect: f32,
    pub tiles: Vec<TileAssignment>,
}

impl MosaicPlan {
    pub fn new(grid: u32, frame_aspect: f32) -> Self {
        let capacity = (grid as usize).pow(2);
        Self { grid, frame_aspect, tiles: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, x: u32, y: u32, image_id: ImageId) {
        self.tiles.push(TileAssignment { x, y, image_id });
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// 每个格子恰好分配了一次
    pub fn is_complete(&self) -> bool {
        self.tiles.len() == (self.grid as usize).pow(2)
            && self.tiles.iter().zip(raster_order(self.grid)).all(|(t, (x, y))| t.x == x && t.y == y)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<ImageId> {
        if x >= self.grid || y >= self.grid {
            return None;
        }
        self.tiles.get((y * self.grid + x) as usize).map(|t| t.image_id)
    }
}

/// 行优先遍历顺序：y 在外层，x 在内层
pub fn raster_order(grid: u32) -> impl Iterator<Item = (u32, u32)> {
    (0..grid).flat_map(move |y| (0..grid).map(move |x| (x, y)))
}
