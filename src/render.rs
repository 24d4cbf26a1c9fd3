use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, ensure};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use indicatif::ProgressBar;
use log::info;
use rayon::prelude::*;

use crate::index::ImageId;
use crate::mosaic::MosaicPlan;

/// 根据宽度与宽高比计算输出尺寸，向下取整到图块数量的整数倍
pub fn output_size(plan: &MosaicPlan, width: u32) -> (u32, u32, u32, u32) {
    let height = (width as f32 / plan.frame_aspect + 0.5) as u32;
    let tile_w = (width / plan.grid).max(1);
    let tile_h = (height / plan.grid).max(1);
    (tile_w * plan.grid, tile_h * plan.grid, tile_w, tile_h)
}

/// 将方案中的图片缩放到图块大小并拼接
///
/// # Arguments
///
/// * `plan` - 完整的马赛克方案
/// * `paths` - 图片 ID 到文件路径的映射
/// * `width` - 输出宽度
/// * `pb` - 每处理一张图片更新一次
pub fn render_plan(
    plan: &MosaicPlan,
    paths: &HashMap<ImageId, PathBuf>,
    width: u32,
    pb: &ProgressBar,
) -> Result<RgbImage> {
    ensure!(width > 0, "输出宽度必须大于 0");
    ensure!(plan.is_complete(), "马赛克方案不完整");
    let (out_w, out_h, tile_w, tile_h) = output_size(plan, width);
    info!("输出尺寸 {}x{}，图块尺寸 {}x{}", out_w, out_h, tile_w, tile_h);

    let ids = plan.tiles.iter().map(|t| t.image_id).collect::<BTreeSet<_>>();
    pb.set_length(ids.len() as u64);

    let tiles = ids
        .into_par_iter()
        .map(|id| {
            let path = paths.get(&id).ok_or_else(|| anyhow!("找不到图片 {} 的路径", id))?;
            let image = image::open(path)
                .with_context(|| format!("无法打开图片: {}", path.display()))?;
            let tile = resize_tile(&image, tile_w, tile_h);
            pb.inc(1);
            Ok((id, tile))
        })
        .collect::<Result<HashMap<_, _>>>()?;

    let mut canvas = RgbImage::new(out_w, out_h);
    for t in &plan.tiles {
        let tile = &tiles[&t.image_id];
        imageops::replace(&mut canvas, tile, (t.x * tile_w) as i64, (t.y * tile_h) as i64);
    }
    Ok(canvas)
}

fn resize_tile(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    imageops::resize(&image.to_rgb8(), width, height, FilterType::Lanczos3)
}
