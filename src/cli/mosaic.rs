use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use log::{info, warn};
use serde::Serialize;
use tokio::task::block_in_place;

use crate::MosaicDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{MosaicOptions, Opts};
use crate::index::ImageId;
use crate::mosaic::{MosaicConfig, MosaicPlan, ReuseEvent, TileAssigner};
use crate::render::render_plan;
use crate::sampler::TargetImage;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct MosaicCommand {
    #[command(flatten)]
    pub mosaic: MosaicOptions,
    /// 目标图片
    pub image: PathBuf,
    /// 将方案保存为 JSON 文件
    #[arg(short, long)]
    pub plan: Option<PathBuf>,
    /// 渲染马赛克并保存到该文件
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// 渲染输出的宽度
    #[arg(long, default_value_t = 2048, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    #[serde(flatten)]
    plan: &'a MosaicPlan,
    paths: BTreeMap<ImageId, &'a str>,
    reused: &'a [ReuseEvent],
}

impl SubCommandExtend for MosaicCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let config = MosaicConfig::from(&self.mosaic);
        config.validate()?;

        let db = MosaicDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let index = db.load_index().await?;
        let target = block_in_place(|| TargetImage::open(&self.image))?;

        let cancel = Arc::new(AtomicBool::new(false));
        let ctrl_c = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到中断信号，正在停止");
                    cancel.store(true, Ordering::Relaxed);
                }
            }
        });

        let pb = ProgressBar::new((config.grid as u64).pow(2)).with_style(pb_style());
        let assignment = block_in_place(|| {
            let mut assigner = TileAssigner::new(&index, config)?.with_progress(pb.clone());
            assigner.run_with_cancel(&target, &cancel)
        });
        ctrl_c.abort();
        pb.finish_and_clear();
        let assignment = assignment?;

        if !assignment.reused.is_empty() {
            warn!("候选图片不足，共有 {} 个图块重复使用了图片", assignment.reused.len());
        }

        let plan = &assignment.plan;
        let ids = plan.tiles.iter().map(|t| t.image_id).collect::<Vec<_>>();
        let paths = db.image_paths(&ids).await?;

        if let Some(file) = &self.plan {
            let output = PlanOutput {
                plan,
                paths: paths.iter().map(|(id, path)| (*id, path.as_str())).collect(),
                reused: &assignment.reused,
            };
            std::fs::write(file, serde_json::to_string_pretty(&output)?)
                .with_context(|| format!("无法写入方案: {}", file.display()))?;
            info!("方案已保存到 {}", file.display());
        }

        if let Some(file) = &self.output {
            let paths = paths
                .iter()
                .map(|(id, path)| (*id, opts.absolute_path(path)))
                .collect::<HashMap<_, _>>();
            let pb = ProgressBar::no_length().with_style(pb_style());
            let canvas = block_in_place(|| render_plan(plan, &paths, self.width, &pb))?;
            pb.finish_and_clear();
            canvas.save(file).with_context(|| format!("无法保存图片: {}", file.display()))?;
            info!("马赛克已保存到 {}", file.display());
        }

        if self.plan.is_none() && self.output.is_none() {
            for tile in &plan.tiles {
                println!("{}\t{}\t{}", tile.x, tile.y, paths[&tile.image_id]);
            }
        }

        Ok(())
    }
}
