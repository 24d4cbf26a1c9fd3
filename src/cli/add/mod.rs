use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use indicatif::ProgressBar;
use regex::Regex;
use tasks::*;

mod tasks;
mod types;

use crate::MosaicDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// 图片所在目录
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,jpeg,png,webp,tif,tiff")]
    pub suffix: String,
    /// 如果图片已添加，是否使用新的路径覆盖旧的记录
    #[arg(long)]
    pub overwrite: bool,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let re_suf = format!("(?i)^({})$", self.suffix.replace(',', "|"));
        let re_suf = Regex::new(&re_suf)?;

        let db = Arc::new(MosaicDBBuilder::new(opts.conf_dir.clone()).open().await?);

        let pb = ProgressBar::no_length().with_style(pb_style());

        let (t1, rx) = task_scan(self.path.clone(), opts.clone(), pb.clone(), re_suf);
        let (t2, rx) = task_hash(rx);
        let (t3, rx) = task_filter(rx, pb.clone(), db.clone(), self.overwrite);
        let (t4, rx) = task_calc(rx, pb.clone());
        let t5 = task_add(rx, pb.clone(), db, self.overwrite);

        // 等待所有任务完成
        let (r1, r2, r3, r4, r5) = tokio::try_join!(t1, t2, t3, t4, t5)?;
        for result in [r1, r2, r3, r4, r5] {
            result?;
        }

        pb.finish_with_message("图片添加完成");

        Ok(())
    }
}
