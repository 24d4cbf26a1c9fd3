use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::{MosaicDBBuilder, Opts};

#[derive(Parser, Debug, Clone)]
pub struct CleanCommand {
    /// 直接删除文件已不存在的图片，而不是停用
    #[arg(long)]
    pub purge: bool,
}

impl SubCommandExtend for CleanCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = MosaicDBBuilder::new(opts.conf_dir.clone()).open().await?;
        info!("检查图片文件中……");

        let (mut removed, mut restored) = (0, 0);
        for image in db.images().await? {
            let exists = opts.absolute_path(&image.path).is_file();
            match (exists, image.active) {
                (false, _) if self.purge => {
                    db.delete_image(image.id).await?;
                    info!("删除图片: {}", image.path);
                    removed += 1;
                }
                (false, true) => {
                    db.set_active(image.id, false).await?;
                    info!("停用图片: {}", image.path);
                    removed += 1;
                }
                // 文件重新出现的图片重新参与匹配
                (true, false) => {
                    db.set_active(image.id, true).await?;
                    info!("恢复图片: {}", image.path);
                    restored += 1;
                }
                _ => {}
            }
        }

        info!("清理完成，移除 {} 张，恢复 {} 张", removed, restored);
        Ok(())
    }
}
