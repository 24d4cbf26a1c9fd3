use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::OutputFormat;
use crate::{MosaicDBBuilder, Opts};

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {
    /// 输出格式
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = MosaicDBBuilder::new(opts.conf_dir.clone()).wal(false).open().await?;
        let stats = db.stats().await?;
        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            OutputFormat::Table => {
                println!("images\t{}", stats.images);
                println!("active\t{}", stats.active);
                println!("complete\t{}", stats.complete);
            }
        }
        Ok(())
    }
}
