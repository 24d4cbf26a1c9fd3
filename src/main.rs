use clap::Parser;
use imosaic::cli::SubCommandExtend;
use imosaic::config::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Add(config) => config.run(&opts).await,
        SubCommand::Mosaic(config) => config.run(&opts).await,
        SubCommand::Clean(config) => config.run(&opts).await,
        SubCommand::Stats(config) => config.run(&opts).await,
    }
}
