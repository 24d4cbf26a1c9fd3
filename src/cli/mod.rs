mod add;
mod clean;
mod mosaic;
mod stats;

pub use add::*;
pub use clean::*;
pub use mosaic::*;
pub use stats::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
