pub mod cli;
pub mod config;
mod db;
pub mod error;
pub mod feature;
pub mod imdb;
pub mod index;
pub mod mosaic;
pub mod ranker;
pub mod render;
pub mod sampler;
pub mod utils;

pub use config::Opts;
pub use imdb::{MosaicDB, MosaicDBBuilder};
