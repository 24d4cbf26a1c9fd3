use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::cli::*;
use crate::mosaic::{DEFAULT_ASPECT_TOLERANCE, DEFAULT_IMAGE_QUERY_LIMIT, MosaicConfig};

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "imosaic", "imosaic").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap_or(".")
}

#[derive(Parser, Debug, Clone)]
pub struct MosaicOptions {
    /// 每边的图块数量
    #[arg(short = 'n', long, value_name = "N", default_value_t = 16, value_parser = clap::value_parser!(u32).range(1..))]
    pub grid: u32,
    /// 最近使用的多少张图片不参与查询，0 表示关闭窗口并扩大每层查询数量
    #[arg(short = 'w', long, value_name = "N", default_value_t = 0)]
    pub repeat_window: usize,
    /// 每层查询的候选数量，设置了重复窗口时忽略
    #[arg(short = 'l', long, value_name = "N", default_value_t = DEFAULT_IMAGE_QUERY_LIMIT)]
    pub image_query_limit: usize,
    /// 宽高比允许的误差
    #[arg(short = 'a', long, value_name = "RATIO", default_value_t = DEFAULT_ASPECT_TOLERANCE)]
    pub aspect_tolerance: f32,
}

impl From<&MosaicOptions> for MosaicConfig {
    fn from(opts: &MosaicOptions) -> Self {
        MosaicConfig {
            grid: opts.grid,
            repeat_window: opts.repeat_window,
            image_query_limit: opts.image_query_limit,
            aspect_tolerance: opts.aspect_tolerance,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imosaic", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// imosaic 配置文件目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    /// 图库根目录，数据库中保存的是相对于该目录的路径
    #[arg(short, long, env = "IMOSAIC_ROOT", default_value = ".")]
    pub root: PathBuf,
}

impl Opts {
    /// 将图片路径转为相对于图库根目录的路径
    pub fn relative_path(&self, path: &Path) -> String {
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        path.strip_prefix(&root).unwrap_or(&path).to_string_lossy().to_string()
    }

    /// 将数据库中的路径还原为绝对路径
    pub fn absolute_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描目录，将图片的颜色特征添加到数据库
    Add(AddCommand),
    /// 生成马赛克
    Mosaic(MosaicCommand),
    /// 停用或删除文件已不存在的图片
    Clean(CleanCommand),
    /// 显示数据库统计信息
    Stats(StatsCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("imosaic.db")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mosaic_defaults() {
        let opts = Opts::try_parse_from(["imosaic", "-c", "/tmp/conf", "mosaic", "target.jpg"])
            .unwrap();
        assert_eq!(opts.conf_dir.database(), PathBuf::from("/tmp/conf/imosaic.db"));
        let SubCommand::Mosaic(cmd) = opts.subcmd else { panic!("expected mosaic") };
        let config = MosaicConfig::from(&cmd.mosaic);
        assert_eq!(config, MosaicConfig::default());
    }

    #[test]
    fn test_parse_rejects_zero_grid() {
        let result = Opts::try_parse_from(["imosaic", "mosaic", "-n", "0", "target.jpg"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_zero_width() {
        let result = Opts::try_parse_from(["imosaic", "mosaic", "--width", "0", "target.jpg"]);
        assert!(result.is_err());
        let opts = Opts::try_parse_from(["imosaic", "mosaic", "--width", "1", "target.jpg"]);
        assert!(opts.is_ok());
    }

    #[test]
    fn test_relative_path() {
        let opts = Opts::try_parse_from(["imosaic", "-r", "/photos", "stats"]).unwrap();
        assert_eq!(opts.relative_path(Path::new("/photos/2018/a.jpg")), "2018/a.jpg");
        assert_eq!(opts.relative_path(Path::new("/other/b.jpg")), "/other/b.jpg");
        assert_eq!(opts.absolute_path("2018/a.jpg"), PathBuf::from("/photos/2018/a.jpg"));
    }
}
