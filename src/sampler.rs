use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use image::{DynamicImage, ImageFormat, Rgb32FImage};

use crate::error::MosaicError;
use crate::feature::{FeatureVector, Level};
use crate::mosaic::TileSampler;

/// 入库时先缩小到这个尺寸以内再采样
const INGEST_MAX_SIZE: u32 = 512;

/// 入库图片的基本信息与三层颜色特征
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub frame_aspect: f32,
    /// 文件格式，使用常见扩展名，如 `jpg`、`tif`
    pub format: String,
    /// 文件内容的 blake3 哈希
    pub hash: Vec<u8>,
    /// EXIF 中的拍摄时间，Unix 秒
    pub orig_timestamp: Option<i64>,
    pub features: [FeatureVector; 3],
}

impl ImageInfo {
    /// 解码图片数据并计算特征
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::with_hash(data, hash_bytes(data))
    }

    /// 与 [`ImageInfo::from_bytes`] 相同，但使用已经算好的哈希
    pub fn with_hash(data: &[u8], hash: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(data).context("无法识别图片格式")?;
        let image = image::load_from_memory_with_format(data, format)?;
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            anyhow::bail!("图片尺寸为 0");
        }
        Ok(Self {
            width,
            height,
            frame_aspect: width as f32 / height as f32,
            format: format_name(format),
            hash,
            orig_timestamp: exif_timestamp(data),
            features: sample_levels(&image),
        })
    }
}

/// 计算文件内容的 blake3 哈希，用于去重
pub fn hash_bytes(data: &[u8]) -> Vec<u8> {
    blake3::hash(data).as_bytes().to_vec()
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpg".to_owned(),
        ImageFormat::Tiff => "tif".to_owned(),
        _ => format
            .extensions_str()
            .first()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{:?}", format).to_lowercase()),
    }
}

/// 读取 EXIF 中的 `DateTimeOriginal`，按 UTC 转为 Unix 秒
pub fn exif_timestamp(data: &[u8]) -> Option<i64> {
    let exif = exif::Reader::new().read_from_container(&mut Cursor::new(data)).ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let exif::Value::Ascii(values) = &field.value else {
        return None;
    };
    let text = std::str::from_utf8(values.first()?).ok()?;
    let datetime =
        NaiveDateTime::parse_from_str(text.trim_end_matches('\0'), "%Y:%m:%d %H:%M:%S").ok()?;
    Some(datetime.and_utc().timestamp())
}

/// 计算整张图片在三个层级上的平均颜色
pub fn sample_levels(image: &DynamicImage) -> [FeatureVector; 3] {
    let small = if image.width() > INGEST_MAX_SIZE || image.height() > INGEST_MAX_SIZE {
        image.thumbnail(INGEST_MAX_SIZE, INGEST_MAX_SIZE)
    } else {
        image.clone()
    };
    let pixels = small.to_rgb32f();
    Level::ALL.map(|level| {
        let g = level.grid();
        let values = (0..g)
            .flat_map(|cy| (0..g).map(move |cx| (cx, cy)))
            .flat_map(|(cx, cy)| cell_mean(&pixels, cx, cy, g, g))
            .collect::<Vec<_>>();
        FeatureVector::for_level(level, values).expect("采样长度与层级一致")
    })
}

/// 将 `[0, len)` 均分为 `n` 段，返回第 `i` 段，每段至少包含一个像素
fn span(i: u32, n: u32, len: u32) -> (u32, u32) {
    let start = (i as u64 * len as u64 / n as u64) as u32;
    let end = ((i as u64 + 1) * len as u64 / n as u64) as u32;
    (start, end.max(start + 1).min(len))
}

/// `cols x rows` 网格中第 `(cx, cy)` 格的平均颜色
fn cell_mean(pixels: &Rgb32FImage, cx: u32, cy: u32, cols: u32, rows: u32) -> [f32; 3] {
    let (x0, x1) = span(cx, cols, pixels.width());
    let (y0, y1) = span(cy, rows, pixels.height());
    let mut sum = [0f64; 3];
    for y in y0..y1 {
        for x in x0..x1 {
            let p = pixels.get_pixel(x, y);
            for c in 0..3 {
                sum[c] += p[c] as f64;
            }
        }
    }
    let count = ((x1 - x0) * (y1 - y0)) as f64;
    sum.map(|v| (v / count) as f32)
}

/// 作为马赛克目标的图片
pub struct TargetImage {
    pixels: Rgb32FImage,
}

impl TargetImage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image =
            image::open(path).with_context(|| format!("无法打开图片: {}", path.display()))?;
        Self::from_image(&image)
    }

    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            anyhow::bail!("图片尺寸为 0");
        }
        Ok(Self { pixels: image.to_rgb32f() })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

impl TileSampler for TargetImage {
    fn frame_aspect(&self) -> f32 {
        self.pixels.width() as f32 / self.pixels.height() as f32
    }

    /// 第 k 层的采样相当于把整张图划分为 `(grid * 2^k)` 见方的网格，
    /// 取该图块对应的 `2^k x 2^k` 个格子
    fn tile_sample(
        &self,
        x: u32,
        y: u32,
        grid: u32,
        level: Level,
    ) -> crate::error::Result<FeatureVector> {
        if x >= grid || y >= grid {
            return Err(MosaicError::InvalidConfig {
                name: "tile",
                reason: format!("图块 ({x}, {y}) 超出 {grid}x{grid} 网格"),
            });
        }
        let k = level.grid();
        let cells = grid * k;
        let mut values = Vec::with_capacity(level.arity());
        for j in 0..k {
            for i in 0..k {
                values.extend(cell_mean(&self.pixels, x * k + i, y * k + j, cells, cells));
            }
        }
        FeatureVector::for_level(level, values)
    }
}
