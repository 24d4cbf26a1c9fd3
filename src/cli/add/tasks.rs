use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressIterator};
use log::info;
use rayon::prelude::*;
use regex::Regex;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::task::{JoinHandle, block_in_place, spawn_blocking};
use walkdir::WalkDir;

use super::types::*;
use crate::MosaicDB;
use crate::config::Opts;
use crate::sampler::{ImageInfo, hash_bytes};
use crate::utils::{file_mtime, pb_style_speed};

pub fn task_scan(
    path: PathBuf,
    opts: Opts,
    pb: ProgressBar,
    regex_suf: Regex,
) -> (JoinHandle<Result<()>>, Receiver<ImageData>) {
    let (tx, rx) = channel(num_cpus::get());
    let t = tokio::spawn(async move { scan_directory(path, opts, tx, regex_suf, pb).await });
    (t, rx)
}

pub fn task_hash(
    mut lrx: Receiver<ImageData>,
) -> (JoinHandle<Result<()>>, Receiver<HashedImageData>) {
    let (tx, rx) = channel(num_cpus::get());
    let t = spawn_blocking(move || {
        let mut buffer = vec![];
        // NOTE: 每次最多读取 cpu * 10 组数据，计算完成后再读取下一批，避免内存占用过高
        while lrx.blocking_recv_many(&mut buffer, num_cpus::get() * 10) != 0 {
            buffer.par_drain(..).for_each(|data| {
                let hash = hash_bytes(&data.data);
                // 下游已退出时错误会从下游返回
                let _ = tx.blocking_send(HashedImageData {
                    path: data.path,
                    data: data.data,
                    hash,
                    mtime: data.mtime,
                });
            });
        }
        Ok(())
    });
    (t, rx)
}

pub fn task_filter(
    mut lrx: Receiver<HashedImageData>,
    pb: ProgressBar,
    db: Arc<MosaicDB>,
    overwrite: bool,
) -> (JoinHandle<Result<()>>, Receiver<HashedImageData>) {
    let (tx, rx) = channel(num_cpus::get());
    let t = tokio::spawn(async move {
        while let Some(data) = lrx.recv().await {
            if db.check_hash(&data.hash).await? {
                skip_or_update(&db, &pb, &data.hash, &data.path, overwrite).await?;
            } else if tx.send(data).await.is_err() {
                break;
            }
        }
        Ok(())
    });
    (t, rx)
}

pub fn task_calc(
    mut lrx: Receiver<HashedImageData>,
    pb: ProgressBar,
) -> (JoinHandle<Result<()>>, Receiver<ProcessableImage>) {
    let (tx, rx) = channel(num_cpus::get());
    let t = spawn_blocking(move || {
        let mut buffer = vec![];
        while lrx.blocking_recv_many(&mut buffer, num_cpus::get() * 10) != 0 {
            buffer.par_drain(..).for_each(|data| {
                match ImageInfo::with_hash(&data.data, data.hash) {
                    Ok(info) => {
                        let _ = tx.blocking_send(ProcessableImage {
                            path: data.path,
                            info,
                            mtime: data.mtime,
                        });
                    }
                    Err(e) => {
                        pb.println(format!("计算颜色特征失败: {}: {}", data.path, e));
                        pb.inc(1);
                    }
                }
            });
        }
        Ok(())
    });
    (t, rx)
}

pub fn task_add(
    mut lrx: Receiver<ProcessableImage>,
    pb: ProgressBar,
    db: Arc<MosaicDB>,
    overwrite: bool,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        while let Some(data) = lrx.recv().await {
            // 这里再检查一次，因为可能存在处理过程中新增的重复图片
            if db.check_hash(&data.info.hash).await? {
                skip_or_update(&db, &pb, &data.info.hash, &data.path, overwrite).await?;
                continue;
            }
            let orig_timestamp = data.info.orig_timestamp.or(data.mtime);
            db.add_image(&data.path, &data.info, orig_timestamp).await?;
            pb.set_message(data.path);
            pb.inc(1);
        }
        Ok(())
    })
}

async fn skip_or_update(
    db: &MosaicDB,
    pb: &ProgressBar,
    hash: &[u8],
    path: &str,
    overwrite: bool,
) -> Result<()> {
    if overwrite {
        db.update_image_path(hash, path).await?;
        pb.set_message(format!("更新图片路径: {}", path));
    } else {
        pb.set_message(format!("跳过已添加图片: {}", path));
    }
    pb.inc(1);
    Ok(())
}

async fn scan_directory(
    path: PathBuf,
    opts: Opts,
    tx: Sender<ImageData>,
    regex_suf: Regex,
    pb: ProgressBar,
) -> Result<()> {
    info!("开始扫描目录: {}", path.display());
    let pb2 = ProgressBar::no_length().with_style(pb_style_speed());
    let entries = block_in_place(|| {
        WalkDir::new(&path)
            .into_iter()
            .progress_with(pb2)
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                let ext = path.extension()?;
                (path.is_file() && regex_suf.is_match(&ext.to_string_lossy()))
                    .then(|| path.to_path_buf())
            })
            .collect::<Vec<_>>()
    });
    info!("扫描完成，共 {} 张图片", entries.len());

    pb.set_length(entries.len() as u64);

    for entry in entries {
        let data = match tokio::fs::read(&entry).await {
            Ok(data) => data,
            Err(e) => {
                pb.println(format!("读取文件失败: {}: {}", entry.display(), e));
                pb.inc(1);
                continue;
            }
        };
        let image = ImageData { path: opts.relative_path(&entry), data, mtime: file_mtime(&entry) };
        if tx.send(image).await.is_err() {
            break;
        }
    }
    Ok(())
}
