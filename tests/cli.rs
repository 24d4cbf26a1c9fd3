use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

const COLORS: [(&str, [u8; 3]); 6] = [
    ("red", [230, 20, 20]),
    ("green", [20, 230, 20]),
    ("blue", [20, 20, 230]),
    ("white", [240, 240, 240]),
    ("black", [10, 10, 10]),
    ("yellow", [230, 230, 20]),
];

/// 生成纯色图库与一张左红右蓝的目标图
#[fixture]
fn library() -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child("photos").create_dir_all().unwrap();
    for (name, rgb) in COLORS {
        let path = dir.child("photos").child(format!("{name}.png"));
        RgbImage::from_pixel(30, 20, Rgb(rgb)).save(path.path()).unwrap();
    }
    let target = RgbImage::from_fn(60, 40, |x, _| {
        if x < 30 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
    });
    target.save(dir.path().join("target.png")).unwrap();
    dir
}

fn add(conf: &Path, root: &Path) -> Result<()> {
    cargo_run!("imosaic", "-c", conf, "-r", root, "add", root.join("photos")).success();
    Ok(())
}

#[rstest]
fn add_and_stats(library: TempDir) -> Result<()> {
    let conf = TempDir::new()?;
    add(conf.path(), library.path())?;
    // 重复添加会被跳过
    add(conf.path(), library.path())?;

    cargo_run!("imosaic", "-c", conf.path(), "stats", "-f", "json")
        .success()
        .stdout(predicate::str::contains("\"images\": 6"))
        .stdout(predicate::str::contains("\"complete\": 6"));
    Ok(())
}

#[rstest]
fn mosaic_prints_plan(library: TempDir) -> Result<()> {
    let conf = TempDir::new()?;
    add(conf.path(), library.path())?;

    cargo_run!("imosaic", "-c", conf.path(), "-r", library.path(), "mosaic", "-n", "2", library.path().join("target.png"))
        .success()
        .stdout(predicate::str::starts_with("0\t0\tphotos/red.png"))
        .stdout(predicate::str::contains("1\t0\tphotos/blue.png"));
    Ok(())
}

#[rstest]
fn mosaic_writes_plan_and_image(library: TempDir) -> Result<()> {
    let conf = TempDir::new()?;
    add(conf.path(), library.path())?;

    let plan = library.child("plan.json");
    let output = library.child("mosaic.png");
    cargo_run!(
        "imosaic",
        "-c",
        conf.path(),
        "-r",
        library.path(),
        "mosaic",
        "-n",
        "4",
        "-w",
        "2",
        "--width",
        "240",
        "--plan",
        plan.path(),
        "--output",
        output.path(),
        library.path().join("target.png")
    )
    .success();

    plan.assert(predicate::str::contains("\"grid\": 4"));
    plan.assert(predicate::str::contains("photos/"));
    let mosaic = image::open(output.path())?;
    assert_eq!((mosaic.width(), mosaic.height()), (240, 160));
    Ok(())
}

#[rstest]
fn mosaic_fails_without_candidates(library: TempDir) -> Result<()> {
    let conf = TempDir::new()?;
    add(conf.path(), library.path())?;

    // 图库中只有 1.5 宽高比的图片
    let square = library.child("square.png");
    RgbImage::from_pixel(40, 40, Rgb([255, 0, 0])).save(square.path())?;
    cargo_run!("imosaic", "-c", conf.path(), "mosaic", "-n", "2", square.path()).failure();
    Ok(())
}

#[rstest]
fn clean_missing_files(library: TempDir) -> Result<()> {
    let conf = TempDir::new()?;
    add(conf.path(), library.path())?;

    std::fs::remove_file(library.path().join("photos/red.png"))?;
    cargo_run!("imosaic", "-c", conf.path(), "-r", library.path(), "clean").success();
    cargo_run!("imosaic", "-c", conf.path(), "stats", "-f", "json")
        .success()
        .stdout(predicate::str::contains("\"images\": 6"))
        .stdout(predicate::str::contains("\"active\": 5"));

    cargo_run!("imosaic", "-c", conf.path(), "-r", library.path(), "clean", "--purge").success();
    cargo_run!("imosaic", "-c", conf.path(), "stats", "-f", "json")
        .success()
        .stdout(predicate::str::contains("\"images\": 5"));
    Ok(())
}
