use std::collections::HashSet;

use imosaic::error::{MosaicError, Result};
use imosaic::feature::{FeatureVector, Level};
use imosaic::index::{ColorFeatureIndex, ImageId, ImageRecord, MemoryStore, Query};
use imosaic::mosaic::{MosaicConfig, TileAssigner, TileSampler};
use rand::prelude::*;
use rstest::*;

/// 颜色随图块位置渐变的目标
struct Gradient {
    aspect: f32,
}

impl TileSampler for Gradient {
    fn frame_aspect(&self) -> f32 {
        self.aspect
    }

    fn tile_sample(&self, x: u32, y: u32, grid: u32, level: Level) -> Result<FeatureVector> {
        let k = level.grid();
        let cells = (grid * k) as f32;
        let mut values = vec![];
        for j in 0..k {
            for i in 0..k {
                let u = (x * k + i) as f32 / cells;
                let v = (y * k + j) as f32 / cells;
                values.extend([u, v, 1.0 - u]);
            }
        }
        FeatureVector::for_level(level, values)
    }
}

fn add_image(store: &mut MemoryStore, id: ImageId, aspect: f32, features: [Vec<f32>; 3]) {
    store.insert_image(ImageRecord { id, path: format!("{id}.jpg"), frame_aspect: aspect, active: true });
    for (level, values) in Level::ALL.into_iter().zip(features) {
        store.insert_feature(id, FeatureVector::for_level(level, values).unwrap());
    }
}

fn random_index(seed: u64, count: i64, aspects: &[f32]) -> ColorFeatureIndex<MemoryStore> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = MemoryStore::new();
    for id in 1..=count {
        let aspect = aspects[id as usize % aspects.len()];
        let features = Level::ALL.map(|level| (0..level.arity()).map(|_| rng.random()).collect());
        add_image(&mut store, id, aspect, features);
    }
    ColorFeatureIndex::new(store)
}

fn flat_index(ids: &[ImageId]) -> ColorFeatureIndex<MemoryStore> {
    let mut store = MemoryStore::new();
    for &id in ids {
        let features = Level::ALL.map(|level| vec![id as f32 / 10.0; level.arity()]);
        add_image(&mut store, id, 1.0, features);
    }
    ColorFeatureIndex::new(store)
}

fn config(grid: u32, repeat_window: usize) -> MosaicConfig {
    MosaicConfig { grid, repeat_window, ..Default::default() }
}

#[rstest]
#[case(0)]
#[case(3)]
fn deterministic_plan(#[case] repeat_window: usize) {
    let index = random_index(42, 60, &[1.0]);
    let sampler = Gradient { aspect: 1.0 };
    let run = || TileAssigner::new(&index, config(6, repeat_window)).unwrap().run(&sampler).unwrap();

    let (a, b) = (run(), run());
    assert_eq!(a.plan, b.plan);
    assert_eq!(serde_json::to_vec(&a.plan).unwrap(), serde_json::to_vec(&b.plan).unwrap());
}

#[rstest]
#[case(1, 0)]
#[case(5, 0)]
#[case(5, 4)]
#[case(20, 0)]
fn plan_covers_every_tile(#[case] grid: u32, #[case] repeat_window: usize) {
    let index = random_index(7, 40, &[1.5]);
    let sampler = Gradient { aspect: 1.5 };
    let plan = TileAssigner::new(&index, config(grid, repeat_window)).unwrap().run(&sampler).unwrap().plan;

    assert_eq!(plan.len(), (grid * grid) as usize);
    assert!(plan.is_complete());
    let coords = plan.tiles.iter().map(|t| (t.x, t.y)).collect::<HashSet<_>>();
    assert_eq!(coords.len(), plan.len());
}

#[rstest]
#[case(0)]
#[case(2)]
fn selected_images_match_aspect(#[case] repeat_window: usize) {
    // 奇数 ID 为横图，偶数 ID 为竖图
    let index = random_index(3, 30, &[0.75, 1.5]);
    let sampler = Gradient { aspect: 1.5 };
    let assignment = TileAssigner::new(&index, config(8, repeat_window)).unwrap().run(&sampler).unwrap();

    for tile in &assignment.plan.tiles {
        let image = index.store().image(tile.image_id).unwrap();
        assert!((image.frame_aspect - 1.5).abs() < 0.1, "{:?}", image);
    }
}

#[test]
fn reused_images_match_aspect() {
    // 奇数 ID 宽高比为 2.0，偶数 ID 为 1.0，只有 3 张图片符合目标
    let index = random_index(11, 6, &[1.0, 2.0]);
    let sampler = Gradient { aspect: 1.0 };
    let assignment = TileAssigner::new(&index, config(3, 0)).unwrap().run(&sampler).unwrap();

    assert_eq!(assignment.reused.len(), 6);
    let eligible = |id: ImageId| (index.store().image(id).unwrap().frame_aspect - 1.0).abs() < 0.1;
    assert!(assignment.reused.iter().all(|e| eligible(e.image_id)), "{:?}", assignment.reused);
    assert!(assignment.plan.tiles.iter().all(|t| eligible(t.image_id)));
}

#[test]
fn partial_features_still_yield_candidates() {
    let mut store = MemoryStore::new();
    // 只有 0 级特征的图片仍然能被 0 级查询找到
    store.insert_image(ImageRecord { id: 1, path: "1.jpg".into(), frame_aspect: 1.0, active: true });
    store.insert_feature(1, FeatureVector::for_level(Level::L0, vec![0.5; 3]).unwrap());
    add_image(&mut store, 2, 2.0, Level::ALL.map(|level| vec![0.5; level.arity()]));
    let index = ColorFeatureIndex::new(store);

    let sampler = Gradient { aspect: 1.0 };
    let assignment = TileAssigner::new(&index, config(1, 0)).unwrap().run(&sampler).unwrap();
    assert_eq!(assignment.plan.get(0, 0), Some(1));
    assert!(assignment.reused.is_empty());
}

#[test]
fn no_candidate_when_every_level_is_empty() {
    let mut store = MemoryStore::new();
    // 符合宽高比的图片没有任何特征，有特征的图片宽高比不符
    store.insert_image(ImageRecord { id: 1, path: "1.jpg".into(), frame_aspect: 1.0, active: true });
    add_image(&mut store, 2, 2.0, Level::ALL.map(|level| vec![0.5; level.arity()]));
    let index = ColorFeatureIndex::new(store);

    let sampler = Gradient { aspect: 1.0 };
    let err = TileAssigner::new(&index, config(2, 0)).unwrap().run(&sampler).unwrap_err();
    assert_eq!(err, MosaicError::NoCandidateFound { x: 0, y: 0 });
}

#[test]
fn query_returns_non_decreasing_distance() {
    let mut store = MemoryStore::new();
    for (id, value) in [(1, 0.9), (2, 0.1), (3, 0.5), (4, 0.3), (5, 0.7)] {
        add_image(&mut store, id, 1.0, Level::ALL.map(|level| vec![value; level.arity()]));
    }
    let index = ColorFeatureIndex::new(store);

    let target = FeatureVector::for_level(Level::L0, vec![0.25, 0.25, 0.25]).unwrap();
    let exclude = HashSet::new();
    let query = Query { target: &target, aspect_ratio: 1.0, aspect_tolerance: 0.1, exclude: &exclude, limit: 5 };
    let result = index.query(0, &query).unwrap();

    assert_eq!(result.iter().map(|c| c.id).collect::<Vec<_>>(), [4, 2, 3, 5, 1]);
    assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn query_rejects_invalid_level() {
    let index = flat_index(&[1]);
    let target = FeatureVector::for_level(Level::L0, vec![0.0; 3]).unwrap();
    let exclude = HashSet::new();
    let query = Query { target: &target, aspect_ratio: 1.0, aspect_tolerance: 0.1, exclude: &exclude, limit: 1 };
    assert_eq!(index.query(3, &query).unwrap_err(), MosaicError::InvalidLevel(3));
}

#[test]
fn repeat_window_spreads_images() {
    let index = flat_index(&[1, 2, 3]);
    let sampler = Gradient { aspect: 1.0 };
    let assignment = TileAssigner::new(&index, config(3, 2)).unwrap().run(&sampler).unwrap();

    let ids = assignment.plan.tiles.iter().map(|t| t.image_id).collect::<Vec<_>>();
    for span in ids.windows(3) {
        assert!(span[0] != span[1] && span[1] != span[2] && span[0] != span[2], "{ids:?}");
    }
}

#[test]
fn repeat_window_larger_than_archive() {
    let index = flat_index(&[1, 2]);
    let sampler = Gradient { aspect: 1.0 };
    let err = TileAssigner::new(&index, config(3, 2)).unwrap().run(&sampler).unwrap_err();
    assert_eq!(err, MosaicError::NoCandidateFound { x: 2, y: 0 });
}

#[test]
fn fallback_is_deterministic() {
    let index = flat_index(&[1]);
    let sampler = Gradient { aspect: 1.0 };
    let run = || TileAssigner::new(&index, config(2, 0)).unwrap().run(&sampler).unwrap();

    let (a, b) = (run(), run());
    assert_eq!(a.plan, b.plan);
    assert!(a.plan.tiles.iter().all(|t| t.image_id == 1));
    assert_eq!(a.reused, b.reused);
    assert_eq!(a.reused.iter().map(|e| e.sequence).collect::<Vec<_>>(), [2, 3, 4]);
}
