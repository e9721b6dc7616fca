mod common;

use std::sync::atomic::Ordering;

use circuseyes::{
  PipelineBuilder, PipelineError,
  config::{ConfigError, PipelineConfig, Tuning},
  frame::{FrameError, PixelEncoding, RgbFrame},
  geometry::{BoundingBox, Roi, RoiKind},
  model::{DetectorAssets, Recognition},
  pipeline::{ROI_LABEL, RegionProposer, is_whole_frame_only},
  region::merge_boxes,
  segment::{BackgroundClass, BoundingProfile},
  stitch::Suppression,
  tiler::RegionTiler,
};
use common::{
  detector::ScriptedDetector,
  synthetic_frame::{GREEN, green_frame, green_frame_with_objects},
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn config() -> PipelineConfig {
  PipelineConfig::new(WIDTH, HEIGHT, BackgroundClass::Green, BoundingProfile::Standard)
}

fn proposer() -> RegionProposer {
  RegionProposer::new(
    BackgroundClass::Green,
    BoundingProfile::Standard,
    &Tuning::default(),
  )
}

fn close(a: &BoundingBox, b: &BoundingBox) -> bool {
  (a.x - b.x).abs() < 1e-2
    && (a.y - b.y).abs() < 1e-2
    && (a.width - b.width).abs() < 1e-2
    && (a.height - b.height).abs() < 1e-2
}

#[test]
fn uniform_background_yields_whole_frame_and_no_recognitions() {
  let detector = ScriptedDetector::new(WIDTH, Vec::new());
  let calls = detector.counter();
  let pipeline = PipelineBuilder::new(config()).build_with(detector).unwrap();

  let analysis = pipeline.run(green_frame(WIDTH, HEIGHT).as_image()).unwrap();
  assert!(is_whole_frame_only(&analysis.rois), "rois: {:?}", analysis.rois);
  assert_eq!(analysis.rois[0].bbox, BoundingBox::whole(WIDTH, HEIGHT));
  assert!(analysis.recognitions.is_empty());
  assert_eq!(calls.load(Ordering::SeqCst), 1, "whole frame must still be scanned");
}

#[test]
fn single_object_gets_one_padded_region() {
  let object = BoundingBox::new(300.0, 200.0, 40.0, 30.0);
  let frame = green_frame_with_objects(WIDTH, HEIGHT, &[(300, 200, 40, 30)]);

  let rois = proposer().propose(frame.as_image());
  assert_eq!(rois.len(), 1, "rois: {rois:?}");
  let roi = rois[0];
  assert_eq!(roi.kind, RoiKind::Merged);
  assert!(roi.bbox.contains(&object), "{} must cover the object", roi.bbox);
  assert!(roi.bbox.x <= 200.0 && roi.bbox.y <= 100.0, "margin missing: {}", roi.bbox);
  assert!(roi.bbox.right() >= 440.0 && roi.bbox.bottom() >= 330.0, "margin missing: {}", roi.bbox);
  assert!(roi.bbox.right() <= WIDTH as f32 && roi.bbox.bottom() <= HEIGHT as f32);
}

#[test]
fn distant_objects_stay_separate() {
  let frame = green_frame_with_objects(WIDTH, HEIGHT, &[(20, 20, 30, 30), (560, 400, 30, 30)]);
  let rois = proposer().propose(frame.as_image());
  assert_eq!(rois.len(), 2, "rois: {rois:?}");
  assert!(rois.iter().all(|r| r.kind == RoiKind::Merged));
  assert_ne!(rois[0].group, rois[1].group);
}

#[test]
fn nearby_objects_merge_into_their_union() {
  let frame = green_frame_with_objects(WIDTH, HEIGHT, &[(100, 100, 40, 40), (180, 100, 40, 40)]);
  let rois = proposer().propose(frame.as_image());
  assert_eq!(rois.len(), 1, "rois: {rois:?}");
  assert!(rois[0].bbox.contains(&BoundingBox::new(100.0, 100.0, 120.0, 40.0)));
}

#[test]
fn center_containment_merges_to_union() {
  let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
  let b = BoundingBox::new(60.0, 60.0, 60.0, 60.0);
  assert_eq!(merge_boxes(&[a, b]), vec![BoundingBox::new(0.0, 0.0, 120.0, 120.0)]);
}

#[test]
fn merging_is_idempotent() {
  let boxes = [
    BoundingBox::new(0.0, 0.0, 100.0, 100.0),
    BoundingBox::new(300.0, 0.0, 50.0, 50.0),
    BoundingBox::new(90.0, 10.0, 80.0, 40.0),
    BoundingBox::new(150.0, 0.0, 40.0, 40.0),
    BoundingBox::new(310.0, 10.0, 10.0, 10.0),
  ];
  let once = merge_boxes(&boxes);
  assert_eq!(merge_boxes(&once), once);
  for (i, a) in once.iter().enumerate() {
    for b in once.iter().skip(i + 1) {
      assert!(!a.is_inside(b) && !b.is_inside(a), "{a} and {b} should have merged");
    }
  }
}

#[test]
fn thin_outline_swallows_compact_object() {
  // 细长的 L 形轮廓面积小于方块，但外扩后的框覆盖了方块的框
  let frame = green_frame_with_objects(
    WIDTH,
    HEIGHT,
    &[(440, 300, 120, 120), (20, 20, 600, 1), (20, 20, 1, 440)],
  );
  let rois = proposer().merged_regions(frame.as_image());
  assert_eq!(rois.len(), 1, "rois: {rois:?}");
  assert_eq!(rois[0].bbox, BoundingBox::whole(WIDTH, HEIGHT));
  assert_eq!(rois[0].kind, RoiKind::Merged);
}

#[test]
fn merged_regions_never_nest() {
  let frame = green_frame_with_objects(
    WIDTH,
    HEIGHT,
    &[(440, 300, 120, 120), (20, 20, 1, 200), (20, 20, 200, 1), (300, 40, 30, 30)],
  );
  let rois = proposer().merged_regions(frame.as_image());
  for (i, a) in rois.iter().enumerate() {
    for b in rois.iter().skip(i + 1) {
      assert!(
        !a.bbox.is_inside(&b.bbox) && !b.bbox.is_inside(&a.bbox),
        "{} and {} nest",
        a.bbox,
        b.bbox
      );
    }
  }
}

#[test]
fn area_at_maximum_is_untiled_and_one_over_is_tiled() {
  let tiler = RegionTiler::new(10.0, 100.0);
  let exact = Roi::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0, RoiKind::Merged);
  assert_eq!(tiler.tile(&[exact]), vec![exact]);

  let over = Roi::new(BoundingBox::new(0.0, 0.0, 101.0, 1.0), 0, RoiKind::Merged);
  let tiles = tiler.tile(&[over]);
  assert_eq!(tiles.len(), 3, "tiles: {tiles:?}");
  assert_eq!(tiles[0], over);
  assert!(tiles[1..].iter().all(|t| t.kind == RoiKind::Tile && t.bbox.width == 50.0));
}

#[test]
fn recognitions_come_back_in_frame_space() {
  let detector = ScriptedDetector::new(
    WIDTH,
    vec![Recognition::new("bottle", 0.9, BoundingBox::new(0.0, 0.0, 320.0, 320.0))],
  );
  let pipeline = PipelineBuilder::new(config()).build_with(detector).unwrap();

  let recognitions = pipeline.analyze(&green_frame(WIDTH, HEIGHT)).unwrap();
  assert_eq!(recognitions.len(), 1);
  assert_eq!(recognitions[0].label(), "bottle");
  assert!(
    close(recognitions[0].bbox(), &BoundingBox::new(0.0, 0.0, 320.0, 240.0)),
    "{:?}",
    recognitions[0]
  );
}

#[test]
fn low_confidence_recognitions_are_dropped() {
  let detector = ScriptedDetector::new(
    64,
    vec![
      Recognition::new("low", 0.05, BoundingBox::new(0.0, 0.0, 8.0, 8.0)),
      Recognition::new("ok", 0.5, BoundingBox::new(0.0, 0.0, 8.0, 8.0)),
    ],
  );
  let pipeline = PipelineBuilder::new(config()).build_with(detector).unwrap();
  let recognitions = pipeline.analyze(&green_frame(WIDTH, HEIGHT)).unwrap();
  let labels: Vec<&str> = recognitions.iter().map(Recognition::label).collect();
  assert_eq!(labels, vec!["ok"]);
}

#[test]
fn wrong_frame_size_is_rejected() {
  let pipeline = PipelineBuilder::new(config())
    .build_with(ScriptedDetector::new(64, Vec::new()))
    .unwrap();
  let err = pipeline.analyze(&green_frame(320, 240)).unwrap_err();
  assert!(matches!(
    err,
    PipelineError::FrameSize {
      expected: (WIDTH, HEIGHT),
      actual: (320, 240)
    }
  ));
}

#[test]
fn raw_rgba_buffers_are_decoded() {
  let mut config = config();
  config.encoding = PixelEncoding::Rgba8888;
  let pipeline = PipelineBuilder::new(config)
    .build_with(ScriptedDetector::full_box(64, "can", 0.7))
    .unwrap();

  let pixel = [GREEN[0], GREEN[1], GREEN[2], 255];
  let buffer: Vec<u8> = pixel.repeat((WIDTH * HEIGHT) as usize);
  assert_eq!(pipeline.analyze_buffer(&buffer).unwrap().len(), 1);

  let err = pipeline.analyze_buffer(&buffer[1..]).unwrap_err();
  assert!(matches!(err, PipelineError::Frame(FrameError::LengthMismatch { .. })));
}

#[test]
fn roi_pseudo_recognitions_precede_their_results() {
  let pipeline = PipelineBuilder::new(config())
    .build_with(ScriptedDetector::full_box(64, "can", 0.7))
    .unwrap();
  let out = pipeline.analyze_with_rois(&green_frame(WIDTH, HEIGHT)).unwrap();
  assert_eq!(out.len(), 2);
  assert_eq!(out[0].label(), ROI_LABEL);
  assert_eq!(out[0].confidence(), 1.0);
  assert_eq!(*out[0].bbox(), BoundingBox::whole(WIDTH, HEIGHT));
  assert_eq!(out[1].label(), "can");
}

#[test]
fn preview_draws_regions_without_detecting() {
  let detector = ScriptedDetector::full_box(64, "can", 0.7);
  let calls = detector.counter();
  let pipeline = PipelineBuilder::new(config()).build_with(detector).unwrap();

  let mut buffer = GREEN.repeat((WIDTH * HEIGHT) as usize);
  let rois = pipeline.preview_buffer(&mut buffer).unwrap();
  assert!(is_whole_frame_only(&rois));
  assert_eq!(&buffer[..3], &[0, 0, 255], "border must be drawn");
  let center = ((HEIGHT / 2 * WIDTH + WIDTH / 2) * 3) as usize;
  assert_eq!(&buffer[center..center + 3], &GREEN);
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn preview_shows_the_merged_regions_of_the_proposer() {
  let pipeline = PipelineBuilder::new(config())
    .build_with(ScriptedDetector::new(64, Vec::new()))
    .unwrap();
  assert_eq!(pipeline.config().width, WIDTH);
  assert_eq!(pipeline.config().profile, BoundingProfile::Standard);

  let frame = green_frame_with_objects(WIDTH, HEIGHT, &[(300, 200, 40, 30)]);
  let (_, rois) = pipeline.preview(&frame).unwrap();
  assert_eq!(rois, pipeline.proposer().merged_regions(frame.as_image()));
  assert_eq!(pipeline.proposer(), &proposer());
}

#[test]
fn concurrent_calls_are_serialized() {
  let detector = ScriptedDetector::full_box(64, "can", 0.7);
  let calls = detector.counter();
  let pipeline = PipelineBuilder::new(config()).build_with(detector).unwrap();
  let frame = green_frame(WIDTH, HEIGHT);

  let results: Vec<Vec<Recognition>> = std::thread::scope(|scope| {
    let handles: Vec<_> = (0..4)
      .map(|_| scope.spawn(|| pipeline.analyze(&frame).unwrap()))
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  assert!(results.windows(2).all(|w| w[0] == w[1]));
  assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn overlapping_tiles_duplicate_unless_suppressed() {
  let mut config = PipelineConfig::new(200, 100, BackgroundClass::Green, BoundingProfile::Standard);
  config.input_size = Some(64);
  let tuning = Tuning {
    max_roi_area: 10_000.0,
    ..Tuning::default()
  };
  let frame = green_frame(200, 100);

  let plain = PipelineBuilder::new(config.clone())
    .tuning(tuning)
    .build_with(ScriptedDetector::full_box(64, "can", 0.8))
    .unwrap();
  // 整帧 + 2 个纵向半块 + 2 个横向半块 + 4 个四分块
  assert_eq!(plain.analyze(&frame).unwrap().len(), 9);

  let suppressed = PipelineBuilder::new(config)
    .tuning(Tuning {
      suppression: Suppression::NonMaxIou(0.3),
      ..tuning
    })
    .build_with(ScriptedDetector::full_box(64, "can", 0.8))
    .unwrap();
  let kept = suppressed.analyze(&frame).unwrap();
  assert!(!kept.is_empty() && kept.len() < 9, "kept {}", kept.len());
  for (i, a) in kept.iter().enumerate() {
    for b in kept.iter().skip(i + 1) {
      assert!(a.bbox().iou(b.bbox()) <= 0.3);
    }
  }
}

#[test]
fn invalid_tuning_is_rejected_at_build() {
  let err = PipelineBuilder::new(config())
    .tuning(Tuning {
      min_roi_area: 10.0,
      max_roi_area: 1.0,
      ..Tuning::default()
    })
    .build_with(ScriptedDetector::new(64, Vec::new()))
    .err()
    .unwrap();
  assert!(matches!(err, PipelineError::Config(ConfigError::Invalid(_))));
}

#[test]
fn detector_loading_needs_assets() {
  let err = PipelineBuilder::new(config())
    .build::<ScriptedDetector>()
    .err()
    .unwrap();
  assert!(matches!(err, PipelineError::MissingAssets));

  let mut missing = config();
  missing.assets = Some(DetectorAssets::new("model.bin", "/nonexistent/labels.txt"));
  let err = PipelineBuilder::new(missing)
    .build::<ScriptedDetector>()
    .err()
    .unwrap();
  assert!(matches!(err, PipelineError::DetectorLoad(_)));
}

#[test]
fn loaded_detector_uses_label_file() {
  let labels = std::env::temp_dir().join(format!("circuseyes-labels-{}.txt", std::process::id()));
  std::fs::write(&labels, "bottle\ncan\n").unwrap();

  let mut config = config();
  config.input_size = Some(64);
  config.assets = Some(DetectorAssets::new("model.bin", &labels));
  let pipeline = PipelineBuilder::new(config).build::<ScriptedDetector>().unwrap();

  let recognitions = pipeline.analyze(&green_frame(WIDTH, HEIGHT)).unwrap();
  assert_eq!(recognitions.len(), 1);
  assert_eq!(recognitions[0].label(), "bottle");
  let _ = std::fs::remove_file(&labels);
}

#[test]
fn crops_are_dumped_when_configured() {
  let root = std::env::temp_dir().join(format!("circuseyes-pipeline-dump-{}", std::process::id()));
  let config = PipelineConfig::new(64, 48, BackgroundClass::Green, BoundingProfile::Standard);
  let pipeline = PipelineBuilder::new(config)
    .dump_dir(&root)
    .build_with(ScriptedDetector::new(64, Vec::new()))
    .unwrap();

  pipeline.analyze(&green_frame(64, 48)).unwrap();
  let dirs: Vec<_> = std::fs::read_dir(&root).unwrap().collect();
  assert_eq!(dirs.len(), 1);
  let dir = dirs.into_iter().next().unwrap().unwrap().path();
  assert!(dir.join("roi_0_0_64x48.png").exists());
  let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn raw_frame_round_trips_through_rgb565() {
  let frame = green_frame(4, 4);
  let mut buffer = vec![0u8; PixelEncoding::Rgb565.buffer_len(4, 4)];
  frame.write_raw(PixelEncoding::Rgb565, &mut buffer).unwrap();
  let back = RgbFrame::from_raw(4, 4, PixelEncoding::Rgb565, &buffer).unwrap();
  // 565 量化误差
  let px = back.as_image().get_pixel(0, 0).0;
  assert_eq!(px[0], 0);
  assert!(px[1].abs_diff(GREEN[1]) <= 4);
}

#[test]
#[ignore = "切块互相重叠，默认拼接不去重，同一目标会在父区域与子块中重复出现"]
fn default_stitching_has_no_cross_region_duplicates() {
  let mut config = PipelineConfig::new(200, 100, BackgroundClass::Green, BoundingProfile::Standard);
  config.input_size = Some(64);
  let pipeline = PipelineBuilder::new(config)
    .tuning(Tuning {
      max_roi_area: 10_000.0,
      ..Tuning::default()
    })
    .build_with(ScriptedDetector::full_box(64, "can", 0.8))
    .unwrap();

  let recognitions = pipeline.analyze(&green_frame(200, 100)).unwrap();
  for (i, a) in recognitions.iter().enumerate() {
    for b in recognitions.iter().skip(i + 1) {
      assert!(a.bbox().iou(b.bbox()) <= 0.5, "duplicate: {a:?} / {b:?}");
    }
  }
}
