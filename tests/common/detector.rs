use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use circuseyes::{
  geometry::BoundingBox,
  model::{Detector, DetectorAssets, LabelError, Labels, LoadDetector, Recognition},
};
use image::RgbImage;

/// 对每个输入都返回同一组检测结果（检测器坐标空间）
#[derive(Debug, Default)]
pub struct ScriptedDetector {
  pub size: u32,
  pub results: Vec<Recognition>,
  pub calls: Arc<AtomicUsize>,
}

impl ScriptedDetector {
  pub fn new(size: u32, results: Vec<Recognition>) -> Self {
    Self {
      size,
      results,
      calls: Arc::new(AtomicUsize::new(0)),
    }
  }

  /// 覆盖整个检测器输入的一条结果
  pub fn full_box(size: u32, label: &str, confidence: f32) -> Self {
    Self::new(
      size,
      vec![Recognition::new(
        label,
        confidence,
        BoundingBox::whole(size, size),
      )],
    )
  }

  /// 检测器移入流水线后仍可读取调用次数
  pub fn counter(&self) -> Arc<AtomicUsize> {
    self.calls.clone()
  }
}

impl Detector for ScriptedDetector {
  type Error = LabelError;

  fn input_size(&self) -> u32 {
    self.size
  }

  fn detect(&mut self, image: &RgbImage) -> Result<Vec<Recognition>, Self::Error> {
    assert_eq!(image.dimensions(), (self.size, self.size), "detector input must be square");
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.results.clone())
  }
}

impl LoadDetector for ScriptedDetector {
  fn load(assets: &DetectorAssets, input_size: u32) -> Result<Self, Self::Error> {
    let labels = Labels::from_file(&assets.labels)?;
    let results = vec![Recognition::new(
      labels.name(0),
      0.9,
      BoundingBox::new(0.0, 0.0, 1.0, 1.0),
    )];
    Ok(Self::new(input_size, results))
  }
}
