// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/pipeline.rs - 区域提议与检测拼接流水线
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 CircusEyes Authors

#[cfg(feature = "debug_dump")]
use std::path::PathBuf;
use std::{convert::Infallible, sync::Mutex, time::Instant};

use image::{GrayImage, RgbImage};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
#[cfg(feature = "debug_dump")]
use tracing::warn;

#[cfg(feature = "debug_dump")]
use crate::debug_dump::CropDump;
use crate::{
  config::{ConfigError, PipelineConfig, Tuning},
  frame::{FrameError, RgbFrame},
  geometry::{Roi, RoiKind},
  model::{Detector, LoadDetector, Recognition},
  morphology::{self, MorphologyConfig},
  output::draw::Draw,
  region::RegionExtractor,
  segment::{self, BackgroundClass, BoundingProfile, HsvRange},
  stitch::{Stitcher, Suppression},
  tiler::RegionTiler,
};

/// 区域伪识别结果的标签
pub const ROI_LABEL: &str = "roi";

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("未配置检测器的模型与标签文件")]
  MissingAssets,
  #[error("检测器加载失败: {0}")]
  DetectorLoad(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("帧错误: {0}")]
  Frame(#[from] FrameError),
  #[error("帧尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  FrameSize {
    expected: (u32, u32),
    actual: (u32, u32),
  },
  #[error("检测器在之前的调用中崩溃")]
  DetectorPoisoned,
}

/// 一帧的分析结果，识别结果位于整帧坐标空间
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analysis {
  pub rois: Vec<Roi>,
  pub recognitions: Vec<Recognition>,
}

/// 以帧为单位的分析能力，供任务循环使用
pub trait Analyze {
  type Error;
  fn analyze_frame(&self, frame: &RgbFrame) -> Result<Analysis, Self::Error>;
}

impl<T: Analyze + ?Sized> Analyze for &T {
  type Error = T::Error;

  fn analyze_frame(&self, frame: &RgbFrame) -> Result<Analysis, Self::Error> {
    (**self).analyze_frame(frame)
  }
}

/// 颜色分割、形态学、轮廓合并与切块，不依赖检测器
#[derive(Debug, Clone, PartialEq)]
pub struct RegionProposer {
  range: HsvRange,
  morphology: MorphologyConfig,
  extractor: RegionExtractor,
  tiler: RegionTiler,
}

impl RegionProposer {
  pub fn new(background: BackgroundClass, profile: BoundingProfile, tuning: &Tuning) -> Self {
    crate::init();
    Self {
      range: profile.range(background),
      morphology: tuning.morphology,
      extractor: RegionExtractor::new(tuning.roi_margin),
      tiler: RegionTiler::new(tuning.min_roi_area, tuning.max_roi_area),
    }
  }

  /// 膨胀后的前景掩码
  pub fn foreground_mask(&self, image: &RgbImage) -> GrayImage {
    let background = segment::background_mask(image, &self.range);
    morphology::foreground_blobs(background, &self.morphology)
  }

  /// 合并后的区域，永不为空
  pub fn merged_regions(&self, image: &RgbImage) -> Vec<Roi> {
    self.extractor.extract(&self.foreground_mask(image))
  }

  /// 过滤并切块后的区域，可以为空（全部过小）
  pub fn propose(&self, image: &RgbImage) -> Vec<Roi> {
    let now = Instant::now();
    let merged = self.merged_regions(image);
    let rois = self.tiler.tile(&merged);
    debug!(
      "{} 个合并区域，{} 个待检测区域，耗时: {:.2?}",
      merged.len(),
      rois.len(),
      now.elapsed()
    );
    rois
  }
}

impl Analyze for RegionProposer {
  type Error = Infallible;

  fn analyze_frame(&self, frame: &RgbFrame) -> Result<Analysis, Self::Error> {
    Ok(Analysis {
      rois: self.propose(frame.as_image()),
      recognitions: Vec::new(),
    })
  }
}

pub struct PipelineBuilder {
  config: PipelineConfig,
  tuning: Tuning,
  #[cfg(feature = "debug_dump")]
  dump_dir: Option<PathBuf>,
}

impl PipelineBuilder {
  pub fn new(config: PipelineConfig) -> Self {
    Self {
      config,
      tuning: Tuning::default(),
      #[cfg(feature = "debug_dump")]
      dump_dir: None,
    }
  }

  pub fn tuning(mut self, tuning: Tuning) -> Self {
    self.tuning = tuning;
    self
  }

  /// 把每个区域的裁剪图写到该目录下，仅用于离线调参
  #[cfg(feature = "debug_dump")]
  pub fn dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.dump_dir = Some(dir.into());
    self
  }

  /// 从配置中的模型与标签文件加载检测器
  pub fn build<D: LoadDetector>(self) -> Result<Pipeline<D>, PipelineError> {
    self.config.validate()?;
    let assets = self.config.assets.as_ref().ok_or(PipelineError::MissingAssets)?;
    info!(
      "加载检测器: 模型 {}, 标签 {}",
      assets.model.display(),
      assets.labels.display()
    );
    let detector = D::load(assets, self.config.detector_input_size())
      .map_err(|e| PipelineError::DetectorLoad(Box::new(e)))?;
    self.build_with(detector)
  }

  /// 使用已经构造好的检测器
  pub fn build_with<D: Detector>(self, detector: D) -> Result<Pipeline<D>, PipelineError> {
    self.config.validate()?;
    self.tuning.validate()?;

    let proposer = RegionProposer::new(self.config.background, self.config.profile, &self.tuning);
    let stitcher = Stitcher::new(
      self.config.rotation,
      self.config.maintain_aspect,
      self.tuning.min_confidence,
    );

    info!(
      "流水线就绪: {}x{}, 背景 {:?}, 检测器输入 {}",
      self.config.width,
      self.config.height,
      self.config.background,
      detector.input_size()
    );

    Ok(Pipeline {
      #[cfg(feature = "debug_dump")]
      dump: self
        .dump_dir
        .map(|root| CropDump::new(root, self.tuning.min_roi_area)),
      config: self.config,
      proposer,
      stitcher,
      suppression: self.tuning.suppression,
      detector: Mutex::new(detector),
    })
  }
}

/// 流水线实例。同一实例上的分析调用串行执行
pub struct Pipeline<D> {
  config: PipelineConfig,
  proposer: RegionProposer,
  stitcher: Stitcher,
  suppression: Suppression,
  detector: Mutex<D>,
  #[cfg(feature = "debug_dump")]
  dump: Option<CropDump>,
}

impl<D: Detector> Pipeline<D> {
  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn proposer(&self) -> &RegionProposer {
    &self.proposer
  }

  fn check_size(&self, image: &RgbImage) -> Result<(), PipelineError> {
    let expected = (self.config.width, self.config.height);
    let actual = image.dimensions();
    if expected != actual {
      return Err(PipelineError::FrameSize { expected, actual });
    }
    Ok(())
  }

  /// 完整流程：提议区域，逐区域检测并拼接
  pub fn run(&self, image: &RgbImage) -> Result<Analysis, PipelineError> {
    self.check_size(image)?;
    let mut detector = self
      .detector
      .lock()
      .map_err(|_| PipelineError::DetectorPoisoned)?;

    let now = Instant::now();
    let rois = self.proposer.propose(image);

    #[cfg(feature = "debug_dump")]
    if let Some(dump) = &self.dump
      && let Err(e) = dump.dump(image, &rois)
    {
      warn!("保存区域裁剪图失败: {}", e);
    }

    let recognitions = self
      .suppression
      .apply(self.stitcher.stitch(&mut *detector, image, &rois));
    info!(
      "{} 个区域，{} 个识别结果，耗时: {:.2?}",
      rois.len(),
      recognitions.len(),
      now.elapsed()
    );

    Ok(Analysis { rois, recognitions })
  }

  pub fn analyze(&self, frame: &RgbFrame) -> Result<Vec<Recognition>, PipelineError> {
    Ok(self.run(frame.as_image())?.recognitions)
  }

  /// 按构造时的编码解码原始缓冲区后分析
  pub fn analyze_buffer(&self, data: &[u8]) -> Result<Vec<Recognition>, PipelineError> {
    let frame = RgbFrame::from_raw(self.config.width, self.config.height, self.config.encoding, data)?;
    self.analyze(&frame)
  }

  /// 每个区域先输出一条置信度为 1 的伪识别结果，再跟随该区域内的识别结果
  pub fn analyze_with_rois(&self, frame: &RgbFrame) -> Result<Vec<Recognition>, PipelineError> {
    let image = frame.as_image();
    self.check_size(image)?;
    let mut detector = self
      .detector
      .lock()
      .map_err(|_| PipelineError::DetectorPoisoned)?;

    let mut out = Vec::new();
    for roi in self.proposer.propose(image) {
      out.push(Recognition::new(ROI_LABEL, 1.0, roi.bbox));
      out.extend(self.stitcher.recognize_roi(&mut *detector, image, &roi));
    }
    Ok(out)
  }

  /// 预览模式：只提议区域并画在帧上，不调用检测器
  pub fn preview(&self, frame: &RgbFrame) -> Result<(RgbImage, Vec<Roi>), PipelineError> {
    let image = frame.as_image();
    self.check_size(image)?;
    let rois = self.proposer.merged_regions(image);
    let mut canvas = image.clone();
    Draw::default().draw_rois(&mut canvas, &rois);
    Ok((canvas, rois))
  }

  /// 预览模式的原始缓冲区版本，区域框直接画回缓冲区
  pub fn preview_buffer(&self, data: &mut [u8]) -> Result<Vec<Roi>, PipelineError> {
    let encoding = self.config.encoding;
    let frame = RgbFrame::from_raw(self.config.width, self.config.height, encoding, data)?;
    let (canvas, rois) = self.preview(&frame)?;
    RgbFrame::from(canvas).write_raw(encoding, data)?;
    Ok(rois)
  }
}

impl<D: Detector> Analyze for Pipeline<D> {
  type Error = PipelineError;

  fn analyze_frame(&self, frame: &RgbFrame) -> Result<Analysis, Self::Error> {
    self.run(frame.as_image())
  }
}

/// 整帧兜底区域是否为唯一结果
pub fn is_whole_frame_only(rois: &[Roi]) -> bool {
  matches!(rois, [only] if only.kind == RoiKind::WholeFrame)
}
