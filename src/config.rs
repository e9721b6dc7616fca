// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/config.rs - 流水线配置与调参常量
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

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
  frame::PixelEncoding,
  model::DetectorAssets,
  morphology::{MAX_KERNEL_SIDE, MorphologyConfig},
  region::DEFAULT_ROI_MARGIN,
  segment::{BackgroundClass, BoundingProfile},
  stitch::{DEFAULT_MIN_CONFIDENCE, Suppression},
  tiler::{DEFAULT_MAX_ROI_AREA, DEFAULT_MIN_ROI_AREA},
  transform::Rotation,
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("配置文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("配置无效: {0}")]
  Invalid(String),
}

/// 调参常量。不同版本的取值互相矛盾，统一在构造时注入
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
  /// 轮廓框四边外扩的像素数
  pub roi_margin: f32,
  pub min_roi_area: f32,
  pub max_roi_area: f32,
  pub min_confidence: f32,
  pub morphology: MorphologyConfig,
  pub suppression: Suppression,
}

impl Default for Tuning {
  fn default() -> Self {
    Self {
      roi_margin: DEFAULT_ROI_MARGIN,
      min_roi_area: DEFAULT_MIN_ROI_AREA,
      max_roi_area: DEFAULT_MAX_ROI_AREA,
      min_confidence: DEFAULT_MIN_CONFIDENCE,
      morphology: MorphologyConfig::default(),
      suppression: Suppression::None,
    }
  }
}

impl Tuning {
  pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
    info!("加载调参文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let tuning: Tuning = serde_json::from_str(&text)?;
    tuning.validate()?;
    Ok(tuning)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(self.roi_margin >= 0.0) {
      return Err(ConfigError::Invalid(format!(
        "外扩边距必须非负: {}",
        self.roi_margin
      )));
    }
    if !(self.min_roi_area >= 0.0 && self.min_roi_area <= self.max_roi_area) {
      return Err(ConfigError::Invalid(format!(
        "区域面积范围无效: [{}, {}]",
        self.min_roi_area, self.max_roi_area
      )));
    }
    if !(0.0..=1.0).contains(&self.min_confidence) {
      return Err(ConfigError::Invalid(format!(
        "置信度阈值必须位于 [0, 1]: {}",
        self.min_confidence
      )));
    }
    let m = &self.morphology;
    if m.kernel_width == 0
      || m.kernel_height == 0
      || m.kernel_width > MAX_KERNEL_SIDE
      || m.kernel_height > MAX_KERNEL_SIDE
    {
      return Err(ConfigError::Invalid(format!(
        "结构元素尺寸无效: {}x{}",
        m.kernel_width, m.kernel_height
      )));
    }
    if let Suppression::NonMaxIou(threshold) = self.suppression
      && !(0.0..=1.0).contains(&threshold)
    {
      return Err(ConfigError::Invalid(format!(
        "IoU 阈值必须位于 [0, 1]: {}",
        threshold
      )));
    }
    Ok(())
  }
}

/// 流水线实例的构造参数，生命周期内不可更改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
  pub width: u32,
  pub height: u32,
  #[serde(default)]
  pub encoding: PixelEncoding,
  pub background: BackgroundClass,
  pub profile: BoundingProfile,
  #[serde(default)]
  pub rotation: Rotation,
  /// 检测器输入边长，缺省为帧宽高中的较大者
  #[serde(default)]
  pub input_size: Option<u32>,
  #[serde(default)]
  pub maintain_aspect: bool,
  #[serde(default)]
  pub assets: Option<DetectorAssets>,
}

impl PipelineConfig {
  /// 颜色表档案没有缺省值，必须显式给出
  pub fn new(width: u32, height: u32, background: BackgroundClass, profile: BoundingProfile) -> Self {
    Self {
      width,
      height,
      encoding: PixelEncoding::default(),
      background,
      profile,
      rotation: Rotation::default(),
      input_size: None,
      maintain_aspect: false,
      assets: None,
    }
  }

  pub fn detector_input_size(&self) -> u32 {
    self.input_size.unwrap_or(self.width.max(self.height))
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.width == 0 || self.height == 0 {
      return Err(ConfigError::Invalid(format!(
        "帧尺寸无效: {}x{}",
        self.width, self.height
      )));
    }
    if self.detector_input_size() == 0 {
      return Err(ConfigError::Invalid("检测器输入尺寸不能为 0".to_string()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    assert!(Tuning::default().validate().is_ok());
    let config = PipelineConfig::new(640, 480, BackgroundClass::Green, BoundingProfile::Standard);
    assert!(config.validate().is_ok());
    assert_eq!(config.detector_input_size(), 640);
  }

  #[test]
  fn partial_tuning_json_keeps_defaults() {
    let tuning: Tuning = serde_json::from_str(r#"{ "min_roi_area": 4096, "morphology": { "iterations": 3 } }"#).unwrap();
    assert_eq!(tuning.min_roi_area, 4096.0);
    assert_eq!(tuning.max_roi_area, DEFAULT_MAX_ROI_AREA);
    assert_eq!(tuning.morphology.iterations, 3);
    assert_eq!(tuning.morphology.kernel_width, 8);
  }

  #[test]
  fn suppression_is_opt_in_from_json() {
    let tuning: Tuning = serde_json::from_str(r#"{ "suppression": { "non_max_iou": 0.5 } }"#).unwrap();
    assert_eq!(tuning.suppression, Suppression::NonMaxIou(0.5));
  }

  #[test]
  fn inverted_area_range_is_rejected() {
    let tuning = Tuning {
      min_roi_area: 10.0,
      max_roi_area: 5.0,
      ..Tuning::default()
    };
    assert!(matches!(tuning.validate(), Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn oversized_kernel_is_rejected() {
    let mut tuning = Tuning::default();
    tuning.morphology.kernel_width = MAX_KERNEL_SIDE + 1;
    assert!(matches!(tuning.validate(), Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn config_requires_profile() {
    let missing = r#"{ "width": 10, "height": 10, "background": "green" }"#;
    assert!(serde_json::from_str::<PipelineConfig>(missing).is_err());
    let legacy = r#"{ "width": 10, "height": 10, "background": "gray", "profile": "legacy", "rotation": 270 }"#;
    let config: PipelineConfig = serde_json::from_str(legacy).unwrap();
    assert_eq!(config.profile, BoundingProfile::Legacy);
    assert_eq!(config.rotation, Rotation::Deg270);
  }
}
