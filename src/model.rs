// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/model.rs - 检测器接口与识别结果
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::geometry::BoundingBox;

/// 一条识别结果。标签与置信度由检测器给出后不再改变，
/// 只有矩形框会随坐标空间的转换被改写
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
  label: String,
  confidence: f32,
  bbox: BoundingBox,
}

impl Recognition {
  /// 置信度被限制在 `[0, 1]`
  pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
    Self {
      label: label.into(),
      confidence: confidence.clamp(0.0, 1.0),
      bbox,
    }
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn bbox(&self) -> &BoundingBox {
    &self.bbox
  }

  /// 换到另一个坐标空间
  pub fn relocate(self, bbox: BoundingBox) -> Self {
    Self { bbox, ..self }
  }
}

/// 外部目标检测器。输入为 `input_size x input_size` 的图像，
/// 输出框位于同一坐标空间
pub trait Detector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn input_size(&self) -> u32;
  fn detect(&mut self, image: &RgbImage) -> Result<Vec<Recognition>, Self::Error>;
}

/// 可以从模型与标签文件构造的检测器
pub trait LoadDetector: Detector + Sized {
  fn load(assets: &DetectorAssets, input_size: u32) -> Result<Self, Self::Error>;
}

/// 检测器的模型与标签文件路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorAssets {
  pub model: PathBuf,
  pub labels: PathBuf,
}

impl DetectorAssets {
  pub fn new(model: impl Into<PathBuf>, labels: impl Into<PathBuf>) -> Self {
    Self {
      model: model.into(),
      labels: labels.into(),
    }
  }
}

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件为空: {0}")]
  Empty(PathBuf),
}

/// 类别编号到名称的映射，每行一个标签
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Labels {
  names: Vec<String>,
}

impl Labels {
  pub fn from_file(path: &Path) -> Result<Self, LabelError> {
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let labels = Self::parse(&text);
    if labels.is_empty() {
      return Err(LabelError::Empty(path.to_path_buf()));
    }
    debug!("标签数量: {}", labels.len());
    Ok(labels)
  }

  /// 跳过空行，保留 `???` 之类的占位标签以维持编号
  pub fn parse(text: &str) -> Self {
    let names = text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(String::from)
      .collect();
    Self { names }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 未知编号返回 `"unknown"`
  pub fn name(&self, class_id: usize) -> &str {
    self.names.get(class_id).map(String::as_str).unwrap_or("unknown")
  }
}
