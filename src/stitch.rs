// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/stitch.rs - 逐区域检测与结果拼接
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

use std::time::Instant;

use image::{Rgb, RgbImage, imageops};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
  geometry::Roi,
  model::{Detector, Recognition},
  transform::{Rotation, Transform, crop_to_detector},
};

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.1;

/// 跨区域去重。切块互相重叠，同一目标可能在多个区域中被检出
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suppression {
  /// 不去重，保持所有区域的结果
  #[default]
  None,
  /// 同标签按置信度贪心保留，IoU 超过阈值的丢弃
  NonMaxIou(f32),
}

impl Suppression {
  pub fn apply(&self, recognitions: Vec<Recognition>) -> Vec<Recognition> {
    let Suppression::NonMaxIou(threshold) = *self else {
      return recognitions;
    };

    let mut ordered = recognitions;
    ordered.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));

    let mut kept: Vec<Recognition> = Vec::with_capacity(ordered.len());
    for candidate in ordered {
      let overlapped = kept.iter().any(|k| {
        k.label() == candidate.label() && k.bbox().iou(candidate.bbox()) > threshold
      });
      if !overlapped {
        kept.push(candidate);
      }
    }
    kept
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stitcher {
  rotation: Rotation,
  maintain_aspect: bool,
  min_confidence: f32,
}

impl Default for Stitcher {
  fn default() -> Self {
    Self {
      rotation: Rotation::Deg0,
      maintain_aspect: false,
      min_confidence: DEFAULT_MIN_CONFIDENCE,
    }
  }
}

impl Stitcher {
  pub fn new(rotation: Rotation, maintain_aspect: bool, min_confidence: f32) -> Self {
    Self {
      rotation,
      maintain_aspect,
      min_confidence,
    }
  }

  /// 把裁剪图绘制到检测器输入上，返回输入图与从检测器空间回到裁剪图空间的逆变换
  pub fn warp(&self, crop: &RgbImage, input_size: u32) -> Option<(RgbImage, Transform)> {
    let forward = crop_to_detector(
      crop.width(),
      crop.height(),
      input_size,
      self.rotation,
      self.maintain_aspect,
    );
    let inverse = forward.inverse()?;
    let projection = Projection::from_matrix(forward.to_row_major())?;

    let mut input = RgbImage::new(input_size, input_size);
    warp_into(
      crop,
      &projection,
      Interpolation::Bilinear,
      Rgb([0, 0, 0]),
      &mut input,
    );
    Some((input, inverse))
  }

  /// 在裁剪图上检测，结果位于裁剪图坐标空间
  pub fn recognize<D: Detector>(
    &self,
    detector: &mut D,
    crop: &RgbImage,
  ) -> Result<Vec<Recognition>, D::Error> {
    let Some((input, inverse)) = self.warp(crop, detector.input_size()) else {
      warn!("{}x{} 的裁剪图无法映射到检测器输入", crop.width(), crop.height());
      return Ok(Vec::new());
    };

    let results = detector
      .detect(&input)?
      .into_iter()
      .filter(|r| r.confidence() >= self.min_confidence)
      .map(|r| {
        let bbox = inverse.map_box(r.bbox()).clip(crop.width(), crop.height());
        r.relocate(bbox)
      })
      .collect();
    Ok(results)
  }

  /// 在单个区域上检测，结果位于整帧坐标空间。
  /// 检测失败只影响本区域
  pub fn recognize_roi<D: Detector>(
    &self,
    detector: &mut D,
    frame: &RgbImage,
    roi: &Roi,
  ) -> Vec<Recognition> {
    let Some((x, y, w, h)) = roi.bbox.to_pixel_rect(frame.width(), frame.height()) else {
      debug!("区域 {} 面积为零，跳过", roi.bbox);
      return Vec::new();
    };

    let now = Instant::now();
    let crop = imageops::crop_imm(frame, x, y, w, h).to_image();
    let results = match self.recognize(detector, &crop) {
      Ok(results) => results,
      Err(e) => {
        warn!("区域 {} 检测失败: {}", roi.bbox, e);
        return Vec::new();
      }
    };
    debug!(
      "区域 {} 检测到 {} 个目标，耗时: {:.2?}",
      roi.bbox,
      results.len(),
      now.elapsed()
    );

    results
      .into_iter()
      .map(|r| {
        let bbox = r.bbox().offset(x as f32, y as f32);
        r.relocate(bbox)
      })
      .collect()
  }

  /// 依次处理所有区域并按区域顺序拼接
  pub fn stitch<D: Detector>(
    &self,
    detector: &mut D,
    frame: &RgbImage,
    rois: &[Roi],
  ) -> Vec<Recognition> {
    rois
      .iter()
      .flat_map(|roi| self.recognize_roi(detector, frame, roi))
      .collect()
  }
}
