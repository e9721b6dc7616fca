// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/morphology.rs - 掩码二值化与膨胀
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

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate};
use serde::{Deserialize, Serialize};

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// 结构元素边长上限，锚点坐标需能放进 `u8`
pub const MAX_KERNEL_SIDE: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
  /// 反向二值化阈值，不大于阈值的像素成为前景
  pub threshold: u8,
  /// 椭圆结构元素的宽
  pub kernel_width: u32,
  /// 椭圆结构元素的高
  pub kernel_height: u32,
  pub iterations: u32,
}

impl Default for MorphologyConfig {
  fn default() -> Self {
    Self {
      threshold: 128,
      kernel_width: 8,
      kernel_height: 3,
      iterations: 2,
    }
  }
}

/// 内切于 `width x height` 矩形的椭圆，非零像素属于结构元素
pub fn ellipse_kernel(width: u32, height: u32) -> GrayImage {
  let width = width.clamp(1, MAX_KERNEL_SIDE);
  let height = height.clamp(1, MAX_KERNEL_SIDE);
  let (w, h) = (width as i64, height as i64);
  let r = h / 2;
  let c = w / 2;
  let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

  let mut kernel = GrayImage::new(width, height);
  for i in 0..h {
    let dy = i - r;
    if dy.abs() > r {
      continue;
    }
    let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i64;
    for j in (c - dx).max(0)..(c + dx + 1).min(w) {
      kernel.put_pixel(j as u32, i as u32, Luma([FOREGROUND]));
    }
  }
  kernel
}

/// 锚点位于结构元素中心
fn centered_mask(kernel: &GrayImage) -> Mask {
  let ax = (kernel.width() / 2).min(MAX_KERNEL_SIDE) as u8;
  let ay = (kernel.height() / 2).min(MAX_KERNEL_SIDE) as u8;
  Mask::from_image(kernel, ax, ay)
}

/// 反向二值化：`src > threshold` 置 0，否则置 255
pub fn threshold_inverted(mask: &mut GrayImage, threshold: u8) {
  for p in mask.pixels_mut() {
    *p = if p.0[0] > threshold {
      Luma([BACKGROUND])
    } else {
      Luma([FOREGROUND])
    };
  }
}

/// 迭代膨胀，图像外部视为背景。`kernel` 边长不超过 `MAX_KERNEL_SIDE`
pub fn dilate(mask: &GrayImage, kernel: &GrayImage, iterations: u32) -> GrayImage {
  let element = centered_mask(kernel);
  let mut current = mask.clone();
  for _ in 0..iterations {
    current = grayscale_dilate(&current, &element);
  }
  current
}

/// 把背景掩码转为膨胀后的前景掩码
pub fn foreground_blobs(background: GrayImage, config: &MorphologyConfig) -> GrayImage {
  let mut mask = background;
  threshold_inverted(&mut mask, config.threshold);
  let kernel = ellipse_kernel(config.kernel_width, config.kernel_height);
  dilate(&mask, &kernel, config.iterations)
}
