// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/segment.rs - 背景颜色分割
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

use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

pub mod hsv;

/// 背景颜色类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundClass {
  Green,
  Red,
  Blue,
  Black,
  Gray,
  White,
}

/// HSV 空间中的闭区间 `[lower, upper]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
  pub lower: [u8; 3],
  pub upper: [u8; 3],
}

impl HsvRange {
  pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
    Self { lower, upper }
  }

  pub fn contains(&self, hsv: [u8; 3]) -> bool {
    (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
  }
}

/// 每种背景颜色对应一个 HSV 区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingTable {
  pub green: HsvRange,
  pub red: HsvRange,
  pub blue: HsvRange,
  pub black: HsvRange,
  pub gray: HsvRange,
  pub white: HsvRange,
}

impl BoundingTable {
  /// 常用 HSV 颜色表
  pub const STANDARD: BoundingTable = BoundingTable {
    green: HsvRange::new([35, 43, 46], [77, 255, 255]),
    red: HsvRange::new([0, 43, 46], [10, 255, 255]),
    blue: HsvRange::new([100, 43, 46], [124, 255, 255]),
    black: HsvRange::new([0, 0, 0], [180, 255, 46]),
    gray: HsvRange::new([0, 0, 46], [180, 43, 220]),
    white: HsvRange::new([0, 0, 221], [180, 30, 255]),
  };

  /// 已部署检测器使用的颜色表。该表没有灰色一项，灰色沿用常用表
  pub const LEGACY: BoundingTable = BoundingTable {
    green: HsvRange::new([35, 43, 46], [99, 255, 255]),
    red: HsvRange::new([0, 43, 46], [10, 255, 255]),
    blue: HsvRange::new([100, 43, 46], [124, 255, 255]),
    black: HsvRange::new([0, 0, 0], [180, 255, 220]),
    gray: BoundingTable::STANDARD.gray,
    white: HsvRange::new([0, 0, 46], [180, 43, 255]),
  };

  pub fn range(&self, class: BackgroundClass) -> HsvRange {
    match class {
      BackgroundClass::Green => self.green,
      BackgroundClass::Red => self.red,
      BackgroundClass::Blue => self.blue,
      BackgroundClass::Black => self.black,
      BackgroundClass::Gray => self.gray,
      BackgroundClass::White => self.white,
    }
  }
}

/// 颜色表档案。不同版本的调参结果互相矛盾，必须由调用方显式选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BoundingProfile {
  Standard,
  Legacy,
  #[value(skip)]
  Custom(BoundingTable),
}

impl BoundingProfile {
  pub fn table(&self) -> BoundingTable {
    match self {
      BoundingProfile::Standard => BoundingTable::STANDARD,
      BoundingProfile::Legacy => BoundingTable::LEGACY,
      BoundingProfile::Custom(table) => *table,
    }
  }

  pub fn range(&self, class: BackgroundClass) -> HsvRange {
    self.table().range(class)
  }
}

/// 生成与原图同尺寸的掩码：背景像素为 255，其余为 0
pub fn background_mask(image: &RgbImage, range: &HsvRange) -> GrayImage {
  let mut mask = GrayImage::new(image.width(), image.height());
  for (src, dst) in image.pixels().zip(mask.pixels_mut()) {
    let [r, g, b] = src.0;
    if range.contains(hsv::rgb_to_hsv(r, g, b)) {
      *dst = Luma([255]);
    }
  }
  mask
}
