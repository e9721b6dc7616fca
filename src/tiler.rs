// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/tiler.rs - 感兴趣区域面积过滤与切块
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

use tracing::debug;

use crate::geometry::{BoundingBox, Roi, RoiKind};

pub const DEFAULT_MIN_ROI_AREA: f32 = 2048.0;
pub const DEFAULT_MAX_ROI_AREA: f32 = 2048.0 * 1536.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionTiler {
  min_area: f32,
  max_area: f32,
}

impl Default for RegionTiler {
  fn default() -> Self {
    Self {
      min_area: DEFAULT_MIN_ROI_AREA,
      max_area: DEFAULT_MAX_ROI_AREA,
    }
  }
}

impl RegionTiler {
  pub fn new(min_area: f32, max_area: f32) -> Self {
    Self { min_area, max_area }
  }

  /// 过小的区域丢弃；超过上限的区域保留原区域并追加半块与四分块
  pub fn tile(&self, regions: &[Roi]) -> Vec<Roi> {
    let mut out = Vec::with_capacity(regions.len());
    for roi in regions {
      let area = roi.area();
      if area < self.min_area {
        debug!("丢弃过小区域 {} (面积 {:.0})", roi.bbox, area);
        continue;
      }
      out.push(*roi);
      if area > self.max_area {
        let before = out.len();
        split(roi, &mut out);
        debug!("区域 {} 过大，切分出 {} 块", roi.bbox, out.len() - before);
      }
    }
    out
  }
}

/// 沿一个维度按半长步进，直到子块越出父区域
fn steps(extent: f32) -> Vec<(f32, f32)> {
  let half = (extent / 2.0).floor();
  let mut out = Vec::new();
  if half <= 0.0 {
    return out;
  }
  let mut start = 0.0;
  while start + half <= extent {
    out.push((start, half));
    start += half;
  }
  out
}

fn split(roi: &Roi, out: &mut Vec<Roi>) {
  let b = roi.bbox;
  let columns = steps(b.width);
  let rows = steps(b.height);
  let tile = |bbox: BoundingBox| Roi::new(bbox, roi.group, RoiKind::Tile);

  for &(left, w) in &columns {
    out.push(tile(BoundingBox::new(b.x + left, b.y, w, b.height)));
  }
  for &(top, h) in &rows {
    out.push(tile(BoundingBox::new(b.x, b.y + top, b.width, h)));
  }
  for &(left, w) in &columns {
    for &(top, h) in &rows {
      out.push(tile(BoundingBox::new(b.x + left, b.y + top, w, h)));
    }
  }
}
