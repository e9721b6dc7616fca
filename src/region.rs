// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/region.rs - 轮廓提取与候选框合并
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

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::contour_area;
use imageproc::point::Point;
use tracing::debug;

use crate::geometry::{BoundingBox, Roi, RoiKind};

/// 默认外扩边距（像素）
pub const DEFAULT_ROI_MARGIN: f32 = 100.0;

/// 一条外轮廓的外接矩形与面积
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourBox {
  pub bbox: BoundingBox,
  pub area: f64,
}

/// 提取掩码中所有外轮廓
pub fn external_contours(mask: &GrayImage) -> Vec<ContourBox> {
  find_contours::<i32>(mask)
    .into_iter()
    .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
    .filter_map(|c| {
      let bbox = bounding_rect(&c.points)?;
      Some(ContourBox {
        bbox,
        area: contour_area(&c.points),
      })
    })
    .collect()
}

/// 包含所有点像素的最小矩形
fn bounding_rect(points: &[Point<i32>]) -> Option<BoundingBox> {
  let first = points.first()?;
  let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
  for p in &points[1..] {
    min_x = min_x.min(p.x);
    min_y = min_y.min(p.y);
    max_x = max_x.max(p.x);
    max_y = max_y.max(p.y);
  }
  Some(BoundingBox::from_corners(
    min_x as f32,
    min_y as f32,
    (max_x + 1) as f32,
    (max_y + 1) as f32,
  ))
}

/// 单轮合并：候选框依次与已接受的框比较，任一方落入另一方则并入，否则追加
fn merge_pass(candidates: &[BoundingBox]) -> Vec<BoundingBox> {
  let mut accepted: Vec<BoundingBox> = Vec::with_capacity(candidates.len());
  for candidate in candidates {
    match accepted
      .iter_mut()
      .find(|b| candidate.is_inside(b) || b.is_inside(candidate))
    {
      Some(b) => *b = b.union(candidate),
      None => accepted.push(*candidate),
    }
  }
  accepted
}

/// 反复合并直到不再变化。
///
/// 单轮合并后，被扩大的框可能覆盖了之前追加的框的中心，
/// 所以需要再跑一轮；数量不变即说明任意两框互不包含。
pub fn merge_boxes(candidates: &[BoundingBox]) -> Vec<BoundingBox> {
  let mut current = merge_pass(candidates);
  loop {
    let next = merge_pass(&current);
    if next.len() == current.len() {
      return next;
    }
    current = next;
  }
}

/// 从前景掩码中提取感兴趣区域
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionExtractor {
  margin: f32,
}

impl Default for RegionExtractor {
  fn default() -> Self {
    Self {
      margin: DEFAULT_ROI_MARGIN,
    }
  }
}

impl RegionExtractor {
  pub fn new(margin: f32) -> Self {
    Self { margin }
  }

  /// 结果永不为空：没有轮廓时返回整帧
  pub fn extract(&self, mask: &GrayImage) -> Vec<Roi> {
    let (width, height) = mask.dimensions();

    let mut contours = external_contours(mask);
    // 稳定排序，面积相同时保持轮廓发现顺序
    contours.sort_by(|a, b| b.area.total_cmp(&a.area));
    debug!("找到 {} 个外轮廓", contours.len());

    let padded: Vec<BoundingBox> = contours
      .iter()
      .map(|c| c.bbox.pad(self.margin, width, height))
      .collect();

    let merged = merge_boxes(&padded);
    if merged.is_empty() {
      debug!("没有前景区域，使用整帧");
      return vec![Roi::new(
        BoundingBox::whole(width, height),
        0,
        RoiKind::WholeFrame,
      )];
    }

    debug!("合并后剩余 {} 个区域", merged.len());
    merged
      .into_iter()
      .enumerate()
      .map(|(group, bbox)| Roi::new(bbox, group, RoiKind::Merged))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Luma;

  fn fill(mask: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
    for yy in y..y + h {
      for xx in x..x + w {
        mask.put_pixel(xx, yy, Luma([255]));
      }
    }
  }

  #[test]
  fn empty_mask_falls_back_to_whole_frame() {
    let rois = RegionExtractor::default().extract(&GrayImage::new(64, 48));
    assert_eq!(rois.len(), 1);
    assert_eq!(rois[0].bbox, BoundingBox::whole(64, 48));
    assert_eq!(rois[0].kind, RoiKind::WholeFrame);
  }

  #[test]
  fn contour_box_covers_blob() {
    let mut mask = GrayImage::new(40, 40);
    fill(&mut mask, 5, 7, 10, 4);
    let contours = external_contours(&mask);
    assert_eq!(contours.len(), 1);
    assert_eq!(contours[0].bbox, BoundingBox::new(5.0, 7.0, 10.0, 4.0));
    assert!(contours[0].area > 0.0);
  }

  #[test]
  fn holes_are_not_external() {
    let mut mask = GrayImage::new(40, 40);
    fill(&mut mask, 5, 5, 20, 20);
    for y in 10..15 {
      for x in 10..15 {
        mask.put_pixel(x, y, Luma([0]));
      }
    }
    assert_eq!(external_contours(&mask).len(), 1);
  }

  #[test]
  fn separated_blobs_stay_apart() {
    let mut mask = GrayImage::new(1000, 400);
    fill(&mut mask, 50, 50, 20, 20);
    fill(&mut mask, 800, 300, 20, 20);
    let rois = RegionExtractor::default().extract(&mask);
    assert_eq!(rois.len(), 2);
    assert!(rois.iter().all(|r| r.kind == RoiKind::Merged));
  }

  #[test]
  fn contained_box_is_absorbed_without_growth() {
    let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    let inner = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
    assert_eq!(merge_boxes(&[outer, inner]), vec![outer]);
  }

  #[test]
  fn center_hit_merges_to_union() {
    let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    let b = BoundingBox::new(50.0, 60.0, 90.0, 70.0);
    assert_eq!(
      merge_boxes(&[a, b]),
      vec![BoundingBox::from_corners(0.0, 0.0, 140.0, 130.0)]
    );
  }

  #[test]
  fn grown_box_swallows_earlier_neighbour() {
    // b 一开始不在 a 中，c 并入 a 之后 a 覆盖了 b 的中心
    let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    let b = BoundingBox::new(150.0, 0.0, 40.0, 40.0);
    let c = BoundingBox::new(30.0, 0.0, 140.0, 40.0);
    let merged = merge_boxes(&[a, b, c]);
    assert_eq!(merged, vec![BoundingBox::from_corners(0.0, 0.0, 190.0, 100.0)]);
    assert_eq!(merge_boxes(&merged), merged);
  }

  #[test]
  fn later_box_swallowing_earlier_one_merges() {
    // 细长轮廓面积小、外接框却很大，排在紧凑色块之后
    let blob = BoundingBox::new(340.0, 200.0, 300.0, 280.0);
    let thin = BoundingBox::new(0.0, 0.0, 640.0, 480.0);
    assert_eq!(merge_boxes(&[blob, thin]), vec![thin]);
  }

  #[test]
  fn thin_l_shape_encloses_compact_blob() {
    let mut mask = GrayImage::new(640, 480);
    fill(&mut mask, 440, 300, 120, 120);
    fill(&mut mask, 20, 20, 600, 2);
    fill(&mut mask, 20, 20, 2, 440);
    let contours = external_contours(&mask);
    assert_eq!(contours.len(), 2);

    let rois = RegionExtractor::default().extract(&mask);
    assert_eq!(rois.len(), 1, "rois: {rois:?}");
    assert_eq!(rois[0].bbox, BoundingBox::whole(640, 480));
  }
}
