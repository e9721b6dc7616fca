// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/geometry.rs - 矩形框与感兴趣区域
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

use serde::{Deserialize, Serialize};

/// 轴对齐矩形框，原点在左上角，宽高永远非负
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BoundingBox {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width: width.max(0.0),
      height: height.max(0.0),
    }
  }

  /// 由左上角与右下角构造；角点顺序颠倒时得到空框
  pub fn from_corners(left: f32, top: f32, right: f32, bottom: f32) -> Self {
    Self::new(left, top, right - left, bottom - top)
  }

  /// 覆盖整幅图像的矩形框
  pub fn whole(width: u32, height: u32) -> Self {
    Self::new(0.0, 0.0, width as f32, height as f32)
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }

  pub fn area(&self) -> f32 {
    self.width * self.height
  }

  pub fn center(&self) -> (f32, f32) {
    (self.x + self.width / 2.0, self.y + self.height / 2.0)
  }

  pub fn is_empty(&self) -> bool {
    self.width <= 0.0 || self.height <= 0.0
  }

  /// 点是否落在框内（含边界）
  pub fn contains_point(&self, x: f32, y: f32) -> bool {
    x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
  }

  /// 四个角点是否都落在框内
  pub fn contains(&self, other: &BoundingBox) -> bool {
    self.contains_point(other.x, other.y) && self.contains_point(other.right(), other.bottom())
  }

  /// 合并判定：完全包含，或者中心点落在框内
  pub fn is_inside(&self, other: &BoundingBox) -> bool {
    if other.contains(self) {
      return true;
    }
    let (cx, cy) = self.center();
    other.contains_point(cx, cy)
  }

  /// 同时覆盖两个框的最小框
  pub fn union(&self, other: &BoundingBox) -> BoundingBox {
    BoundingBox::from_corners(
      self.x.min(other.x),
      self.y.min(other.y),
      self.right().max(other.right()),
      self.bottom().max(other.bottom()),
    )
  }

  pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
    let left = self.x.max(other.x);
    let top = self.y.max(other.y);
    let right = self.right().min(other.right());
    let bottom = self.bottom().min(other.bottom());
    if right <= left || bottom <= top {
      return None;
    }
    Some(BoundingBox::from_corners(left, top, right, bottom))
  }

  pub fn iou(&self, other: &BoundingBox) -> f32 {
    let Some(inter) = self.intersection(other) else {
      return 0.0;
    };
    let union = self.area() + other.area() - inter.area();
    if union <= 0.0 {
      return 0.0;
    }
    inter.area() / union
  }

  /// 裁剪到 `[0, width] x [0, height]` 范围内
  pub fn clip(&self, width: u32, height: u32) -> BoundingBox {
    let (w, h) = (width as f32, height as f32);
    let left = self.x.clamp(0.0, w);
    let top = self.y.clamp(0.0, h);
    let right = self.right().clamp(0.0, w);
    let bottom = self.bottom().clamp(0.0, h);
    BoundingBox::from_corners(left, top, right, bottom)
  }

  /// 四边各向外扩展 `margin`，再裁剪到图像范围
  pub fn pad(&self, margin: f32, width: u32, height: u32) -> BoundingBox {
    BoundingBox::from_corners(
      self.x - margin,
      self.y - margin,
      self.right() + margin,
      self.bottom() + margin,
    )
    .clip(width, height)
  }

  pub fn offset(&self, dx: f32, dy: f32) -> BoundingBox {
    BoundingBox {
      x: self.x + dx,
      y: self.y + dy,
      ..*self
    }
  }

  /// 取整为像素矩形 `(x, y, w, h)`，保证不越出图像。面积为零时返回 `None`
  pub fn to_pixel_rect(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let clipped = self.clip(width, height);
    let x = (clipped.x.round() as u32).min(width);
    let y = (clipped.y.round() as u32).min(height);
    let w = (clipped.width.round() as u32).min(width - x);
    let h = (clipped.height.round() as u32).min(height - y);
    if w == 0 || h == 0 {
      return None;
    }
    Some((x, y, w, h))
  }
}

impl std::fmt::Display for BoundingBox {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "[{:.0},{:.0}][{:.0},{:.0}]",
      self.x,
      self.y,
      self.right(),
      self.bottom()
    )
  }
}

/// 感兴趣区域的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiKind {
  /// 没有找到前景时的整帧兜底
  WholeFrame,
  /// 轮廓框合并得到的区域
  Merged,
  /// 超大区域切分出的子块
  Tile,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roi {
  pub bbox: BoundingBox,
  /// 产生该区域的合并组序号，子块沿用父区域的序号
  pub group: usize,
  pub kind: RoiKind,
}

impl Roi {
  pub fn new(bbox: BoundingBox, group: usize, kind: RoiKind) -> Self {
    Self { bbox, group, kind }
  }

  pub fn area(&self) -> f32 {
    self.bbox.area()
  }
}
