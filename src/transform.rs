// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/transform.rs - 裁剪/旋转/缩放仿射变换
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

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::BoundingBox;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransformError {
  #[error("不支持的旋转角度: {0}，只支持 90 的整数倍")]
  UnsupportedRotation(i32),
}

/// 顺时针旋转角度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
  #[default]
  Deg0,
  Deg90,
  Deg180,
  Deg270,
}

impl Rotation {
  pub fn degrees(&self) -> i32 {
    match self {
      Rotation::Deg0 => 0,
      Rotation::Deg90 => 90,
      Rotation::Deg180 => 180,
      Rotation::Deg270 => 270,
    }
  }

  /// 90 与 270 度会交换宽高
  pub fn is_transposed(&self) -> bool {
    matches!(self, Rotation::Deg90 | Rotation::Deg270)
  }

  /// 由屏幕旋转角推导传感器方向：传感器默认横置，相对竖屏偏 90 度
  pub fn from_display(display_degrees: i32) -> Result<Self, TransformError> {
    Rotation::try_from(90 - display_degrees)
  }

  /// 精确的 `(cos, sin)`，避免三角函数带来的舍入误差
  fn cos_sin(&self) -> (f64, f64) {
    match self {
      Rotation::Deg0 => (1.0, 0.0),
      Rotation::Deg90 => (0.0, 1.0),
      Rotation::Deg180 => (-1.0, 0.0),
      Rotation::Deg270 => (0.0, -1.0),
    }
  }
}

impl TryFrom<i32> for Rotation {
  type Error = TransformError;

  fn try_from(degrees: i32) -> Result<Self, Self::Error> {
    match degrees.rem_euclid(360) {
      0 => Ok(Rotation::Deg0),
      90 => Ok(Rotation::Deg90),
      180 => Ok(Rotation::Deg180),
      270 => Ok(Rotation::Deg270),
      _ => Err(TransformError::UnsupportedRotation(degrees)),
    }
  }
}

impl From<Rotation> for i32 {
  fn from(rotation: Rotation) -> Self {
    rotation.degrees()
  }
}

/// 二维仿射变换，齐次坐标下的 3x3 矩阵
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
  matrix: Matrix3<f64>,
}

impl Default for Transform {
  fn default() -> Self {
    Self::identity()
  }
}

impl Transform {
  pub fn identity() -> Self {
    Self {
      matrix: Matrix3::identity(),
    }
  }

  pub fn translation(tx: f64, ty: f64) -> Self {
    Self {
      matrix: Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0),
    }
  }

  pub fn rotation(rotation: Rotation) -> Self {
    let (cos, sin) = rotation.cos_sin();
    Self {
      matrix: Matrix3::new(cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0),
    }
  }

  pub fn scale(sx: f64, sy: f64) -> Self {
    Self {
      matrix: Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0),
    }
  }

  /// 先应用 `self`，再应用 `next`
  pub fn then(self, next: Transform) -> Transform {
    Transform {
      matrix: next.matrix * self.matrix,
    }
  }

  pub fn post_translate(self, tx: f64, ty: f64) -> Transform {
    self.then(Transform::translation(tx, ty))
  }

  pub fn post_rotate(self, rotation: Rotation) -> Transform {
    self.then(Transform::rotation(rotation))
  }

  pub fn post_scale(self, sx: f64, sy: f64) -> Transform {
    self.then(Transform::scale(sx, sy))
  }

  /// 缩放为零时不可逆
  pub fn inverse(&self) -> Option<Transform> {
    self
      .matrix
      .try_inverse()
      .map(|matrix| Transform { matrix })
  }

  pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
    let v = self.matrix * Vector3::new(x as f64, y as f64, 1.0);
    (v[0] as f32, v[1] as f32)
  }

  /// 变换四个角点后取外接矩形
  pub fn map_box(&self, bbox: &BoundingBox) -> BoundingBox {
    let corners = [
      self.map_point(bbox.x, bbox.y),
      self.map_point(bbox.right(), bbox.y),
      self.map_point(bbox.right(), bbox.bottom()),
      self.map_point(bbox.x, bbox.bottom()),
    ];
    let (mut left, mut top) = corners[0];
    let (mut right, mut bottom) = corners[0];
    for &(x, y) in &corners[1..] {
      left = left.min(x);
      top = top.min(y);
      right = right.max(x);
      bottom = bottom.max(y);
    }
    BoundingBox::from_corners(left, top, right, bottom)
  }

  /// 行主序矩阵
  pub fn to_row_major(&self) -> [f32; 9] {
    let m = &self.matrix;
    [
      m[(0, 0)] as f32,
      m[(0, 1)] as f32,
      m[(0, 2)] as f32,
      m[(1, 0)] as f32,
      m[(1, 1)] as f32,
      m[(1, 2)] as f32,
      m[(2, 0)] as f32,
      m[(2, 1)] as f32,
      m[(2, 2)] as f32,
    ]
  }
}

/// 把 `src_width x src_height` 的图像映射到 `dst_size x dst_size` 的检测器输入。
///
/// 依次为：中心平移到原点并旋转；按旋转后的有效尺寸缩放
/// （`maintain_aspect` 时取两轴中较大的缩放比）；再平移回目标中心。
pub fn crop_to_detector(
  src_width: u32,
  src_height: u32,
  dst_size: u32,
  rotation: Rotation,
  maintain_aspect: bool,
) -> Transform {
  let mut transform = Transform::identity();
  let rotated = rotation != Rotation::Deg0;

  if rotated {
    transform = transform
      .post_translate(-(src_width as f64) / 2.0, -(src_height as f64) / 2.0)
      .post_rotate(rotation);
  }

  let (in_width, in_height) = if rotation.is_transposed() {
    (src_height, src_width)
  } else {
    (src_width, src_height)
  };

  if (in_width != dst_size || in_height != dst_size) && in_width > 0 && in_height > 0 {
    let sx = dst_size as f64 / in_width as f64;
    let sy = dst_size as f64 / in_height as f64;
    transform = if maintain_aspect {
      let s = sx.max(sy);
      transform.post_scale(s, s)
    } else {
      transform.post_scale(sx, sy)
    };
  }

  if rotated {
    transform = transform.post_translate(dst_size as f64 / 2.0, dst_size as f64 / 2.0);
  }

  transform
}
