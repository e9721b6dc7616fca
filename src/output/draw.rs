// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/output/draw.rs - 区域与识别结果的绘制
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{
  frame::RgbFrame,
  geometry::{BoundingBox, Roi},
  model::Recognition,
  pipeline::Analysis,
};

const ROI_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const RECOGNITION_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const LINE_THICKNESS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
  roi_color: [u8; 3],
  recognition_color: [u8; 3],
  thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      roi_color: ROI_COLOR,
      recognition_color: RECOGNITION_COLOR,
      thickness: LINE_THICKNESS,
    }
  }
}

impl Draw {
  pub fn with_thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness.max(1);
    self
  }

  /// 逐层向内绘制空心矩形，超出图像的部分被裁掉
  fn draw_box(&self, image: &mut RgbImage, bbox: &BoundingBox, color: [u8; 3]) {
    let Some((x, y, width, height)) = bbox.to_pixel_rect(image.width(), image.height()) else {
      return;
    };

    for t in 0..self.thickness {
      let (w, h) = (width.saturating_sub(2 * t), height.saturating_sub(2 * t));
      if w == 0 || h == 0 {
        break;
      }
      let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(w, h);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }
  }

  pub fn draw_rois(&self, image: &mut RgbImage, rois: &[Roi]) {
    for roi in rois {
      self.draw_box(image, &roi.bbox, self.roi_color);
    }
  }

  pub fn draw_recognitions(&self, image: &mut RgbImage, recognitions: &[Recognition]) {
    for recognition in recognitions {
      self.draw_box(image, recognition.bbox(), self.recognition_color);
    }
  }

  /// 区域在下，识别结果在上
  pub fn draw_analysis(&self, image: &mut RgbImage, analysis: &Analysis) {
    self.draw_rois(image, &analysis.rois);
    self.draw_recognitions(image, &analysis.recognitions);
  }
}

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

pub trait FromRgbImage {
  fn from_rgb_image(image: RgbImage) -> Self;
}

pub trait DrawAnalysisOnFrame<FromFrame, ToFrame> {
  fn draw_on(&self, frame: &FromFrame, analysis: &Analysis) -> ToFrame;
}

impl<FromFrame: ToRgbImage, ToFrame: FromRgbImage> DrawAnalysisOnFrame<FromFrame, ToFrame>
  for Draw
{
  fn draw_on(&self, frame: &FromFrame, analysis: &Analysis) -> ToFrame {
    let mut image = frame.to_rgb_image();
    self.draw_analysis(&mut image, analysis);
    ToFrame::from_rgb_image(image)
  }
}

impl ToRgbImage for RgbFrame {
  fn to_rgb_image(&self) -> RgbImage {
    self.as_image().clone()
  }
}

impl ToRgbImage for RgbImage {
  fn to_rgb_image(&self) -> RgbImage {
    self.clone()
  }
}

impl FromRgbImage for RgbImage {
  fn from_rgb_image(image: RgbImage) -> Self {
    image
  }
}

impl FromRgbImage for RgbFrame {
  fn from_rgb_image(image: RgbImage) -> Self {
    RgbFrame::from(image)
  }
}
