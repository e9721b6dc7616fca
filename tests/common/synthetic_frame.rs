use circuseyes::frame::RgbFrame;
use image::{Rgb, RgbImage};

/// 落在标准绿色背景区间内
pub const GREEN: [u8; 3] = [0, 200, 0];
/// 任何背景区间都不包含
pub const RED: [u8; 3] = [200, 0, 0];

/// 纯色背景
pub fn background(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
  assert!(width > 0 && height > 0, "image dimensions must be positive");
  RgbImage::from_pixel(width, height, Rgb(color))
}

/// 在背景上填充若干实心矩形 `(x, y, w, h)`
pub fn with_rects(mut image: RgbImage, rects: &[(u32, u32, u32, u32)], color: [u8; 3]) -> RgbImage {
  for &(x, y, w, h) in rects {
    for yy in y..(y + h).min(image.height()) {
      for xx in x..(x + w).min(image.width()) {
        image.put_pixel(xx, yy, Rgb(color));
      }
    }
  }
  image
}

pub fn green_frame(width: u32, height: u32) -> RgbFrame {
  RgbFrame::from(background(width, height, GREEN))
}

pub fn green_frame_with_objects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> RgbFrame {
  RgbFrame::from(with_rects(background(width, height, GREEN), rects, RED))
}
