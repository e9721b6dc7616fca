// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/frame.rs - RGB 帧定义与原始像素编码
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
use serde::{Deserialize, Serialize};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 原始缓冲区的像素编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelEncoding {
  #[default]
  Rgb888,
  Rgba8888,
  /// 小端 16 位，摄像头预览常用格式
  Rgb565,
}

impl PixelEncoding {
  pub fn bytes_per_pixel(&self) -> usize {
    match self {
      PixelEncoding::Rgb888 => 3,
      PixelEncoding::Rgba8888 => 4,
      PixelEncoding::Rgb565 => 2,
    }
  }

  pub fn buffer_len(&self, width: u32, height: u32) -> usize {
    self.bytes_per_pixel() * width as usize * height as usize
  }

  fn decode(&self, px: &[u8]) -> [u8; 3] {
    match self {
      PixelEncoding::Rgb888 | PixelEncoding::Rgba8888 => [px[0], px[1], px[2]],
      PixelEncoding::Rgb565 => {
        let v = u16::from_le_bytes([px[0], px[1]]);
        let r = ((v >> 11) & 0x1f) as u8;
        let g = ((v >> 5) & 0x3f) as u8;
        let b = (v & 0x1f) as u8;
        [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
      }
    }
  }

  fn encode(&self, rgb: [u8; 3], px: &mut [u8]) {
    match self {
      PixelEncoding::Rgb888 => px.copy_from_slice(&rgb),
      PixelEncoding::Rgba8888 => {
        px[..3].copy_from_slice(&rgb);
        px[3] = 255;
      }
      PixelEncoding::Rgb565 => {
        let v = ((rgb[0] as u16 >> 3) << 11) | ((rgb[1] as u16 >> 2) << 5) | (rgb[2] as u16 >> 3);
        px.copy_from_slice(&v.to_le_bytes());
      }
    }
  }
}

/// 打包 RGB 帧，调用方在一次分析期间持有
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
  image: RgbImage,
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    Self { image }
  }
}

impl TryFrom<(u32, u32, Vec<u8>)> for RgbFrame {
  type Error = FrameError;

  fn try_from((width, height, data): (u32, u32, Vec<u8>)) -> Result<Self, Self::Error> {
    let expected = RGB_CHANNELS * width as usize * height as usize;
    let actual = data.len();
    RgbImage::from_raw(width, height, data)
      .filter(|_| actual == expected)
      .map(RgbFrame::from)
      .ok_or(FrameError::LengthMismatch { expected, actual })
  }
}

impl RgbFrame {
  /// 按指定编码解码原始缓冲区
  pub fn from_raw(
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    data: &[u8],
  ) -> Result<Self, FrameError> {
    let expected = encoding.buffer_len(width, height);
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    let bpp = encoding.bytes_per_pixel();
    let mut image = RgbImage::new(width, height);
    for (px, dst) in data.chunks_exact(bpp).zip(image.pixels_mut()) {
      *dst = Rgb(encoding.decode(px));
    }
    Ok(Self { image })
  }

  /// 按指定编码写回原始缓冲区
  pub fn write_raw(&self, encoding: PixelEncoding, data: &mut [u8]) -> Result<(), FrameError> {
    let expected = encoding.buffer_len(self.width(), self.height());
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    let bpp = encoding.bytes_per_pixel();
    for (src, px) in self.image.pixels().zip(data.chunks_exact_mut(bpp)) {
      encoding.encode(src.0, px);
    }
    Ok(())
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn as_image(&self) -> &RgbImage {
    &self.image
  }
}

impl AsRef<[u8]> for RgbFrame {
  fn as_ref(&self) -> &[u8] {
    self.image.as_raw()
  }
}

impl AsMut<[u8]> for RgbFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.image
  }
}
