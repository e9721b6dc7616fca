// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/debug_dump.rs - 区域裁剪图落盘，离线调参用
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

use std::path::PathBuf;

use crc32fast::Hasher;

use image::{RgbImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::geometry::Roi;

#[derive(Error, Debug)]
pub enum DumpError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 目录布局：`<root>/<帧内容 CRC32>_<最小面积>/roi_<x>_<y>_<w>x<h>.png`。
/// 同一帧在同一参数下重复落盘会覆盖同名文件
#[derive(Debug, Clone, PartialEq)]
pub struct CropDump {
  root: PathBuf,
  min_area: f32,
}

impl CropDump {
  pub fn new(root: impl Into<PathBuf>, min_area: f32) -> Self {
    Self {
      root: root.into(),
      min_area,
    }
  }

  fn frame_dir(&self, frame: &RgbImage) -> PathBuf {
    let mut hasher = Hasher::new();
    hasher.update(&frame.width().to_le_bytes());
    hasher.update(&frame.height().to_le_bytes());
    hasher.update(frame.as_raw());
    self
      .root
      .join(format!("{:08x}_{}", hasher.finalize(), self.min_area as u64))
  }

  /// 返回本帧的落盘目录
  pub fn dump(&self, frame: &RgbImage, rois: &[Roi]) -> Result<PathBuf, DumpError> {
    let dir = self.frame_dir(frame);
    std::fs::create_dir_all(&dir)?;

    for roi in rois {
      let Some((x, y, w, h)) = roi.bbox.to_pixel_rect(frame.width(), frame.height()) else {
        continue;
      };
      let path = dir.join(format!("roi_{x}_{y}_{w}x{h}.png"));
      imageops::crop_imm(frame, x, y, w, h).to_image().save(&path)?;
      debug!("保存区域裁剪图: {}", path.display());
    }

    Ok(dir)
  }
}
