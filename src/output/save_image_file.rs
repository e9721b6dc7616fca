// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/output/save_image_file.rs - 将预览图保存为图像文件
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicUsize, Ordering},
};

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  output::{
    Render,
    draw::{Draw, DrawAnalysisOnFrame},
  },
  pipeline::Analysis,
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// `image:///path/out.png` 保存到固定文件，每帧覆盖；
/// 带 `?sequence` 时按帧序号另存为 `out-0001.png` 等
pub struct SaveImageFileOutput {
  path: PathBuf,
  sequence: bool,
  counter: AtomicUsize,
  draw: Draw,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let sequence = uri.query_pairs().any(|(k, _)| k == "sequence");
    Ok(SaveImageFileOutput {
      path: PathBuf::from(uri.path()),
      sequence,
      counter: AtomicUsize::new(0),
      draw: Draw::default(),
    })
  }
}

impl SaveImageFileOutput {
  fn next_path(&self) -> PathBuf {
    if !self.sequence {
      return self.path.clone();
    }

    let index = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "frame".to_string());
    let ext = self
      .path
      .extension()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "png".to_string());
    self.path.with_file_name(format!("{stem}-{index:04}.{ext}"))
  }

  fn save_image(&self, image: RgbImage) -> Result<(), SaveImageFileError> {
    let path = self.next_path();
    if let Some(parent) = Path::new(&path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&path)?;
    info!("保存图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render<RgbFrame, Analysis> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbFrame, result: &Analysis) -> Result<(), Self::Error> {
    let image: RgbImage = self.draw.draw_on(frame, result);
    self.save_image(image)
  }
}
