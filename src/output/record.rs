// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/output/record.rs - 以 JSON Lines 记录每帧的分析结果
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
  fs::File,
  io::{BufWriter, Write},
  path::PathBuf,
  sync::Mutex,
};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  geometry::Roi,
  model::Recognition,
  output::Render,
  pipeline::Analysis,
};

#[derive(Error, Debug)]
pub enum RecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("记录文件锁已损坏")]
  Poisoned,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
  frame: usize,
  width: u32,
  height: u32,
  rois: &'a [Roi],
  recognitions: &'a [Recognition],
}

struct RecordState {
  writer: BufWriter<File>,
  frame: usize,
}

/// `record:///path/run.jsonl`，每帧一行
pub struct RecordOutput {
  path: PathBuf,
  state: Mutex<RecordState>,
}

impl FromUrlWithScheme for RecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordOutput {
  type Error = RecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(RecordOutputError::SchemeMismatch);
    }

    let path = PathBuf::from(uri.path());
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let file = File::create(&path)?;
    info!("记录分析结果到: {}", path.display());

    Ok(RecordOutput {
      path,
      state: Mutex::new(RecordState {
        writer: BufWriter::new(file),
        frame: 0,
      }),
    })
  }
}

impl RecordOutput {
  pub fn path(&self) -> &PathBuf {
    &self.path
  }
}

impl Render<RgbFrame, Analysis> for RecordOutput {
  type Error = RecordOutputError;

  fn render_result(&self, frame: &RgbFrame, result: &Analysis) -> Result<(), Self::Error> {
    let mut state = self.state.lock().map_err(|_| RecordOutputError::Poisoned)?;
    state.frame += 1;

    let record = FrameRecord {
      frame: state.frame,
      width: frame.width(),
      height: frame.height(),
      rois: &result.rois,
      recognitions: &result.recognitions,
    };
    serde_json::to_writer(&mut state.writer, &record)?;
    state.writer.write_all(b"\n")?;
    state.writer.flush()?;
    debug!("记录第 {} 帧", state.frame);

    Ok(())
  }
}
