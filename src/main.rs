// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::convert::Infallible;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use circuseyes::{
  FromUrl,
  config::Tuning,
  debug_dump::CropDump,
  frame::RgbFrame,
  input::InputWrapper,
  output::OutputWrapper,
  pipeline::{Analysis, Analyze, RegionProposer},
  task::{ContinuousTask, OneShotTask, Task},
};

/// 只做区域提议；配置了落盘目录时顺带保存裁剪图
struct Proposal {
  proposer: RegionProposer,
  dump: Option<CropDump>,
}

impl Analyze for Proposal {
  type Error = Infallible;

  fn analyze_frame(&self, frame: &RgbFrame) -> Result<Analysis, Self::Error> {
    let analysis = self.proposer.analyze_frame(frame)?;
    if let Some(dump) = &self.dump
      && let Err(e) = dump.dump(frame.as_image(), &analysis.rois)
    {
      warn!("保存区域裁剪图失败: {}", e);
    }
    Ok(analysis)
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("背景类别: {:?}, 颜色表: {:?}", args.background, args.profile);

  let tuning = match &args.tuning {
    Some(path) => Tuning::from_json_file(path)?,
    None => Tuning::default(),
  };
  circuseyes::init();

  let analyzer = Proposal {
    proposer: RegionProposer::new(args.background, args.profile, &tuning),
    dump: args
      .dump_dir
      .as_ref()
      .map(|dir| CropDump::new(dir, tuning.min_roi_area)),
  };
  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  if args.continuous {
    ContinuousTask::default()
      .with_frame_number(args.frame_number)
      .with_interrupt(true)
      .run_task(input, analyzer, output)?;
  } else {
    OneShotTask.run_task(input, analyzer, output)?;
  }

  Ok(())
}
