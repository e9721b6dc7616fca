// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/bin/roi_benchmark.rs - 区域提议耗时基准
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use circuseyes::{
  FromUrl,
  config::Tuning,
  input::InputWrapper,
  output::OutputWrapper,
  pipeline::RegionProposer,
  segment::{BackgroundClass, BoundingProfile},
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// CircusEyes 区域提议基准参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，只使用第一帧
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 最后一次结果的输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 背景颜色类别
  #[arg(long, value_enum, default_value = "green")]
  pub background: BackgroundClass,
  /// HSV 颜色表档案，没有默认值
  #[arg(long, value_enum)]
  pub profile: BoundingProfile,
  /// 调参 JSON 文件
  #[arg(long, value_name = "FILE")]
  pub tuning: Option<PathBuf>,
  /// 重复次数
  #[arg(long, default_value = "100", value_name = "TIMES")]
  pub times: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("背景类别: {:?}, 颜色表: {:?}", args.background, args.profile);

  let tuning = match &args.tuning {
    Some(path) => Tuning::from_json_file(path)?,
    None => Tuning::default(),
  };

  let input = InputWrapper::from_url(&args.input)?;
  let proposer = RegionProposer::new(args.background, args.profile, &tuning);
  let output = OutputWrapper::from_url(&args.output)?;

  RepeatShotTask::with_times(args.times).run_task(input, proposer, output)?;

  Ok(())
}
