// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/args.rs - 命令行参数
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

use circuseyes::segment::{BackgroundClass, BoundingProfile};
use clap::Parser;
use url::Url;

/// CircusEyes 区域提议参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，例如 image:///tmp/frame.png 或 dir:///tmp/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径，例如 image:///tmp/preview.png?sequence 或 record:///tmp/run.jsonl
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

  /// 连续处理所有输入帧
  #[arg(long)]
  pub continuous: bool,

  /// 最多处理的帧数，仅在连续模式下有效
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,

  /// 区域裁剪图的落盘目录
  #[arg(long, value_name = "DIR")]
  pub dump_dir: Option<PathBuf>,
}
