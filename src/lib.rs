// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod config;
#[cfg(feature = "debug_dump")]
pub mod debug_dump;
pub mod frame;
pub mod geometry;
pub mod input;
pub mod model;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod region;
pub mod segment;
pub mod stitch;
pub mod task;
pub mod tiler;
pub mod transform;

pub use self::pipeline::{Pipeline, PipelineBuilder, PipelineError};

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 进程级一次性初始化。
///
/// 可以在任意线程、任意次数调用；真正的初始化只发生一次。
/// 构造 [`Pipeline`] 时会自动调用，提前调用可以把初始化开销挪到启动阶段。
pub fn init() {
  segment::hsv::tables();
}
