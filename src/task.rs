// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/task.rs - 任务循环
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
  sync::{Condvar, Mutex, MutexGuard, PoisonError, mpsc},
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
  frame::RgbFrame,
  output::Render,
  pipeline::{Analysis, Analyze},
};

pub trait Task<I, A, O>: Sized {
  type Error;
  fn run_task(self, input: I, analyzer: A, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  AE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbFrame>,
  A: Analyze<Error = AE>,
  O: Render<RgbFrame, Analysis, Error = RE>,
> Task<I, A, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, analyzer: A, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始分析...");
    let now = Instant::now();
    let result = analyzer.analyze_frame(&frame)?;
    let elapsed = now.elapsed();
    info!(
      "分析完成，{} 个区域，{} 个识别结果，耗时: {:.2?}",
      result.rois.len(),
      result.recognitions.len(),
      elapsed
    );
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 同一帧重复分析，统计耗时
pub struct RepeatShotTask {
  times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { times: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_times(times: usize) -> Self {
    Self { times: times.max(1) }
  }
}

impl<
  AE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbFrame>,
  A: Analyze<Error = AE>,
  O: Render<RgbFrame, Analysis, Error = RE>,
> Task<I, A, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, analyzer: A, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，重复分析 {} 次...", self.times);

    let mut times = Vec::with_capacity(self.times);
    let mut last = Analysis::default();
    for i in 0..self.times {
      let now = Instant::now();
      last = analyzer.analyze_frame(&frame)?;
      let elapsed = now.elapsed();
      debug!("({})分析完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
    }
    output.render_result(&frame, &last)?;

    // 前两次包含预热开销
    let warm = if times.len() > 2 { &times[2..] } else { &times[..] };
    let total: Duration = warm.iter().sum();
    let min = warm.iter().min().copied().unwrap_or_default();
    let max = warm.iter().max().copied().unwrap_or_default();
    warn!(
      "平均分析时间: {:.2?}，最短 {:.2?}，最长 {:.2?}，区域数 {}",
      total / warm.len() as u32,
      min,
      max,
      last.rois.len()
    );

    Ok(())
  }
}

struct SlotState<F> {
  pending: Option<F>,
  closed: bool,
  dropped: usize,
}

/// 最多容纳一帧的交接槽。生产者放入新帧时，尚未被取走的旧帧被丢弃
pub struct FrameSlot<F> {
  state: Mutex<SlotState<F>>,
  ready: Condvar,
}

impl<F> Default for FrameSlot<F> {
  fn default() -> Self {
    Self::new()
  }
}

impl<F> FrameSlot<F> {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(SlotState {
        pending: None,
        closed: false,
        dropped: 0,
      }),
      ready: Condvar::new(),
    }
  }

  fn lock(&self) -> MutexGuard<'_, SlotState<F>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// 放入一帧。槽已关闭时返回 `false`，帧被丢弃
  pub fn push(&self, frame: F) -> bool {
    let mut state = self.lock();
    if state.closed {
      return false;
    }
    if state.pending.replace(frame).is_some() {
      state.dropped += 1;
      warn!("分析未完成，丢弃旧帧（累计 {} 帧）", state.dropped);
    }
    self.ready.notify_one();
    true
  }

  /// 阻塞直到有帧可取；槽关闭且为空时返回 `None`
  pub fn take(&self) -> Option<F> {
    let mut state = self.lock();
    loop {
      if let Some(frame) = state.pending.take() {
        return Some(frame);
      }
      if state.closed {
        return None;
      }
      state = self
        .ready
        .wait(state)
        .unwrap_or_else(PoisonError::into_inner);
    }
  }

  pub fn try_take(&self) -> Option<F> {
    self.lock().pending.take()
  }

  /// 关闭后不再接受新帧，已放入的帧仍可取走
  pub fn close(&self) {
    self.lock().closed = true;
    self.ready.notify_all();
  }

  pub fn is_closed(&self) -> bool {
    self.lock().closed
  }

  pub fn dropped(&self) -> usize {
    self.lock().dropped
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  handle_interrupt: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 安装 Ctrl-C 处理器。一个进程只能安装一次
  pub fn with_interrupt(mut self, handle_interrupt: bool) -> Self {
    self.handle_interrupt = handle_interrupt;
    self
  }

  fn interrupt_channel(&self) -> anyhow::Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel();
    if self.handle_interrupt {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    }
    Ok(rx)
  }
}

impl<
  AE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbFrame> + Send,
  A: Analyze<Error = AE>,
  O: Render<RgbFrame, Analysis, Error = RE>,
> Task<I, A, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, analyzer: A, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let rx = self.interrupt_channel()?;
    let slot = FrameSlot::new();

    let processed = thread::scope(|scope| -> anyhow::Result<usize> {
      scope.spawn(|| {
        for frame in input {
          if !slot.push(frame) {
            break;
          }
        }
        slot.close();
      });

      // 任何退出路径都要关闭交接槽，否则生产者线程无法结束
      let result = (|| -> anyhow::Result<usize> {
        let mut frame_index = 0usize;
        let mut now = Instant::now();
        while let Some(frame) = slot.take() {
          frame_index += 1;
          debug!("处理第 {} 帧图像", frame_index);
          let result = analyzer.analyze_frame(&frame)?;
          let elapsed_a = now.elapsed();
          output.render_result(&frame, &result)?;
          let elapsed_b = now.elapsed();
          now = Instant::now();
          info!(
            "第 {} 帧: {} 个区域，{} 个识别结果，耗时: {:.2?} / {:.2?}",
            frame_index,
            result.rois.len(),
            result.recognitions.len(),
            elapsed_a,
            elapsed_b
          );
          if self.frame_number.is_some_and(|n| frame_index >= n) {
            info!("达到指定帧数 {}, 退出任务循环", frame_index);
            break;
          }
          if rx.try_recv().is_ok() {
            warn!("中断信号接收，退出任务循环");
            break;
          }
        }
        Ok(frame_index)
      })();
      slot.close();
      result
    })?;

    info!(
      "任务完成，处理 {} 帧，丢弃 {} 帧",
      processed,
      slot.dropped()
    );
    Ok(())
  }
}
