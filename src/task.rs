// 该文件是 Tingche （停车） 项目的一部分。
// src/task.rs - 检测主循环
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  io::Write,
  ops::{Deref, DerefMut},
  sync::mpsc::{self, Receiver},
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, error, info, warn};

use crate::{
  model::{DetectResult, Model},
  notify::EdgeNotifier,
  output::Render,
  timing::{TimingLog, TimingSummary},
};

const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(&mut self, input: I, model: M, output: O) -> Result<StopReason, Self::Error>;
}

/// 循环正常结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
  EndOfStream,
  QuitKey,
  Interrupted,
  FrameLimit,
}

/// 注册 Ctrl-C 处理函数，信号通过通道交给主循环轮询。
///
/// 主循环 30 秒内没有退出时强制结束进程，此时不再输出耗时统计。
pub fn install_interrupt_handler() -> Result<Receiver<()>, ctrlc::Error> {
  let (tx, rx) = mpsc::channel();

  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(FORCE_EXIT_AFTER);
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  Ok(rx)
}

/// 停车标志检测任务：持有检测状态与耗时记录，逐帧驱动
/// 采集、检测、串口通知与显示。
pub struct StopSignTask<S> {
  notifier: EdgeNotifier<S>,
  timing: TimingLog,
  frame_number: Option<usize>,
  interrupt: Option<Receiver<()>>,
}

impl<S: Write> StopSignTask<S> {
  pub fn new(sink: S) -> Self {
    Self {
      notifier: EdgeNotifier::new(sink),
      timing: TimingLog::new(),
      frame_number: None,
      interrupt: None,
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  pub fn notifier(&self) -> &EdgeNotifier<S> {
    &self.notifier
  }

  pub fn timing(&self) -> &TimingLog {
    &self.timing
  }

  pub fn summary(&self) -> Option<TimingSummary> {
    self.timing.summary()
  }

  fn interrupted(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .map(|rx| rx.try_recv().is_ok())
      .unwrap_or(false)
  }

  fn run_loop<F, I, M, O, ME, RE>(
    &mut self,
    input: &mut I,
    model: &mut M,
    output: &O,
  ) -> anyhow::Result<StopReason>
  where
    ME: std::error::Error + Sync + Send + 'static,
    RE: std::error::Error + Sync + Send + 'static,
    I: Iterator<Item = F>,
    M: Model<Input = F, Output = DetectResult, Error = ME>,
    O: Render<F, DetectResult, Error = RE>,
  {
    let mut frame_index = 0usize;
    loop {
      let start = Instant::now();
      let Some(frame) = input.next() else {
        info!("输入流结束，共处理 {} 帧", frame_index);
        return Ok(StopReason::EndOfStream);
      };
      frame_index += 1;

      let result = model.infer(&frame)?;
      let detected = !result.is_empty();
      if detected {
        info!("Stop sign detected");
        debug!("第 {} 帧检测框: {:?}", frame_index, result.items);
      }

      self.notifier.update(detected)?;
      output.render_result(&frame, &result)?;

      let elapsed = start.elapsed();
      self.timing.record(elapsed);
      info!(
        "Frame Computation Time: {:.4} seconds",
        elapsed.as_secs_f64()
      );

      if output.poll_quit()? {
        info!("收到退出按键，退出任务循环");
        return Ok(StopReason::QuitKey);
      }
      if self.interrupted() {
        warn!("中断信号接收，退出任务循环");
        return Ok(StopReason::Interrupted);
      }
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        return Ok(StopReason::FrameLimit);
      }
    }
  }
}

/// 离开作用域时输出耗时统计，包括 panic 展开的路径
struct ReportOnDrop<'a, S>(&'a mut StopSignTask<S>);

impl<S> Deref for ReportOnDrop<'_, S> {
  type Target = StopSignTask<S>;

  fn deref(&self) -> &Self::Target {
    &*self.0
  }
}

impl<S> DerefMut for ReportOnDrop<'_, S> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut *self.0
  }
}

impl<S> Drop for ReportOnDrop<'_, S> {
  fn drop(&mut self) {
    self.0.timing.report();
  }
}

impl<
  F,
  S: Write,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = DetectResult, Error = ME>,
  O: Render<F, DetectResult, Error = RE>,
> Task<I, M, O> for StopSignTask<S>
{
  type Error = anyhow::Error;

  fn run_task(&mut self, input: I, model: M, output: O) -> Result<StopReason, Self::Error> {
    info!("开始任务...");
    let mut task = ReportOnDrop(self);
    // 晚于 task 绑定，展开时先于统计输出被释放
    let (mut input, mut model, output) = (input, model, output);
    let outcome = task.run_loop(&mut input, &mut model, &output);
    if let Err(e) = &outcome {
      error!("任务异常终止: {:#}", e);
    }

    // 先释放摄像头与窗口，再输出统计
    drop(input);
    drop(output);
    drop(model);
    drop(task);

    info!("任务完成，退出");
    outcome
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::Cell,
    collections::VecDeque,
    panic::{AssertUnwindSafe, catch_unwind},
    rc::Rc,
    sync::{Arc, Mutex},
  };

  use tracing_subscriber::fmt::MakeWriter;

  use super::*;
  use crate::{frame::RgbFrame, model::BBox, notify::PACKET_LEN};

  const AVERAGE_LINE: &str = "Average Frame Computation Time";
  const WORST_CASE_LINE: &str = "Worst Case Frame Computation Time";

  type TestFrame = RgbFrame<4, 2>;

  fn frames(n: usize) -> std::vec::IntoIter<TestFrame> {
    vec![TestFrame::default(); n].into_iter()
  }

  struct ScriptedModel {
    flags: VecDeque<bool>,
  }

  impl ScriptedModel {
    fn new(flags: &[bool]) -> Self {
      Self {
        flags: flags.iter().copied().collect(),
      }
    }
  }

  impl Model for ScriptedModel {
    type Input = TestFrame;
    type Output = DetectResult;
    type Error = std::io::Error;

    fn infer(&mut self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      let detected = self
        .flags
        .pop_front()
        .ok_or_else(|| std::io::Error::other("script exhausted"))?;
      let boxes = detected.then_some(BBox {
        x: 1,
        y: 1,
        width: 2,
        height: 1,
      });
      Ok(boxes.into_iter().collect())
    }
  }

  #[derive(Clone, Default)]
  struct RecordingOutput {
    rendered: Rc<Cell<usize>>,
    quit_after: Option<usize>,
  }

  impl Render<TestFrame, DetectResult> for RecordingOutput {
    type Error = std::io::Error;

    fn render_result(&self, _frame: &TestFrame, _result: &DetectResult) -> Result<(), Self::Error> {
      self.rendered.set(self.rendered.get() + 1);
      Ok(())
    }

    fn poll_quit(&self) -> Result<bool, Self::Error> {
      Ok(self.quit_after.is_some_and(|n| self.rendered.get() >= n))
    }
  }

  /// 第 `panic_on` 帧时 panic 的检测器
  struct PanickingModel {
    seen: usize,
    panic_on: usize,
  }

  impl Model for PanickingModel {
    type Input = TestFrame;
    type Output = DetectResult;
    type Error = std::io::Error;

    fn infer(&mut self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      self.seen += 1;
      if self.seen == self.panic_on {
        panic!("detector crashed on frame {}", self.seen);
      }
      Ok(std::iter::empty::<BBox>().collect())
    }
  }

  #[derive(Clone, Default)]
  struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

  impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
      self.clone()
    }
  }

  fn with_captured_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(logs.clone())
      .with_ansi(false)
      .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    (result, text)
  }

  fn assert_summary_logged_once(logs: &str) {
    assert_eq!(logs.matches(AVERAGE_LINE).count(), 1, "{logs}");
    assert_eq!(logs.matches(WORST_CASE_LINE).count(), 1, "{logs}");
  }

  struct FailingPort;

  impl Write for FailingPort {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
      Err(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "serial unplugged",
      ))
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn edge_sequence_sends_two_packets() {
    let flags = [false, false, true, true, false];
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let reason = task
      .run_task(frames(5), ScriptedModel::new(&flags), RecordingOutput::default())
      .unwrap();

    assert_eq!(reason, StopReason::EndOfStream);
    let mut expected = vec![0xAA; PACKET_LEN];
    expected.extend_from_slice(&[0x00; PACKET_LEN]);
    assert_eq!(task.notifier().sink(), &expected);
    assert_eq!(task.notifier().sent(), 2);
    assert_eq!(task.timing().len(), 5);
  }

  #[test]
  fn quiet_stream_never_writes() {
    let mut task = StopSignTask::new(Vec::<u8>::new());
    task
      .run_task(frames(20), ScriptedModel::new(&[false; 20]), RecordingOutput::default())
      .unwrap();
    assert!(task.notifier().sink().is_empty());
    assert!(!task.notifier().detected());
  }

  #[test]
  fn capture_failure_keeps_completed_samples() {
    // 第 4 次读取失败：只完成 3 次迭代
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let reason = task
      .run_task(frames(3), ScriptedModel::new(&[true; 10]), RecordingOutput::default())
      .unwrap();
    assert_eq!(reason, StopReason::EndOfStream);
    assert_eq!(task.timing().len(), 3);
    assert_eq!(task.summary().unwrap().frames, 3);
    assert_eq!(task.notifier().sink(), &vec![0xAA; PACKET_LEN]);
  }

  #[test]
  fn empty_stream_has_no_summary() {
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let reason = task
      .run_task(frames(0), ScriptedModel::new(&[]), RecordingOutput::default())
      .unwrap();
    assert_eq!(reason, StopReason::EndOfStream);
    assert!(task.summary().is_none());
  }

  #[test]
  fn quit_key_stops_after_render() {
    let output = RecordingOutput {
      quit_after: Some(2),
      ..Default::default()
    };
    let rendered = output.rendered.clone();
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let reason = task
      .run_task(frames(10), ScriptedModel::new(&[false; 10]), output)
      .unwrap();
    assert_eq!(reason, StopReason::QuitKey);
    assert_eq!(rendered.get(), 2);
    assert_eq!(task.timing().len(), 2);
  }

  #[test]
  fn frame_limit() {
    let mut task = StopSignTask::new(Vec::<u8>::new()).with_frame_number(Some(4));
    let reason = task
      .run_task(frames(10), ScriptedModel::new(&[false; 10]), RecordingOutput::default())
      .unwrap();
    assert_eq!(reason, StopReason::FrameLimit);
    assert_eq!(task.timing().len(), 4);
  }

  #[test]
  fn interrupt_is_polled_once_per_iteration() {
    let (tx, rx) = mpsc::channel();
    tx.send(()).unwrap();
    let mut task = StopSignTask::new(Vec::<u8>::new()).with_interrupt(rx);
    let reason = task
      .run_task(frames(10), ScriptedModel::new(&[true; 10]), RecordingOutput::default())
      .unwrap();
    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(task.timing().len(), 1);
    assert_eq!(task.notifier().sent(), 1);
  }

  #[test]
  fn serial_failure_is_fatal_and_keeps_timing() {
    let mut task = StopSignTask::new(FailingPort);
    let err = task
      .run_task(
        frames(5),
        ScriptedModel::new(&[false, false, true, true, true]),
        RecordingOutput::default(),
      )
      .unwrap_err();
    assert!(err.to_string().contains("0xAA"));
    assert_eq!(task.timing().len(), 2);
    assert_eq!(task.summary().unwrap().frames, 2);
  }

  #[test]
  fn model_error_is_fatal() {
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let result = task.run_task(frames(3), ScriptedModel::new(&[false]), RecordingOutput::default());
    assert!(result.is_err());
    assert_eq!(task.timing().len(), 1);
  }

  #[test]
  fn summary_logged_once_at_end_of_stream() {
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let (reason, logs) = with_captured_logs(|| {
      task.run_task(frames(3), ScriptedModel::new(&[false; 3]), RecordingOutput::default())
    });
    assert_eq!(reason.unwrap(), StopReason::EndOfStream);
    assert_summary_logged_once(&logs);
    assert!(logs.contains("Frames processed: 3"));
  }

  #[test]
  fn summary_logged_once_on_quit_key() {
    let output = RecordingOutput {
      quit_after: Some(1),
      ..Default::default()
    };
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let (reason, logs) = with_captured_logs(|| {
      task.run_task(frames(5), ScriptedModel::new(&[true; 5]), output)
    });
    assert_eq!(reason.unwrap(), StopReason::QuitKey);
    assert_summary_logged_once(&logs);
  }

  #[test]
  fn summary_logged_once_on_serial_failure() {
    let mut task = StopSignTask::new(FailingPort);
    let (result, logs) = with_captured_logs(|| {
      task.run_task(
        frames(4),
        ScriptedModel::new(&[false, true, true, true]),
        RecordingOutput::default(),
      )
    });
    assert!(result.is_err());
    assert_summary_logged_once(&logs);
    assert!(logs.contains("Frames processed: 1"));
  }

  #[test]
  fn summary_logged_when_detector_panics() {
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let (result, logs) = with_captured_logs(|| {
      catch_unwind(AssertUnwindSafe(|| {
        task.run_task(
          frames(5),
          PanickingModel {
            seen: 0,
            panic_on: 3,
          },
          RecordingOutput::default(),
        )
      }))
    });
    assert!(result.is_err());
    assert_eq!(task.timing().len(), 2);
    assert_summary_logged_once(&logs);
    assert!(logs.contains("Frames processed: 2"));
  }

  #[test]
  fn empty_stream_logs_no_summary() {
    let mut task = StopSignTask::new(Vec::<u8>::new());
    let (_, logs) = with_captured_logs(|| {
      task.run_task(frames(0), ScriptedModel::new(&[]), RecordingOutput::default())
    });
    assert!(!logs.contains(AVERAGE_LINE));
    assert!(!logs.contains(WORST_CASE_LINE));
  }
}
