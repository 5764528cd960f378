// 该文件是 Tingche （停车） 项目的一部分。
// src/bin/tingche.rs - 停车标志检测主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use tingche::{
  FromUrl,
  frame::RgbFrame,
  input::InputWrapper,
  model::CascadeBuilder,
  notify::SerialSink,
  output::OutputWrapper,
  task::{StopSignTask, Task, install_interrupt_handler},
};

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;

/// Tingche 停车标志检测参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 级联分类器文件，例如 cascade:///home/rtes/cascade_stop_sign.xml
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源: v4l:///dev/video0 或 image:///path/to/frame.jpg?repeat=N
  #[arg(long, value_name = "SOURCE", default_value = "v4l:///dev/video0")]
  pub input: Url,
  /// 串口: serial:///dev/ttyTHS1?baud=115200
  #[arg(long, value_name = "SERIAL", default_value = "serial:///dev/ttyTHS1")]
  pub serial: Url,
  /// 显示输出: window://Frame 或 null://
  #[arg(long, value_name = "OUTPUT", default_value = "window://Frame")]
  pub output: Url,
  /// 最大处理帧数，不指定则一直运行
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
  /// 退出时将耗时统计写入该 JSON 文件
  #[arg(long, value_name = "FILE")]
  pub report: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("串口: {}", args.serial);
  info!("输出路径: {}", args.output);

  let serial = SerialSink::from_url(&args.serial).context("无法打开串口")?;
  let model = CascadeBuilder::from_url(&args.model)?
    .build::<RgbFrame<FRAME_WIDTH, FRAME_HEIGHT>>()
    .context("无法加载分类器")?;
  let input =
    InputWrapper::<FRAME_WIDTH, FRAME_HEIGHT>::from_url(&args.input).context("无法打开输入源")?;
  let output =
    OutputWrapper::<FRAME_WIDTH, FRAME_HEIGHT>::from_url(&args.output).context("无法创建输出")?;
  let interrupt = install_interrupt_handler().context("无法注册 Ctrl-C 处理函数")?;

  let mut task = StopSignTask::new(serial)
    .with_frame_number(args.frame_number)
    .with_interrupt(interrupt);
  let outcome = task.run_task(input, model, output);

  if let (Some(path), Some(summary)) = (&args.report, task.summary()) {
    match summary.write_json(path) {
      Ok(()) => info!("耗时统计已写入: {}", path.display()),
      Err(e) => warn!("写入耗时统计 {} 失败: {}", path.display(), e),
    }
  }

  let reason = outcome?;
  info!("退出原因: {:?}", reason);
  Ok(())
}
