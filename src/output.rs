// 该文件是 Tingche （停车） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use url::Url;

use crate::frame::RgbFrame;
use crate::model::DetectResult;
use crate::{FromUrl, FromUrlWithScheme};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;

  /// 渲染之后每帧轮询一次，返回 `true` 表示用户请求退出
  fn poll_quit(&self) -> Result<bool, Self::Error> {
    Ok(false)
  }
}

pub mod draw;

mod null_output;
pub use self::null_output::NullOutput;

#[cfg(feature = "window_output")]
mod window_output;
#[cfg(feature = "window_output")]
pub use self::window_output::{WindowOutput, WindowOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "window_output")]
  #[error("窗口输出错误: {0}")]
  WindowOutputError(#[from] WindowOutputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper<const W: u32, const H: u32> {
  #[cfg(feature = "window_output")]
  WindowOutput(WindowOutput<W, H>),
  NullOutput(NullOutput),
}

impl<const W: u32, const H: u32> FromUrl for OutputWrapper<W, H> {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "window_output")]
    {
      if url.scheme() == WindowOutput::<W, H>::SCHEME {
        let output = WindowOutput::from_url(url)?;
        return Ok(OutputWrapper::WindowOutput(output));
      }
    }
    if url.scheme() == NullOutput::SCHEME {
      let Ok(output) = NullOutput::from_url(url);
      return Ok(OutputWrapper::NullOutput(output));
    }
    Err(OutputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl<const W: u32, const H: u32> Render<RgbFrame<W, H>, DetectResult> for OutputWrapper<W, H> {
  type Error = OutputError;

  fn render_result(&self, frame: &RgbFrame<W, H>, result: &DetectResult) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "window_output")]
      OutputWrapper::WindowOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::NullOutput(output) => output
        .render_result(frame, result)
        .map_err(|never| match never {}),
    }
  }

  fn poll_quit(&self) -> Result<bool, Self::Error> {
    match self {
      #[cfg(feature = "window_output")]
      OutputWrapper::WindowOutput(output) => {
        Render::<RgbFrame<W, H>, DetectResult>::poll_quit(output).map_err(OutputError::from)
      }
      OutputWrapper::NullOutput(_) => Ok(false),
    }
  }
}
