// 该文件是 Tingche （停车） 项目的一部分。
// src/input/v4l2_input.rs - V4L2 摄像头输入源
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use tracing::{error, info};
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use crate::{FromUrl, FromUrlWithScheme, decode_url_path, frame::RgbFrame};

const DEFAULT_DEVICE: &str = "/dev/video0";
const BUFFER_COUNT: u32 = 4;

#[derive(Error, Debug)]
pub enum V4l2InputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无法打开设备 {0}: {1}")]
  OpenDevice(String, std::io::Error),
  #[error("V4L2 错误: {0}")]
  V4l2(#[from] std::io::Error),
  #[error("设备不支持 {width}x{height} YUYV, 实际协商结果: {actual}")]
  UnsupportedFormat {
    width: u32,
    height: u32,
    actual: String,
  },
}

/// V4L2 摄像头输入源，打开时固定为 W×H YUYV
pub struct V4l2Input<const W: u32, const H: u32> {
  // 字段按声明顺序析构：先停止采集流，再关闭设备
  stream: Stream<'static>,
  _device: Device,
  device_path: String,
  frame_index: u64,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for V4l2Input<W, H> {
  const SCHEME: &'static str = "v4l";
}

impl<const W: u32, const H: u32> FromUrl for V4l2Input<W, H> {
  type Error = V4l2InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4l2InputError::SchemeMismatch(url.scheme().to_string()));
    }

    // v4l:///dev/video0
    let device_path = match decode_url_path(url) {
      path if path.is_empty() || path == "/" => DEFAULT_DEVICE.to_string(),
      path => path,
    };

    Self::open(&device_path)
  }
}

impl<const W: u32, const H: u32> V4l2Input<W, H> {
  pub fn open(device_path: &str) -> Result<Self, V4l2InputError> {
    let device = Device::with_path(device_path)
      .map_err(|e| V4l2InputError::OpenDevice(device_path.to_string(), e))?;

    let yuyv = FourCC::new(b"YUYV");
    let mut format = device.format()?;
    format.width = W;
    format.height = H;
    format.fourcc = yuyv;
    let format = device.set_format(&format)?;

    if format.width != W || format.height != H || format.fourcc != yuyv {
      return Err(V4l2InputError::UnsupportedFormat {
        width: W,
        height: H,
        actual: format!("{}x{} {}", format.width, format.height, format.fourcc),
      });
    }

    let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)?;
    info!("摄像头已打开: {} ({}x{} YUYV)", device_path, W, H);

    Ok(Self {
      stream,
      _device: device,
      device_path: device_path.to_string(),
      frame_index: 0,
    })
  }
}

/// 将 YUYV 格式转换为 RGB
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
  let mut rgb = Vec::with_capacity((width * height * 3) as usize);

  for chunk in yuyv.chunks_exact(4) {
    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    for y in [y0, y1] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  rgb
}

impl<const W: u32, const H: u32> Iterator for V4l2Input<W, H> {
  type Item = RgbFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    // 读取失败即视为流结束，不重试
    let buffer = match CaptureStream::next(&mut self.stream) {
      Ok((buffer, _meta)) => buffer,
      Err(e) => {
        error!("无法从 {} 捕获帧: {}", self.device_path, e);
        return None;
      }
    };

    let expected = (W * H * 2) as usize;
    if buffer.len() < expected {
      error!(
        "捕获缓冲区长度不足: 期望 {}, 实际 {}",
        expected,
        buffer.len()
      );
      return None;
    }

    let rgb = yuyv_to_rgb(&buffer[..expected], W, H);
    match RgbFrame::try_from(rgb) {
      Ok(frame) => {
        self.frame_index += 1;
        Some(frame)
      }
      Err(e) => {
        error!("第 {} 帧转换失败: {}", self.frame_index + 1, e);
        None
      }
    }
  }
}
