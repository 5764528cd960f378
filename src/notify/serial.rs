// 该文件是 Tingche （停车） 项目的一部分。
// src/notify/serial.rs - UART 串口输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{io::Write, time::Duration};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decode_url_path, query_value};

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum SerialError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("缺少串口设备路径")]
  MissingDevice,
  #[error("无效的波特率: {0}")]
  InvalidBaudRate(String),
  #[error("无法打开串口 {0}: {1}")]
  Open(String, serialport::Error),
}

/// 串口线路配置，固定为 8N1、无流控
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
  pub device: String,
  pub baud_rate: u32,
}

impl SerialConfig {
  pub fn parse(url: &Url) -> Result<Self, SerialError> {
    if url.scheme() != SerialSink::SCHEME {
      return Err(SerialError::SchemeMismatch(url.scheme().to_string()));
    }

    let device = decode_url_path(url);
    if device.is_empty() || device == "/" {
      return Err(SerialError::MissingDevice);
    }

    let baud_rate = match query_value(url, "baud") {
      Some(value) => match value.parse::<u32>() {
        Ok(baud) if baud > 0 => baud,
        _ => return Err(SerialError::InvalidBaudRate(value)),
      },
      None => DEFAULT_BAUD_RATE,
    };

    Ok(Self { device, baud_rate })
  }
}

/// 已打开的串口，句柄在析构时关闭
pub struct SerialSink {
  port: Box<dyn SerialPort>,
}

impl FromUrlWithScheme for SerialSink {
  const SCHEME: &'static str = "serial";
}

impl FromUrl for SerialSink {
  type Error = SerialError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Self::open(SerialConfig::parse(url)?)
  }
}

impl SerialSink {
  pub fn open(config: SerialConfig) -> Result<Self, SerialError> {
    let port = serialport::new(&config.device, config.baud_rate)
      .data_bits(DataBits::Eight)
      .parity(Parity::None)
      .stop_bits(StopBits::One)
      .flow_control(FlowControl::None)
      .timeout(WRITE_TIMEOUT)
      .open()
      .map_err(|e| {
        error!("无法打开串口 {}: {}", config.device, e);
        SerialError::Open(config.device.clone(), e)
      })?;

    info!("串口已打开: {} {} 8N1", config.device, config.baud_rate);
    Ok(Self { port })
  }
}

impl Write for SerialSink {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.port.write(buf)
  }

  fn flush(&mut self) -> std::io::Result<()> {
    self.port.flush()
  }
}
