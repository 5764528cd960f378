// 该文件是 Tingche （停车） 项目的一部分。
// src/notify.rs - 检测状态边沿通知
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

//! 检测状态只在变化时通过串口发出一个 8 字节数据包：
//! `0xAA` × 8 表示检测到停车标志，`0x00` × 8 表示标志消失。
//! 没有校验、帧头或应答，接收端把每个包当作电平变化而非心跳。

use std::io::Write;

use thiserror::Error;
use tracing::info;

mod serial;
pub use self::serial::{SerialError, SerialSink};

pub const PACKET_LEN: usize = 8;
pub const ALERT_BYTE: u8 = 0xAA;
pub const CLEAR_BYTE: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet([u8; PACKET_LEN]);

impl Packet {
  pub const fn alert() -> Self {
    Packet([ALERT_BYTE; PACKET_LEN])
  }

  pub const fn clear() -> Self {
    Packet([CLEAR_BYTE; PACKET_LEN])
  }

  pub const fn for_state(detected: bool) -> Self {
    if detected {
      Self::alert()
    } else {
      Self::clear()
    }
  }

  pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
    &self.0
  }

  pub fn is_alert(&self) -> bool {
    self.0[0] == ALERT_BYTE
  }
}

impl std::fmt::Display for Packet {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:#04X}", self.0[0])
  }
}

#[derive(Error, Debug)]
pub enum NotifyError {
  #[error("串口写入 {packet} 数据包失败: {source}")]
  Write {
    packet: Packet,
    #[source]
    source: std::io::Error,
  },
}

/// 边沿触发的通知器，初始状态为“未检测到”
pub struct EdgeNotifier<S> {
  sink: S,
  detected: bool,
  sent: usize,
}

impl<S: Write> EdgeNotifier<S> {
  pub fn new(sink: S) -> Self {
    Self {
      sink,
      detected: false,
      sent: 0,
    }
  }

  /// 以本次迭代的检测结果更新状态；状态变化时同步写出一个数据包。
  ///
  /// 写入失败时状态保持不变。
  pub fn update(&mut self, detected: bool) -> Result<Option<Packet>, NotifyError> {
    if detected == self.detected {
      return Ok(None);
    }

    let packet = Packet::for_state(detected);
    self
      .sink
      .write_all(packet.as_bytes())
      .and_then(|_| self.sink.flush())
      .map_err(|source| NotifyError::Write { packet, source })?;

    info!("Sent {} packet over UART", packet);
    self.detected = detected;
    self.sent += 1;
    Ok(Some(packet))
  }

  pub fn detected(&self) -> bool {
    self.detected
  }

  /// 已发送的数据包数量
  pub fn sent(&self) -> usize {
    self.sent
  }

  pub fn sink(&self) -> &S {
    &self.sink
  }

  pub fn into_sink(self) -> S {
    self.sink
  }
}
