// 该文件是 Tingche （停车） 项目的一部分。
// src/output/window_output.rs - OpenCV 窗口显示
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use opencv::{
  core::{CV_8UC3, Mat, Scalar},
  highgui,
  prelude::*,
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  model::DetectResult,
  output::{Render, draw::Draw},
};

const DEFAULT_TITLE: &str = "Frame";
const QUIT_KEY: i32 = b'q' as i32;
const KEY_POLL_MS: i32 = 1;

#[derive(Error, Debug)]
pub enum WindowOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("OpenCV 错误: {0}")]
  OpenCvError(#[from] opencv::Error),
}

/// 在 highgui 窗口中显示带检测框的帧，按 `q` 请求退出
pub struct WindowOutput<const W: u32, const H: u32> {
  title: String,
  draw: Draw,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for WindowOutput<W, H> {
  const SCHEME: &'static str = "window";
}

impl<const W: u32, const H: u32> FromUrl for WindowOutput<W, H> {
  type Error = WindowOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(WindowOutputError::SchemeMismatch(url.scheme().to_string()));
    }

    let title = url
      .host_str()
      .filter(|host| !host.is_empty())
      .unwrap_or(DEFAULT_TITLE)
      .to_string();
    highgui::named_window(&title, highgui::WINDOW_AUTOSIZE)?;
    info!("显示窗口已创建: {}", title);

    Ok(WindowOutput {
      title,
      draw: Draw::default(),
    })
  }
}

/// RGB 图像转为 OpenCV 使用的 BGR Mat
fn rgb_to_bgr_mat(image: &RgbImage) -> Result<Mat, opencv::Error> {
  let mut mat = Mat::new_rows_cols_with_default(
    image.height() as i32,
    image.width() as i32,
    CV_8UC3,
    Scalar::all(0.0),
  )?;
  for (dst, src) in mat
    .data_bytes_mut()?
    .chunks_exact_mut(3)
    .zip(image.as_raw().chunks_exact(3))
  {
    dst[0] = src[2];
    dst[1] = src[1];
    dst[2] = src[0];
  }
  Ok(mat)
}

impl<const W: u32, const H: u32> Render<RgbFrame<W, H>, DetectResult> for WindowOutput<W, H> {
  type Error = WindowOutputError;

  fn render_result(&self, frame: &RgbFrame<W, H>, result: &DetectResult) -> Result<(), Self::Error> {
    let image = self.draw.draw_detection(frame, result);
    let mat = rgb_to_bgr_mat(&image)?;
    highgui::imshow(&self.title, &mat)?;
    Ok(())
  }

  fn poll_quit(&self) -> Result<bool, Self::Error> {
    let key = highgui::wait_key(KEY_POLL_MS)?;
    Ok(key >= 0 && (key & 0xFF) == QUIT_KEY)
  }
}

impl<const W: u32, const H: u32> Drop for WindowOutput<W, H> {
  fn drop(&mut self) {
    if let Err(e) = highgui::destroy_window(&self.title) {
      warn!("关闭窗口 {} 失败: {}", self.title, e);
    }
  }
}
