// 该文件是 Tingche （停车） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decode_url_path, frame::RgbFrame, query_value};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Invalid repeat count: {0}")]
  InvalidRepeat(String),
}

/// 将一张静态图片重复回放 `repeat` 次，用于离线测试与基准
pub struct ImageFileInput<const W: u32, const H: u32> {
  frame: RgbFrame<W, H>,
  remaining: usize,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for ImageFileInput<W, H> {
  const SCHEME: &'static str = "image";
}

impl<const W: u32, const H: u32> FromUrl for ImageFileInput<W, H> {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let repeat = match query_value(url, "repeat") {
      Some(value) => value
        .parse::<usize>()
        .map_err(|_| ImageFileInputError::InvalidRepeat(value))?,
      None => 1,
    };

    let path = decode_url_path(url);
    let image = ImageReader::open(&path)?.decode()?.to_rgb8();
    info!(
      "图像已加载: {} ({}x{}), 回放 {} 次",
      path,
      image.width(),
      image.height(),
      repeat
    );

    Ok(Self::with_image(&image, repeat))
  }
}

impl<const W: u32, const H: u32> ImageFileInput<W, H> {
  pub fn with_image(image: &RgbImage, repeat: usize) -> Self {
    Self {
      frame: RgbFrame::from_rgb_image(image),
      remaining: repeat,
    }
  }
}

impl<const W: u32, const H: u32> Iterator for ImageFileInput<W, H> {
  type Item = RgbFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    Some(self.frame.clone())
  }
}
