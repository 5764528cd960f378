// 该文件是 Tingche （停车） 项目的一部分。
// src/input.rs - 视频/图像输入
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

//! 帧来源。每个来源都是 `Iterator<Item = RgbFrame<W, H>>`，
//! 返回 `None` 即表示流结束（设备耗尽、断开或读取失败），调用方应结束循环。

use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame};

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "v4l_input")]
mod v4l2_input;
#[cfg(feature = "v4l_input")]
pub use self::v4l2_input::{V4l2Input, V4l2InputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "v4l_input")]
  #[error("V4L2 input error: {0}")]
  V4l2InputError(#[from] V4l2InputError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

pub enum InputWrapper<const W: u32, const H: u32> {
  #[cfg(feature = "v4l_input")]
  V4l2Input(V4l2Input<W, H>),
  ReadImageFile(ImageFileInput<W, H>),
}

impl<const W: u32, const H: u32> FromUrl for InputWrapper<W, H> {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "v4l_input")]
    {
      if url.scheme() == V4l2Input::<W, H>::SCHEME {
        let input = V4l2Input::from_url(url)?;
        return Ok(InputWrapper::V4l2Input(input));
      }
    }
    if url.scheme() == ImageFileInput::<W, H>::SCHEME {
      let input = ImageFileInput::from_url(url)?;
      return Ok(InputWrapper::ReadImageFile(input));
    }
    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl<const W: u32, const H: u32> Iterator for InputWrapper<W, H> {
  type Item = RgbFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l2Input(input) => input.next(),
      InputWrapper::ReadImageFile(input) => input.next(),
    }
  }
}
