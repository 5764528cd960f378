// 该文件是 Tingche （停车） 项目的一部分。
// src/frame.rs - 固定尺寸 RGB 帧定义
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

use image::{ImageBuffer, Rgb, RgbImage, imageops::FilterType};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

// BT.601 亮度系数（14 位定点）
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 按行存储（HWC）的 RGB 帧，尺寸在编译期固定
#[derive(Debug, Clone)]
pub struct RgbFrame<const W: u32, const H: u32> {
  data: Box<[u8]>,
}

impl<const W: u32, const H: u32> RgbFrame<W, H> {
  pub const LEN: usize = RGB_CHANNELS * W as usize * H as usize;

  /// 转换为单通道亮度图（与 BGR2GRAY 相同的权重）
  pub fn to_luma(&self) -> Vec<u8> {
    self
      .data
      .chunks_exact(RGB_CHANNELS)
      .map(|px| {
        let y = px[0] as u32 * LUMA_R + px[1] as u32 * LUMA_G + px[2] as u32 * LUMA_B;
        ((y + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
      })
      .collect()
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    // 长度在构造时已校验
    ImageBuffer::from_fn(W, H, |x, y| {
      let idx = (y as usize * W as usize + x as usize) * RGB_CHANNELS;
      Rgb([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    })
  }

  /// 从任意尺寸的 RGB 图像构造，尺寸不符时缩放
  pub fn from_rgb_image(image: &RgbImage) -> Self {
    let data = if image.dimensions() == (W, H) {
      image.as_raw().clone()
    } else {
      image::imageops::resize(image, W, H, FilterType::Triangle).into_raw()
    };
    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<u8>> for RgbFrame<W, H> {
  type Error = FrameError;

  fn try_from(data: Vec<u8>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(FrameError::LengthMismatch {
        expected: Self::LEN,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for RgbFrame<W, H> {
  fn default() -> Self {
    Self {
      data: vec![0u8; Self::LEN].into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> AsRef<[u8]> for RgbFrame<W, H> {
  fn as_ref(&self) -> &[u8] {
    &self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_wrong_length() {
    let err = RgbFrame::<4, 2>::try_from(vec![0u8; 10]).unwrap_err();
    assert!(matches!(
      err,
      FrameError::LengthMismatch {
        expected: 24,
        actual: 10
      }
    ));
  }

  #[test]
  fn luma_matches_reference_weights() {
    let mut data = Vec::new();
    data.extend_from_slice(&[255, 255, 255]);
    data.extend_from_slice(&[0, 0, 0]);
    data.extend_from_slice(&[255, 0, 0]);
    data.extend_from_slice(&[0, 255, 0]);
    let frame = RgbFrame::<2, 2>::try_from(data).unwrap();
    assert_eq!(frame.to_luma(), vec![255, 0, 76, 150]);
  }

  #[test]
  fn rgb_image_conversion_keeps_pixels() {
    let data: Vec<u8> = (0..24).collect();
    let frame = RgbFrame::<4, 2>::try_from(data.clone()).unwrap();
    let image = frame.to_rgb_image();
    assert_eq!(image.get_pixel(1, 0), &Rgb([3, 4, 5]));
    assert_eq!(image.get_pixel(0, 1), &Rgb([12, 13, 14]));

    let back = RgbFrame::<4, 2>::from_rgb_image(&image);
    assert_eq!(back.as_ref(), data.as_slice());
  }

  #[test]
  fn from_rgb_image_resizes() {
    let image = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
    let frame = RgbFrame::<4, 2>::from_rgb_image(&image);
    assert_eq!(frame.as_ref().len(), 24);
    assert_eq!(&frame.as_ref()[..3], &[10, 20, 30]);
  }
}
