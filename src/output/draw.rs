// 该文件是 Tingche （停车） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{
  frame::RgbFrame,
  model::{BBox, DetectResult},
};

const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const BOX_THICKNESS: i32 = 2;

pub struct Draw {
  color: [u8; 3],
  thickness: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      color: BOX_COLOR,
      thickness: BOX_THICKNESS,
    }
  }
}

impl Draw {
  // 向内逐圈绘制，得到指定线宽的矩形边框
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &BBox) {
    for t in 0..self.thickness {
      let width = bbox.width - 2 * t;
      let height = bbox.height - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(bbox.x + t, bbox.y + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.color));
    }
  }

  /// 在帧的副本上绘制所有检测框，原帧不变
  pub fn draw_detection<const W: u32, const H: u32>(
    &self,
    frame: &RgbFrame<W, H>,
    result: &DetectResult,
  ) -> RgbImage {
    let mut image = frame.to_rgb_image();
    for bbox in result.iter() {
      self.draw_bbox(&mut image, bbox);
    }
    image
  }
}
