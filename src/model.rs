// 该文件是 Tingche （停车） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 像素坐标下的轴对齐检测框
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectResult {
  pub items: Box<[BBox]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &BBox> {
    self.items.iter()
  }
}

impl FromIterator<BBox> for DetectResult {
  fn from_iter<T: IntoIterator<Item = BBox>>(iter: T) -> Self {
    Self {
      items: iter.into_iter().collect(),
    }
  }
}

#[cfg(feature = "model_cascade")]
mod cascade;
#[cfg(feature = "model_cascade")]
pub use self::cascade::{Cascade, CascadeBuilder, CascadeError, DetectParams};
