// 该文件是 Tingche （停车） 项目的一部分。
// src/model/cascade.rs - 级联分类器模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use opencv::{
  core::{CV_8UC1, Mat, Rect, Scalar, Size, Vector},
  objdetect::CascadeClassifier,
  prelude::*,
};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decode_url_path,
  frame::RgbFrame,
  model::{BBox, DetectResult, Model},
};

/// 多尺度滑窗检测参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectParams {
  /// 相邻尺度间的缩放比例
  pub scale_factor: f64,
  /// 区域被接受所需的最少重叠检测数
  pub min_neighbors: i32,
  /// 最小可检测区域（像素）
  pub min_size: (i32, i32),
}

impl DetectParams {
  pub const STOP_SIGN: DetectParams = DetectParams {
    scale_factor: 1.1,
    min_neighbors: 5,
    min_size: (30, 30),
  };
}

impl Default for DetectParams {
  fn default() -> Self {
    Self::STOP_SIGN
  }
}

#[derive(Error, Debug)]
pub enum CascadeError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型文件不存在: {0}")]
  ModelNotFound(String),
  #[error("模型文件无效或为空: {0}")]
  ModelInvalid(String),
  #[error("OpenCV 错误: {0}")]
  OpenCvError(#[from] opencv::Error),
}

pub struct CascadeBuilder {
  model_path: String,
  params: DetectParams,
}

impl FromUrlWithScheme for CascadeBuilder {
  const SCHEME: &'static str = "cascade";
}

impl FromUrl for CascadeBuilder {
  type Error = CascadeError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(CascadeError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(CascadeBuilder {
      model_path: decode_url_path(url),
      params: DetectParams::STOP_SIGN,
    })
  }
}

impl CascadeBuilder {
  pub fn build<Frame>(self) -> Result<Cascade<Frame>, CascadeError> {
    if !Path::new(&self.model_path).is_file() {
      error!("找不到分类器文件: {}", self.model_path);
      return Err(CascadeError::ModelNotFound(self.model_path));
    }

    let classifier = CascadeClassifier::new(&self.model_path)?;
    // 文件损坏时 OpenCV 不报错，只留下一个空分类器
    if classifier.empty()? {
      return Err(CascadeError::ModelInvalid(self.model_path));
    }

    info!("分类器已加载: {}", self.model_path);
    debug!("检测参数: {:?}", self.params);

    Ok(Cascade {
      classifier,
      params: self.params,
      _phantom: std::marker::PhantomData,
    })
  }
}

pub struct Cascade<Frame> {
  classifier: CascadeClassifier,
  params: DetectParams,
  _phantom: std::marker::PhantomData<Frame>,
}

impl<const W: u32, const H: u32> Model for Cascade<RgbFrame<W, H>> {
  type Input = RgbFrame<W, H>;
  type Output = DetectResult;
  type Error = CascadeError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let luma = input.to_luma();
    let mut gray =
      Mat::new_rows_cols_with_default(H as i32, W as i32, CV_8UC1, Scalar::all(0.0))?;
    gray.data_bytes_mut()?.copy_from_slice(&luma);

    let mut objects = Vector::<Rect>::new();
    let (min_w, min_h) = self.params.min_size;
    self.classifier.detect_multi_scale(
      &gray,
      &mut objects,
      self.params.scale_factor,
      self.params.min_neighbors,
      0,
      Size::new(min_w, min_h),
      Size::default(),
    )?;

    Ok(
      objects
        .iter()
        .map(|r| BBox {
          x: r.x,
          y: r.y,
          width: r.width,
          height: r.height,
        })
        .collect(),
    )
  }
}
