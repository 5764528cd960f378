// 该文件是 Tingche （停车） 项目的一部分。
// src/output/null_output.rs - 无显示输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render};

/// 无头运行时使用：不绘制、不显示，也不会请求退出
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl FromUrlWithScheme for NullOutput {
  const SCHEME: &'static str = "null";
}

impl FromUrl for NullOutput {
  type Error = Infallible;

  fn from_url(_url: &Url) -> Result<Self, Self::Error> {
    Ok(NullOutput)
  }
}

impl<F, D> Render<F, D> for NullOutput {
  type Error = Infallible;

  fn render_result(&self, _frame: &F, _result: &D) -> Result<(), Self::Error> {
    Ok(())
  }
}
