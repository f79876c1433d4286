// 该文件是 Moying （膜影） 项目的一部分。
// src/error.rs - 错误定义
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

use thiserror::Error;

/// 管线错误。
///
/// 所有变换均为纯函数，除 [`MoldError::FatalResource`] 外的错误重试无意义，
/// 必须修正输入后再调用。
#[derive(Error, Debug)]
pub enum MoldError {
  /// 输入本身不合法（尺寸为零、通道数错误、排列非法等）。
  #[error("无效输入: {0}")]
  InvalidInput(String),
  /// 批内图像或张量形状不一致。
  #[error("形状不匹配: {0}")]
  ShapeMismatch(String),
  /// 逐检测的索引越界，携带检测序号以便定位批内记录。
  #[error("检测 {index} 越界: {reason}")]
  OutOfRange { index: usize, reason: String },
  /// 加速器数据搬运失败，必须向调用方传播，不得吞掉。
  #[error("设备资源错误: {0}")]
  FatalResource(String),
}

impl MoldError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    MoldError::InvalidInput(msg.into())
  }

  pub fn shape(msg: impl Into<String>) -> Self {
    MoldError::ShapeMismatch(msg.into())
  }

  pub fn out_of_range(index: usize, reason: impl Into<String>) -> Self {
    MoldError::OutOfRange {
      index,
      reason: reason.into(),
    }
  }

  pub fn fatal(msg: impl Into<String>) -> Self {
    MoldError::FatalResource(msg.into())
  }
}
