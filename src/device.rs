// 该文件是 Moying （膜影） 项目的一部分。
// src/device.rs - 设备搬运接口
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

use ndarray::Array4;

use crate::error::MoldError;

/// 批张量的设备安置接口。
///
/// 推理后端（GPU、NPU 等）在此接入；搬运是一次性阻塞调用，失败时实现方
/// 返回 [`MoldError::FatalResource`]，本库不重试也不吞掉。
pub trait DevicePlacement {
  fn place(&self, batch: Array4<f32>) -> Result<Array4<f32>, MoldError>;
}

/// 主机内存安置：恒等操作，批张量留在 CPU 侧。
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDevice;

impl DevicePlacement for HostDevice {
  fn place(&self, batch: Array4<f32>) -> Result<Array4<f32>, MoldError> {
    Ok(batch)
  }
}
