// 该文件是 Moying （膜影） 项目的一部分。
// src/frame.rs - 通道顺序与平面缓冲转换
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

use image::RgbImage;
use ndarray::{Array3, ArrayView3, Axis};

use crate::error::MoldError;

const RGB_CHANNELS: usize = 3;

/// 三通道的平面顺序。
///
/// 模型输入的平面顺序由训练权重固定，错配不会报错而是静默产出错误结果，
/// 因此该值只能显式配置，并由测试对平面内容做校验。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
  Rgb,
  Bgr,
}

impl ChannelOrder {
  /// 由 `source` 顺序换到本顺序的排列：目标平面 `p` 取源通道 `perm[p]`。
  pub fn permutation_from(&self, source: ChannelOrder) -> [usize; RGB_CHANNELS] {
    if *self == source {
      [0, 1, 2]
    } else {
      [2, 1, 0]
    }
  }
}

/// 把 RGB 交错图像转为 `(H, W, 3)` 的 f32 数组，通道顺序保持 RGB。
pub fn rgb_to_hwc_f32(image: &RgbImage) -> Result<Array3<f32>, MoldError> {
  let (w, h) = image.dimensions();
  if w == 0 || h == 0 {
    return Err(MoldError::invalid(format!("图像尺寸非正: {}x{}", h, w)));
  }

  let data = image.as_raw().iter().map(|&v| v as f32).collect();
  Array3::from_shape_vec((h as usize, w as usize, RGB_CHANNELS), data)
    .map_err(|e| MoldError::shape(format!("交错缓冲与 {}x{}x3 不符: {}", h, w, e)))
}

/// 把交错 `(H, W, 3)` 缓冲按给定排列重排为平面 `(3, H, W)` 缓冲。
///
/// 目标平面 `p` 复制源通道 `order[p]`。`order` 必须是 `0..3` 的一个排列。
pub fn reorder_interleaved_to_planar(
  hwc: ArrayView3<f32>,
  order: [usize; RGB_CHANNELS],
) -> Result<Array3<f32>, MoldError> {
  let (h, w, c) = hwc.dim();
  if c != RGB_CHANNELS {
    return Err(MoldError::shape(format!("期望 3 通道, 实际 {}", c)));
  }

  let mut seen = [false; RGB_CHANNELS];
  for &channel in &order {
    if channel >= RGB_CHANNELS || seen[channel] {
      return Err(MoldError::invalid(format!("非法通道排列: {:?}", order)));
    }
    seen[channel] = true;
  }

  let mut planar = Array3::zeros((RGB_CHANNELS, h, w));
  for (plane, &channel) in order.iter().enumerate() {
    planar
      .index_axis_mut(Axis(0), plane)
      .assign(&hwc.index_axis(Axis(2), channel));
  }
  Ok(planar)
}
