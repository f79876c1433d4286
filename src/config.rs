// 该文件是 Moying （膜影） 项目的一部分。
// src/config.rs - 管线配置
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

use crate::frame::ChannelOrder;

/// 塑模管线配置。
///
/// 不可变值，由调用方在每次调用时显式传入；本库不持有任何进程级可变状态。
#[derive(Debug, Clone)]
pub struct MoldConfig {
  /// 逐通道均值像素，按 RGB 顺序给出。
  ///
  /// 该顺序是固定约定：减法必须按图像自身的通道顺序逐项对齐，
  /// 内存顺序不同的图像需先显式换序，不允许依赖下标巧合。
  pub mean_pixel: [f32; 3],
  /// 最小边约束，0 表示不设。
  pub image_min_dim: u32,
  /// 最大边约束，0 表示不设。
  pub image_max_dim: u32,
  /// 是否填充为 `image_max_dim × image_max_dim` 的方形画布。
  pub image_padding: bool,
  /// 类别数（含背景类 0）。
  pub num_classes: usize,
  /// 模型输入的平面通道顺序，由训练权重决定，只能配置，不得推断。
  pub model_channel_order: ChannelOrder,
}

impl Default for MoldConfig {
  /// COCO 预训练 Mask R-CNN 的取值。
  fn default() -> Self {
    MoldConfig {
      mean_pixel: [123.7, 116.8, 103.9],
      image_min_dim: 800,
      image_max_dim: 1024,
      image_padding: true,
      num_classes: 81,
      model_channel_order: ChannelOrder::Rgb,
    }
  }
}
