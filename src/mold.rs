// 该文件是 Moying （膜影） 项目的一部分。
// src/mold.rs - 图像塑模与批张量组装
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
use ndarray::{Array3, Array4, Axis, stack};
use tracing::{debug, info};

use crate::{
  config::MoldConfig,
  device::DevicePlacement,
  error::MoldError,
  frame::{ChannelOrder, reorder_interleaved_to_planar, rgb_to_hwc_f32},
  resize::{Window, resize_image},
};

/// 单张图像的元信息，必须随批张量一路传到逆变换端，
/// 它与 [`Window`] 是携带逆变换参数的唯一通道。
#[derive(Debug, Clone)]
pub struct ImageMeta {
  /// 图像在本批内的序号。
  pub image_id: u32,
  pub original_height: u32,
  pub original_width: u32,
  pub window: Window,
  /// 逐类别激活标志，这里置零，由调用方按需填写。
  pub active_class_ids: Vec<i32>,
}

/// 塑模后的批：`(N, 3, H, W)` 张量加逐图元信息。
#[derive(Debug, Clone)]
pub struct MoldedBatch {
  pub tensor: Array4<f32>,
  pub metas: Vec<ImageMeta>,
  pub windows: Vec<Window>,
}

impl MoldedBatch {
  /// 把批张量交给设备搬运。搬运失败是致命错误，原样向上传播。
  pub fn place_on<D: DevicePlacement>(mut self, device: &D) -> Result<Self, MoldError> {
    self.tensor = device.place(self.tensor)?;
    Ok(self)
  }
}

/// 对已缩放的图像做数值塑模：转 f32、减均值、重排为平面缓冲。
///
/// 通道约定：`config.mean_pixel` 按 RGB 顺序给出，而 [`RgbImage`] 的内存
/// 顺序就是 RGB，因此逐下标对位相减即是对位通道；内存顺序不同的来源必须
/// 先显式换序成 RGB 再进入本函数。输出平面顺序由
/// `config.model_channel_order` 决定，与训练权重的约定保持一致。
pub fn mold_image(image: &RgbImage, config: &MoldConfig) -> Result<Array3<f32>, MoldError> {
  let mut hwc = rgb_to_hwc_f32(image)?;

  for (channel, &mean) in config.mean_pixel.iter().enumerate() {
    hwc
      .index_axis_mut(Axis(2), channel)
      .mapv_inplace(|v| v - mean);
  }

  let order = config.model_channel_order.permutation_from(ChannelOrder::Rgb);
  reorder_interleaved_to_planar(hwc.view(), order)
}

/// 把一组任意尺寸的图像塑模成一个定形批张量。
///
/// 逐图：缩放（见 [`resize_image`]）、塑模（见 [`mold_image`]）、记录
/// [`ImageMeta`] 与 [`Window`]；各图塑模后的尺寸必须一致才能堆叠，
/// 这只有在配置启用填充时才有保证。
pub fn mold_inputs(images: &[RgbImage], config: &MoldConfig) -> Result<MoldedBatch, MoldError> {
  if images.is_empty() {
    return Err(MoldError::invalid("空的图像批"));
  }

  let mut molded: Vec<Array3<f32>> = Vec::with_capacity(images.len());
  let mut metas = Vec::with_capacity(images.len());
  let mut windows = Vec::with_capacity(images.len());

  for (index, image) in images.iter().enumerate() {
    let (w, h) = image.dimensions();
    let resized = resize_image(
      image,
      config.image_min_dim,
      config.image_max_dim,
      config.image_padding,
    )
    .map_err(|e| tag_image(index, e))?;
    debug!(
      "图像 {}: {}x{} -> 窗口 ({}, {}, {}, {}), scale = {}",
      index,
      h,
      w,
      resized.window.y1,
      resized.window.x1,
      resized.window.y2,
      resized.window.x2,
      resized.scale
    );

    let planar = mold_image(&resized.image, config).map_err(|e| tag_image(index, e))?;
    if let Some(first) = molded.first() {
      if planar.dim() != first.dim() {
        return Err(MoldError::shape(format!(
          "批内图像 {} 塑模后为 {:?}, 与首图 {:?} 不一致（批处理需启用填充）",
          index,
          planar.dim(),
          first.dim()
        )));
      }
    }

    metas.push(ImageMeta {
      image_id: index as u32,
      original_height: h,
      original_width: w,
      window: resized.window,
      active_class_ids: vec![0; config.num_classes],
    });
    windows.push(resized.window);
    molded.push(planar);
  }

  let views: Vec<_> = molded.iter().map(|a| a.view()).collect();
  let tensor =
    stack(Axis(0), &views).map_err(|e| MoldError::shape(format!("批张量堆叠失败: {}", e)))?;
  info!("塑模完成: {} 张图像 -> {:?}", images.len(), tensor.dim());

  Ok(MoldedBatch {
    tensor,
    metas,
    windows,
  })
}

fn tag_image(index: usize, err: MoldError) -> MoldError {
  match err {
    MoldError::InvalidInput(msg) => MoldError::InvalidInput(format!("图像 {}: {}", index, msg)),
    MoldError::ShapeMismatch(msg) => MoldError::ShapeMismatch(format!("图像 {}: {}", index, msg)),
    other => other,
  }
}
