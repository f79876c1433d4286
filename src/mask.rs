// 该文件是 Moying （膜影） 项目的一部分。
// src/mask.rs - 掩码栅格化与批量缩放
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

use image::{GrayImage, ImageBuffer, Luma, imageops};
use ndarray::ArrayView2;

use crate::{error::MoldError, resize::Padding};

const MASK_THRESHOLD: f32 = 0.5;
const MASK_FOREGROUND: u8 = 255;

type ProbMask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 把网络输出的小尺寸概率掩码栅格化为原图分辨率的二值掩码。
///
/// 掩码双线性放缩到恰好 `(x2-x1) × (y2-y1)`，以 0.5 为阈二值化，
/// `{0,1}` 映射为 `{0,255}`，粘贴到全零画布的 `(x1,y1)-(x2,y2)` 子矩形。
///
/// 越界策略：框与源区域先钳制到画布边界再粘贴，越出部分丢弃，
/// 与画布无交集的框得到全零画布；任何写入都不会越过画布分配。
pub fn unmold_mask(
  mask: ArrayView2<f32>,
  bbox: [i32; 4],
  image_shape: (u32, u32),
) -> Result<GrayImage, MoldError> {
  let (canvas_h, canvas_w) = image_shape;
  if canvas_h == 0 || canvas_w == 0 {
    return Err(MoldError::invalid(format!(
      "画布尺寸非正: {}x{}",
      canvas_h, canvas_w
    )));
  }

  let [y1, x1, y2, x2] = bbox;
  let box_h = y2 - y1;
  let box_w = x2 - x1;
  if box_h <= 0 || box_w <= 0 {
    return Err(MoldError::invalid(format!(
      "检测框 ({}, {}, {}, {}) 高宽非正",
      y1, x1, y2, x2
    )));
  }

  let (mh, mw) = mask.dim();
  if mh == 0 || mw == 0 {
    return Err(MoldError::invalid(format!("掩码尺寸非正: {}x{}", mh, mw)));
  }

  let data: Vec<f32> = mask.iter().copied().collect();
  let prob = ProbMask::from_raw(mw as u32, mh as u32, data)
    .ok_or_else(|| MoldError::shape("概率掩码缓冲与其宣称尺寸不符".to_string()))?;
  let resized = imageops::resize(
    &prob,
    box_w as u32,
    box_h as u32,
    imageops::FilterType::Triangle,
  );

  let mut canvas = GrayImage::new(canvas_w, canvas_h);
  let y_start = y1.max(0);
  let x_start = x1.max(0);
  let y_end = y2.min(canvas_h as i32);
  let x_end = x2.min(canvas_w as i32);

  for y in y_start..y_end {
    for x in x_start..x_end {
      let value = resized.get_pixel((x - x1) as u32, (y - y1) as u32)[0];
      if value > MASK_THRESHOLD {
        canvas.put_pixel(x as u32, y as u32, Luma([MASK_FOREGROUND]));
      }
    }
  }
  Ok(canvas)
}

/// 对一组全分辨率掩码施加与对应图像完全相同的缩放与填充。
///
/// 训练数据准备用：同一 `scale` 与 `padding` 处理过的图像与掩码逐像素对齐。
pub fn resize_masks(
  masks: &[GrayImage],
  scale: f32,
  padding: &Padding,
) -> Result<Vec<GrayImage>, MoldError> {
  if !scale.is_finite() || scale <= 0.0 {
    return Err(MoldError::invalid(format!("缩放因子非正: {}", scale)));
  }

  let mut resized_masks = Vec::with_capacity(masks.len());
  for (index, mask) in masks.iter().enumerate() {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
      return Err(MoldError::invalid(format!(
        "掩码 {} 尺寸非正: {}x{}",
        index, h, w
      )));
    }

    let rw = (w as f32 * scale).round() as u32;
    let rh = (h as f32 * scale).round() as u32;
    if rw == 0 || rh == 0 {
      return Err(MoldError::invalid(format!(
        "掩码 {} 缩放后尺寸为零 (scale = {})",
        index, scale
      )));
    }

    let resized = if scale != 1.0 {
      imageops::resize(mask, rw, rh, imageops::FilterType::Triangle)
    } else {
      mask.clone()
    };

    let mut canvas = GrayImage::new(
      rw + padding.left + padding.right,
      rh + padding.top + padding.bottom,
    );
    imageops::replace(&mut canvas, &resized, padding.left as i64, padding.top as i64);
    resized_masks.push(canvas);
  }
  Ok(resized_masks)
}
