// 该文件是 Moying （膜影） 项目的一部分。
// src/resize.rs - 保比缩放与居中填充
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

use image::{RgbImage, imageops};
use tracing::debug;

use crate::error::MoldError;

/// 填充画布内实际图像内容占据的子矩形，坐标为 (y1, x1, y2, x2)。
///
/// 不变量：`y2 - y1 == round(原高 * scale)`，`x2 - x1 == round(原宽 * scale)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
  pub y1: u32,
  pub x1: u32,
  pub y2: u32,
  pub x2: u32,
}

impl Window {
  pub fn height(&self) -> u32 {
    self.y2 - self.y1
  }

  pub fn width(&self) -> u32 {
    self.x2 - self.x1
  }
}

/// 四边的非负填充量。
///
/// 启用填充时满足 `top + bottom + 缩放后高 == 画布边长`，宽度方向同理。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Padding {
  pub top: u32,
  pub bottom: u32,
  pub left: u32,
  pub right: u32,
}

/// 缩放（加填充）的结果，`window`/`scale`/`padding` 是之后逆变换的唯一通道。
#[derive(Debug, Clone)]
pub struct ResizedImage {
  pub image: RgbImage,
  pub window: Window,
  pub scale: f32,
  pub padding: Padding,
}

/// 按 (min_dim, max_dim) 约束对单张图像做保比缩放，可选零填充为方形画布。
///
/// 缩放因子各向同性：
/// 1. `min_dim != 0` 时取 `max(1, min_dim / 短边)`，只放大不缩小；
/// 2. `max_dim != 0` 且放大后长边超限时改取 `max_dim / 长边`，该钳制恒优先；
/// 3. 填充时图像居中，四周补零至 `max_dim × max_dim`。
pub fn resize_image(
  image: &RgbImage,
  min_dim: u32,
  max_dim: u32,
  do_padding: bool,
) -> Result<ResizedImage, MoldError> {
  let (w, h) = image.dimensions();
  if w == 0 || h == 0 {
    return Err(MoldError::invalid(format!("图像尺寸非正: {}x{}", h, w)));
  }
  if do_padding && max_dim == 0 {
    return Err(MoldError::invalid("填充需要非零的 image_max_dim"));
  }

  let mut scale = 1.0f32;
  if min_dim != 0 {
    scale = (min_dim as f32 / h.min(w) as f32).max(1.0);
  }
  if max_dim != 0 {
    let image_max = h.max(w) as f32;
    if (image_max * scale).round() > max_dim as f32 {
      scale = max_dim as f32 / image_max;
    }
  }

  let resized = if scale != 1.0 {
    imageops::resize(
      image,
      (w as f32 * scale).round() as u32,
      (h as f32 * scale).round() as u32,
      imageops::FilterType::Triangle,
    )
  } else {
    image.clone()
  };
  let (rw, rh) = resized.dimensions();
  debug!("缩放 {}x{} -> {}x{}, scale = {}", h, w, rh, rw, scale);

  if do_padding {
    let top = (max_dim - rh) / 2;
    let bottom = max_dim - rh - top;
    let left = (max_dim - rw) / 2;
    let right = max_dim - rw - left;

    let mut canvas = RgbImage::new(max_dim, max_dim);
    imageops::replace(&mut canvas, &resized, left as i64, top as i64);

    Ok(ResizedImage {
      image: canvas,
      window: Window {
        y1: top,
        x1: left,
        y2: top + rh,
        x2: left + rw,
      },
      scale,
      padding: Padding {
        top,
        bottom,
        left,
        right,
      },
    })
  } else {
    Ok(ResizedImage {
      image: resized,
      window: Window {
        y1: 0,
        x1: 0,
        y2: rh,
        x2: rw,
      },
      scale,
      padding: Padding::default(),
    })
  }
}
