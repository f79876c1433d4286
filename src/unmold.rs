// 该文件是 Moying （膜影） 项目的一部分。
// src/unmold.rs - 检测结果逆变换
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

use image::GrayImage;
use ndarray::{ArrayView2, ArrayView4, s};
use tracing::debug;

use crate::{error::MoldError, mask::unmold_mask, resize::Window};

/// 检测缓冲的列数，列序固定为 (y1, x1, y2, x2, class_id, score)。
pub const DETECTION_COLUMNS: usize = 6;

/// “无检测”哨兵的类别号。
///
/// 硬性约定：训练出的模型把类别 0 保留为背景，定容检测缓冲中有效行是
/// 连续前缀，首个类别 0 的行之后全部忽略。若某个模型需要把 0 用作真实
/// 前景类别，本扫描无法区分，只会静默截断——那样的模型需要另一套输出
/// 约定，而不是这里的开关。
pub const SENTINEL_CLASS_ID: f32 = 0.0;

/// 逆变换后的最终检测集，四个序列按同一顺序逐项对齐。
///
/// 零检测时四个序列都是空容器，仍然是合法取值。
#[derive(Debug, Clone, Default)]
pub struct UnmoldedDetections {
  /// 原图像素坐标系下的整数框 (y1, x1, y2, x2)。
  pub boxes: Vec<[i32; 4]>,
  pub class_ids: Vec<u32>,
  pub scores: Vec<f32>,
  /// 原图分辨率的二值掩码，每个检测一张。
  pub masks: Vec<GrayImage>,
}

impl UnmoldedDetections {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.class_ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.class_ids.is_empty()
  }
}

/// 把网络对单张图像的原始输出逆变换回原图坐标空间。
///
/// `detections` 是 `(capacity, 6)` 的定容缓冲，`raw_masks` 是
/// `(capacity, maskH, maskW, numClasses)` 的逐类概率掩码，`window` 必须是
/// 塑模该图像时 [`crate::resize::resize_image`] 产出的那一个。
///
/// 流程：哨兵扫描取有效前缀、按检测自身类别取掩码平面、坐标逆变换回
/// 原图空间、丢弃零面积框、对幸存检测逐个栅格化掩码。
pub fn unmold_detections(
  detections: ArrayView2<f32>,
  raw_masks: ArrayView4<f32>,
  original_shape: (u32, u32),
  window: &Window,
) -> Result<UnmoldedDetections, MoldError> {
  if detections.ncols() != DETECTION_COLUMNS {
    return Err(MoldError::shape(format!(
      "检测缓冲应为 {} 列, 实际 {} 列",
      DETECTION_COLUMNS,
      detections.ncols()
    )));
  }
  let capacity = detections.nrows();
  if raw_masks.shape()[0] != capacity {
    return Err(MoldError::shape(format!(
      "掩码缓冲容量 {} 与检测缓冲容量 {} 不一致",
      raw_masks.shape()[0],
      capacity
    )));
  }

  let (original_height, original_width) = original_shape;
  if original_height == 0 || original_width == 0 {
    return Err(MoldError::invalid(format!(
      "原图尺寸非正: {}x{}",
      original_height, original_width
    )));
  }
  if window.y2 <= window.y1 || window.x2 <= window.x1 {
    return Err(MoldError::invalid(format!("窗口退化: {:?}", window)));
  }

  // 有效检测是连续前缀，取首个哨兵行之前的行数
  let valid = detections
    .column(4)
    .iter()
    .position(|&class_id| class_id == SENTINEL_CLASS_ID)
    .unwrap_or(capacity);
  debug!("检测缓冲容量 {}, 有效检测 {}", capacity, valid);

  // 由窗口恢复各向同性缩放：两个比值只因取整而不同，取小者
  let h_scale = original_height as f32 / window.height() as f32;
  let w_scale = original_width as f32 / window.width() as f32;
  let scale = h_scale.min(w_scale);
  let shift = [
    window.y1 as f32,
    window.x1 as f32,
    window.y1 as f32,
    window.x1 as f32,
  ];

  let num_mask_classes = raw_masks.shape()[3];
  let mut result = UnmoldedDetections::empty();

  for index in 0..valid {
    let row = detections.row(index);
    let class_id = row[4];
    if class_id < 0.0 {
      return Err(MoldError::out_of_range(
        index,
        format!("类别号为负: {}", class_id),
      ));
    }
    let class_id = class_id as u32;
    if class_id as usize >= num_mask_classes {
      return Err(MoldError::out_of_range(
        index,
        format!("类别号 {} 超出掩码类别数 {}", class_id, num_mask_classes),
      ));
    }

    let mut bbox = [0i32; 4];
    for (k, slot) in bbox.iter_mut().enumerate() {
      *slot = ((row[k] - shift[k]) * scale).round() as i32;
    }

    // 零面积框直接丢弃，常见于训练早期权重还较随机时
    if (bbox[2] - bbox[0]) * (bbox[3] - bbox[1]) <= 0 {
      debug!("检测 {} 逆变换后零面积, 丢弃: {:?}", index, bbox);
      continue;
    }

    let mask = raw_masks.slice(s![index, .., .., class_id as usize]);
    let full_mask = unmold_mask(mask, bbox, original_shape)?;

    result.boxes.push(bbox);
    result.class_ids.push(class_id);
    result.scores.push(row[5]);
    result.masks.push(full_mask);
  }

  debug!("逆变换完成, 留存检测 {}", result.len());
  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::{Array2, Array4};

  fn detections_from(rows: &[[f32; 6]]) -> Array2<f32> {
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), 6), flat).unwrap()
  }

  fn ones_masks(capacity: usize, num_classes: usize) -> Array4<f32> {
    Array4::from_elem((capacity, 4, 4, num_classes), 1.0)
  }

  const FULL_WINDOW: Window = Window {
    y1: 0,
    x1: 0,
    y2: 100,
    x2: 100,
  };

  #[test]
  fn sentinel_cuts_at_first_zero_class() {
    let detections = detections_from(&[
      [10.0, 10.0, 20.0, 20.0, 1.0, 0.9],
      [30.0, 30.0, 40.0, 40.0, 2.0, 0.8],
      [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
      // 哨兵之后的非零行按约定忽略
      [50.0, 50.0, 60.0, 60.0, 3.0, 0.7],
    ]);
    let masks = ones_masks(4, 4);

    let out = unmold_detections(detections.view(), masks.view(), (100, 100), &FULL_WINDOW).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out.class_ids, vec![1, 2]);
  }

  #[test]
  fn full_buffer_without_sentinel() {
    let detections = detections_from(&[
      [10.0, 10.0, 20.0, 20.0, 1.0, 0.9],
      [30.0, 30.0, 40.0, 40.0, 2.0, 0.8],
    ]);
    let masks = ones_masks(2, 4);

    let out = unmold_detections(detections.view(), masks.view(), (100, 100), &FULL_WINDOW).unwrap();
    assert_eq!(out.len(), 2);
  }

  #[test]
  fn degenerate_boxes_drop_from_all_outputs() {
    let detections = detections_from(&[
      [10.0, 10.0, 20.0, 20.0, 1.0, 0.9],
      [30.0, 30.0, 30.0, 40.0, 2.0, 0.8], // 高度为零
      [50.0, 50.0, 60.0, 60.0, 3.0, 0.7],
    ]);
    let masks = ones_masks(3, 4);

    let out = unmold_detections(detections.view(), masks.view(), (100, 100), &FULL_WINDOW).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out.class_ids, vec![1, 3]);
    assert_eq!(out.scores, vec![0.9, 0.7]);
    assert_eq!(out.boxes.len(), 2);
    assert_eq!(out.masks.len(), 2);
  }

  #[test]
  fn zero_survivors_yield_well_formed_empties() {
    let detections = detections_from(&[[0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]);
    let masks = ones_masks(1, 4);

    let out = unmold_detections(detections.view(), masks.view(), (100, 100), &FULL_WINDOW).unwrap();
    assert!(out.is_empty());
    assert!(out.boxes.is_empty());
    assert!(out.class_ids.is_empty());
    assert!(out.scores.is_empty());
    assert!(out.masks.is_empty());
  }

  #[test]
  fn inverse_transform_round_trips_within_one_pixel() {
    // 600x800 图像在 min=800, max=1024 填充下: scale = 1.28, 窗口 (128, 0, 896, 1024)
    let window = Window {
      y1: 128,
      x1: 0,
      y2: 896,
      x2: 1024,
    };
    let original = [100.0f32, 200.0, 300.0, 400.0];
    let forward_scale = 1.28f32;
    let shift = [128.0f32, 0.0, 128.0, 0.0];
    let molded: Vec<f32> = original
      .iter()
      .zip(shift)
      .map(|(&v, s)| v * forward_scale + s)
      .collect();

    let detections = detections_from(&[[molded[0], molded[1], molded[2], molded[3], 1.0, 0.99]]);
    let masks = ones_masks(1, 2);

    let out = unmold_detections(detections.view(), masks.view(), (600, 800), &window).unwrap();
    assert_eq!(out.len(), 1);
    for (recovered, expected) in out.boxes[0].iter().zip(original) {
      assert!((recovered - expected as i32).abs() <= 1);
    }
  }

  #[test]
  fn gathers_each_detection_own_class_plane() {
    // 只有「检测自己的类别」对应的平面有值，取错平面会得到全零掩码
    let detections = detections_from(&[
      [0.0, 0.0, 2.0, 2.0, 1.0, 0.9],
      [2.0, 2.0, 4.0, 4.0, 2.0, 0.8],
    ]);
    let mut masks = Array4::<f32>::zeros((2, 4, 4, 3));
    masks.slice_mut(s![0, .., .., 1]).fill(1.0);
    masks.slice_mut(s![1, .., .., 2]).fill(1.0);

    let window = Window {
      y1: 0,
      x1: 0,
      y2: 4,
      x2: 4,
    };
    let out = unmold_detections(detections.view(), masks.view(), (4, 4), &window).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out.masks[0].get_pixel(0, 0)[0], 255);
    assert_eq!(out.masks[0].get_pixel(3, 3)[0], 0);
    assert_eq!(out.masks[1].get_pixel(3, 3)[0], 255);
    assert_eq!(out.masks[1].get_pixel(0, 0)[0], 0);
  }

  #[test]
  fn class_id_beyond_mask_planes_is_out_of_range() {
    let detections = detections_from(&[[10.0, 10.0, 20.0, 20.0, 7.0, 0.9]]);
    let masks = ones_masks(1, 4);

    let err =
      unmold_detections(detections.view(), masks.view(), (100, 100), &FULL_WINDOW).unwrap_err();
    assert!(matches!(err, MoldError::OutOfRange { index: 0, .. }));
  }

  #[test]
  fn mismatched_buffers_are_rejected() {
    let bad_columns = Array2::<f32>::zeros((3, 5));
    let masks = ones_masks(3, 4);
    assert!(matches!(
      unmold_detections(bad_columns.view(), masks.view(), (100, 100), &FULL_WINDOW),
      Err(MoldError::ShapeMismatch(_))
    ));

    let detections = detections_from(&[[10.0, 10.0, 20.0, 20.0, 1.0, 0.9]]);
    let short_masks = ones_masks(3, 4);
    assert!(matches!(
      unmold_detections(detections.view(), short_masks.view(), (100, 100), &FULL_WINDOW),
      Err(MoldError::ShapeMismatch(_))
    ));
  }

  #[test]
  fn degenerate_window_is_invalid() {
    let detections = detections_from(&[[10.0, 10.0, 20.0, 20.0, 1.0, 0.9]]);
    let masks = ones_masks(1, 4);
    let window = Window {
      y1: 10,
      x1: 0,
      y2: 10,
      x2: 100,
    };
    assert!(matches!(
      unmold_detections(detections.view(), masks.view(), (100, 100), &window),
      Err(MoldError::InvalidInput(_))
    ));
  }
}
