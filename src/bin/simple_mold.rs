// 该文件是 Moying （膜影） 项目的一部分。
// src/bin/simple_mold.rs - 塑模/逆变换演示
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageReader;
use ndarray::{Array2, Array4, arr1, s};
use tracing::info;

use moying::{MoldConfig, device::HostDevice, mold::mold_inputs, unmold::unmold_detections};

/// Moying 塑模演示参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// 输入图像路径
  #[arg(long, value_name = "FILE")]
  input: String,

  /// 掩码输出路径
  #[arg(long, value_name = "FILE")]
  output: String,

  /// 最小边约束（0 表示不设）
  #[arg(long, default_value = "800", value_name = "DIM")]
  min_dim: u32,

  /// 最大边约束（0 表示不设）
  #[arg(long, default_value = "1024", value_name = "DIM")]
  max_dim: u32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入图像: {}", args.input);
  info!("掩码输出: {}", args.output);

  let image = ImageReader::open(&args.input)
    .with_context(|| format!("无法打开图像: {}", args.input))?
    .decode()
    .with_context(|| format!("无法解码图像: {}", args.input))?
    .into_rgb8();

  let config = MoldConfig {
    image_min_dim: args.min_dim,
    image_max_dim: args.max_dim,
    ..MoldConfig::default()
  };

  info!("开始塑模...");
  let now = std::time::Instant::now();
  let batch = mold_inputs(&[image], &config)?.place_on(&HostDevice)?;
  info!(
    "塑模完成, 批张量 {:?}, 耗时: {:.2?}",
    batch.tensor.dim(),
    now.elapsed()
  );

  let meta = &batch.metas[0];
  let window = batch.windows[0];
  info!(
    "原图 {}x{}, 窗口 ({}, {}, {}, {})",
    meta.original_height, meta.original_width, window.y1, window.x1, window.y2, window.x2
  );

  // 此处本应调用外部网络推理; 演示改用一条铺满窗口的伪检测
  let mut detections = Array2::<f32>::zeros((1, 6));
  detections.slice_mut(s![0, ..]).assign(&arr1(&[
    window.y1 as f32,
    window.x1 as f32,
    window.y2 as f32,
    window.x2 as f32,
    1.0,
    1.0,
  ]));
  let mut raw_masks = Array4::<f32>::zeros((1, 28, 28, config.num_classes));
  raw_masks.slice_mut(s![0, .., .., 1]).fill(1.0);

  info!("开始逆变换...");
  let now = std::time::Instant::now();
  let out = unmold_detections(
    detections.view(),
    raw_masks.view(),
    (meta.original_height, meta.original_width),
    &window,
  )?;
  info!("逆变换得到 {} 个检测, 耗时: {:.2?}", out.len(), now.elapsed());

  match out.masks.first() {
    Some(mask) => {
      mask
        .save(&args.output)
        .with_context(|| format!("无法保存掩码: {}", args.output))?;
      info!("掩码已保存: {}", args.output);
    }
    None => info!("没有留存的检测, 不产出掩码"),
  }

  Ok(())
}
