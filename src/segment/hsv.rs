// 该文件是 CircusEyes （马戏之眼） 项目的一部分。
// src/segment/hsv.rs - 8 位 RGB 到 HSV 的定点转换
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 CircusEyes Authors

use std::sync::OnceLock;

use tracing::debug;

const HSV_SHIFT: i32 = 12;
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);
const HUE_RANGE: i32 = 180;

/// 除法查找表：饱和度按 `v` 查，色相按 `max - min` 查
pub struct HsvTables {
  sdiv: [i32; 256],
  hdiv: [i32; 256],
}

impl HsvTables {
  fn build() -> Self {
    let mut sdiv = [0i32; 256];
    let mut hdiv = [0i32; 256];
    for i in 1..256usize {
      sdiv[i] = ((255 << HSV_SHIFT) as f64 / i as f64).round() as i32;
      hdiv[i] = ((HUE_RANGE << HSV_SHIFT) as f64 / (6.0 * i as f64)).round() as i32;
    }
    debug!("HSV 查找表初始化完成");
    Self { sdiv, hdiv }
  }
}

static TABLES: OnceLock<HsvTables> = OnceLock::new();

/// 获取进程内唯一的查找表，首次调用时构建
pub fn tables() -> &'static HsvTables {
  TABLES.get_or_init(HsvTables::build)
}

/// RGB 转 HSV，H 取值 `[0, 180)`，S、V 取值 `[0, 255]`
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
  let t = tables();
  let (r, g, b) = (r as i32, g as i32, b as i32);

  let v = r.max(g).max(b);
  let diff = v - r.min(g).min(b);
  let vr = if v == r { -1 } else { 0 };
  let vg = if v == g { -1 } else { 0 };

  let s = (diff * t.sdiv[v as usize] + HSV_ROUND) >> HSV_SHIFT;
  let mut h = (vr & (g - b)) + (!vr & ((vg & (b - r + 2 * diff)) + (!vg & (r - g + 4 * diff))));
  h = (h * t.hdiv[diff as usize] + HSV_ROUND) >> HSV_SHIFT;
  if h < 0 {
    h += HUE_RANGE;
  }

  [h as u8, s as u8, v as u8]
}
