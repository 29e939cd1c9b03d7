use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use log::debug;

use crate::config::MaskFilterArgs;
use crate::error::{LeafError, Result};
use crate::models::region::{MaskRecord, RegionMask};
use crate::my_utils::math::aspect_ratio;
use crate::recognition::engine::Engine;

pub trait FilterMasks {
    /// 单张图中形状像叶片的区域
    fn filter_masks(&self, records: Vec<MaskRecord>) -> FilteredMasks;
}

impl FilterMasks for Engine {
    fn filter_masks(&self, records: Vec<MaskRecord>) -> FilteredMasks {
        let args = &self.config().mask_filter;
        let min_area = min_leaf_area(&records, args.min_area_ratio);
        filter_masks(records, min_area, args)
    }
}

/// 保留的区域，保持输入顺序
#[derive(Debug, Clone, Default)]
pub struct FilteredMasks {
    pub records: Vec<MaskRecord>,
}

impl FilteredMasks {
    pub fn masks(&self) -> impl Iterator<Item = &RegionMask> {
        self.records.iter().map(|r| &r.mask)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 面积阈值 = `ratio` * 图中模型面积最大值，没有区域时为 0
pub fn min_leaf_area(records: &[MaskRecord], ratio: f64) -> f64 {
    let max_area = records.iter().map(|r| r.area).max().unwrap_or(0);
    ratio * max_area as f64
}

/// 掩码转二值图并加一圈空白边框，贴边区域也能得到闭合轮廓
fn framed_luma(mask: &RegionMask) -> GrayImage {
    GrayImage::from_fn(mask.width() + 2, mask.height() + 2, |x, y| {
        if x == 0 || y == 0 || !mask.get(x - 1, y - 1) { Luma([0u8]) } else { Luma([255u8]) }
    })
}

/// 按扫描顺序最后一个外轮廓的外接矩形宽高，即分离掩码中最靠下的部分
pub fn external_contour_size(mask: &RegionMask) -> Result<(u32, u32)> {
    let contours: Vec<Contour<i32>> = find_contours(&framed_luma(mask));
    let outer = contours
        .iter()
        .rev()
        .find(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .ok_or(LeafError::DegenerateMask)?;
    if outer.points.is_empty() {
        return Err(LeafError::DegenerateMask);
    }
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for p in outer.points.iter() {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Ok(((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32))
}

/// 面积严格大于阈值且宽高比严格小于上限
pub fn passes_leaf_shape(area: u64, w: u32, h: u32, min_leaf_area: f64, args: &MaskFilterArgs) -> bool {
    area as f64 > min_leaf_area && aspect_ratio(w, h) < args.max_aspect_ratio
}

pub fn filter_masks(records: Vec<MaskRecord>, min_leaf_area: f64, args: &MaskFilterArgs) -> FilteredMasks {
    let total = records.len();
    let mut kept = Vec::with_capacity(total);
    for record in records {
        let area = record.mask.area();
        let (w, h) = match external_contour_size(&record.mask) {
            Ok(size) => size,
            Err(_) => continue,
        };
        if passes_leaf_shape(area, w, h, min_leaf_area, args) {
            kept.push(record);
        }
    }
    debug!("mask filter kept {}/{} regions (min area {:.1})", kept.len(), total, min_leaf_area);
    FilteredMasks { records: kept }
}
