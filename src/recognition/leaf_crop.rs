use image::RgbImage;

use crate::error::{LeafError, Result};
use crate::models::region::{LeafCrop, RegionMask};
use crate::my_utils::image::crop_masked;

/// 按掩码 true 像素紧密裁剪，掩码外置零，不修改原图
pub fn extract_leaf_crop(mask: &RegionMask, image: &RgbImage) -> Result<LeafCrop> {
    if mask.dimensions() != image.dimensions() {
        return Err(LeafError::DimensionMismatch {
            mask: mask.dimensions(),
            image: image.dimensions(),
        });
    }
    let bbox = mask.bounding_box().ok_or(LeafError::EmptyMask)?;
    let pixels = crop_masked(image, mask, &bbox);
    Ok(LeafCrop { pixels, bbox })
}
