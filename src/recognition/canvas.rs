use image::imageops;
use image::RgbImage;
use ndarray::Array4;

use crate::models::canvas_geometry::{CANVAS_OFFSET, CANVAS_SIZE, CROP_SIZE};
use crate::models::region::{Canvas, LeafCrop};
use crate::my_utils::image::{canvases_to_tensor, resize_bilinear};
use crate::recognition::engine::Engine;

pub trait ComposeCanvas {
    /// 按分类器输入尺寸生成画布
    fn compose_canvas(&self, crop: &LeafCrop) -> Canvas;
    /// 分类器批次张量，行顺序与画布一致
    fn canvas_batch(&self, canvases: &[&Canvas]) -> Array4<f32>;
}

impl ComposeCanvas for Engine {
    fn compose_canvas(&self, crop: &LeafCrop) -> Canvas {
        compose_canvas(crop, self.config().classifier.input_size)
    }

    fn canvas_batch(&self, canvases: &[&Canvas]) -> Array4<f32> {
        let args = &self.config().classifier;
        canvases_to_tensor(canvases, args.input_size, args.pixel_scale)
    }
}

/// 裁剪图缩放到 150x150，贴到 224x224 黑色画布的 (37, 37)
/// 再缩放到分类器需要的 `input_size`
pub fn compose_canvas(crop: &LeafCrop, input_size: u32) -> Canvas {
    let resized = resize_bilinear(&crop.pixels, CROP_SIZE, CROP_SIZE);
    let mut canvas = RgbImage::new(CANVAS_SIZE, CANVAS_SIZE);
    imageops::overlay(&mut canvas, &resized, CANVAS_OFFSET as i64, CANVAS_OFFSET as i64);
    Canvas { pixels: resize_bilinear(&canvas, input_size, input_size) }
}
