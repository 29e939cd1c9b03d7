use ab_glyph::FontArc;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::{debug, info};
use ndarray::Array4;

use crate::models::canvas_geometry::CHANNELS;
use crate::models::region::{BBox, Canvas, RegionMask};

const SYSTEM_FONTS: [&str; 3] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// 按 bbox 裁剪，只保留掩码内像素，其余置黑
/// 调用方保证掩码与图片同尺寸，bbox 在图内
pub fn crop_masked(input_image: &RgbImage, mask: &RegionMask, bbox: &BBox) -> RgbImage {
    RgbImage::from_fn(bbox.w, bbox.h, |x, y| {
        let src_x = bbox.x + x;
        let src_y = bbox.y + y;
        if mask.get(src_x, src_y) {
            *input_image.get_pixel(src_x, src_y)
        } else {
            Rgb([0u8; 3])
        }
    })
}

/// 双线性缩放，尺寸相同时直接复制
pub fn resize_bilinear(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// 缩略图
pub fn thumbnail(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    resize_bilinear(img, width, height)
}

/// 画布拼成 [N, H, W, 3] 张量，每个通道乘以 `pixel_scale`
pub fn canvases_to_tensor(canvases: &[&Canvas], size: u32, pixel_scale: f32) -> Array4<f32> {
    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((canvases.len(), side, side, CHANNELS));
    for (n, canvas) in canvases.iter().enumerate() {
        for (x, y, pixel) in canvas.pixels.enumerate_pixels() {
            if x >= size || y >= size {
                continue;
            }
            for c in 0..CHANNELS {
                tensor[[n, y as usize, x as usize, c]] = pixel[c] as f32 * pixel_scale;
            }
        }
    }
    tensor
}

/// 矩形框 (x, y)-(x+w, y+h) 两端都包含，线宽沿边线居中，偶数线宽多出的一圈在外侧
pub fn draw_thick_rect_mut(img: &mut RgbImage, bbox: &BBox, thickness: i32, color: Rgb<u8>) {
    if bbox.w == 0 || bbox.h == 0 {
        return;
    }
    let thickness = thickness.max(1);
    for offset in -((thickness - 1) / 2)..=(thickness / 2) {
        let width = bbox.w as i32 + 1 + 2 * offset;
        let height = bbox.h as i32 + 1 + 2 * offset;
        if width <= 0 || height <= 0 {
            continue;
        }
        let rect = Rect::at(bbox.x as i32 - offset, bbox.y as i32 - offset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// 加载字体，找不到时尝试系统字体，返回 None 则不画文字
pub fn load_font(path: Option<&str>) -> Option<FontArc> {
    let mut candidates: Vec<&str> = Vec::with_capacity(SYSTEM_FONTS.len() + 1);
    if let Some(path) = path {
        candidates.push(path);
    }
    candidates.extend(SYSTEM_FONTS);
    for candidate in candidates {
        if let Ok(data) = std::fs::read(candidate) {
            if let Ok(font) = FontArc::try_from_vec(data) {
                info!("loaded font {candidate}");
                return Some(font);
            }
        }
    }
    debug!("no usable font found, labels will be skipped");
    None
}
