use ab_glyph::FontArc;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

use crate::config::AnnotateArgs;
use crate::models::region::BBox;
use crate::models::verdict::{DiseaseClass, ImageVerdict};
use crate::my_utils::image::draw_thick_rect_mut;
use crate::recognition::engine::Engine;

pub trait Annotate {
    /// 复制 `image`，在病害和不确定区域画框并标注
    fn annotate(&self, image: &RgbImage, verdict: &ImageVerdict) -> RgbImage;
}

impl Annotate for Engine {
    fn annotate(&self, image: &RgbImage, verdict: &ImageVerdict) -> RgbImage {
        annotate_image(
            image,
            &verdict.bbox_list,
            &verdict.confidences,
            &verdict.predictions,
            &self.config().annotate,
            self.font(),
        )
    }
}

/// 病害区域一定画，健康区域只在置信度不足时画
pub fn should_annotate(class: DiseaseClass, confidence: f32, uncertain_healthy_confidence: f32) -> bool {
    class.is_diseased() || confidence < uncertain_healthy_confidence
}

pub fn region_label(class: DiseaseClass, confidence: f32) -> String {
    format!("{}: {:.2}%", class.name(), confidence * 100.0)
}

/// `bbox_list` 每个区域四个值，与另外两个数组对齐
/// 没有字体时只画框不写字
pub fn annotate_image(
    image: &RgbImage,
    bbox_list: &[u32],
    confidences: &[f32],
    predictions: &[DiseaseClass],
    args: &AnnotateArgs,
    font: Option<&FontArc>,
) -> RgbImage {
    let mut annotated = image.clone();
    let color = Rgb(args.color);
    let regions = bbox_list.chunks_exact(4).zip(confidences).zip(predictions);
    for ((xywh, &confidence), &class) in regions {
        if !should_annotate(class, confidence, args.uncertain_healthy_confidence) {
            continue;
        }
        let Some(bbox) = BBox::from_xywh(xywh) else { continue };
        draw_thick_rect_mut(&mut annotated, &bbox, args.bbox_thickness, color);
        if let Some(font) = font {
            draw_text_mut(
                &mut annotated,
                color,
                bbox.x as i32 + args.text_margin,
                bbox.y as i32 + args.text_margin,
                args.font_scale,
                font,
                &region_label(class, confidence),
            );
        }
    }
    annotated
}
