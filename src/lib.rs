pub mod config;
pub mod error;
pub mod models;
pub mod my_utils;
pub mod recognition;

pub use config::{Config, CONFIG};
pub use error::{LeafError, OracleKind};
pub use models::field::FieldImage;
pub use models::verdict::{DiseaseClass, ImageRecord, ImageVerdict, ZoneReport, ZoneVerdict};
pub use recognition::engine::{BatchOutcome, Engine, ImageOutcome, ImageStatus};
pub use recognition::oracle::{ClassifierOracle, SegmentationOracle};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    use super::*;
    use recognition::stubs::{CenterColorClassifier, ColorSegmenter};
    use recognition::zone::attach_period_ids;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const DARK_RED: Rgb<u8> = Rgb([200, 0, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    /// 130x60 黑底，30x30 叶片依次放在 x = 10, 50, 90
    fn field(name: &str, leaves: &[Rgb<u8>]) -> FieldImage {
        let mut img = RgbImage::new(130, 60);
        for (i, color) in leaves.iter().enumerate() {
            draw_filled_rect_mut(&mut img, Rect::at(10 + 40 * i as i32, 10).of_size(30, 30), *color);
        }
        FieldImage::new(&format!("uploads/{name}"), img)
    }

    #[tokio::test]
    async fn field_batch_end_to_end() -> Result<()> {
        let engine = Engine::new(Config::default(), Arc::new(ColorSegmenter), Arc::new(CenterColorClassifier))
            .with_font(None);
        let batch = vec![
            field("field_3_0900.jpg", &[DARK_RED, RED, GREEN]),
            field("field_3_1000.jpg", &[GREEN]),
            field("field_4_0900.jpg", &[BLUE, GREEN]),
            field("field_3_1100.jpg", &[DARK_RED, RED, GREEN]),
            field("field_4_1200.jpg", &[]),
        ];
        let outcome = engine.process_batch(batch).await;

        let names: Vec<_> = outcome.images.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names[0], "field_3_0900.jpg");
        assert_eq!(names[4], "field_4_1200.jpg");
        assert!(matches!(outcome.images[4].status, ImageStatus::NoLeaves));

        // 区域顺序与分割器一致：绿、暗红、红
        let first = outcome.images[0].processed().expect("classified");
        assert_eq!(
            first.verdict.predictions,
            vec![DiseaseClass::Healthy, DiseaseClass::LateBlight, DiseaseClass::LateBlight]
        );
        assert_eq!(first.verdict.bbox_list, vec![90, 10, 30, 30, 10, 10, 30, 30, 50, 10, 30, 30]);
        assert_eq!(first.verdict.detected_disease, DiseaseClass::LateBlight);
        assert_eq!(first.annotated.get_pixel(10, 10), &Rgb([255, 255, 255]));
        assert_eq!(first.annotated.get_pixel(90, 10), &GREEN);
        assert_eq!(first.thumbnail.dimensions(), (80, 60));

        assert_eq!(outcome.images[1].verdict().map(|v| v.detected_disease), Some(DiseaseClass::Healthy));
        assert_eq!(outcome.images[2].verdict().map(|v| v.detected_disease), Some(DiseaseClass::EarlyBlight));

        let report = serde_json::to_value(outcome.zone_report())?;
        assert_eq!(
            report,
            serde_json::json!({"zones": [
                {"zone_name": "Zone 3", "current_disease": "Late blight"},
                {"zone_name": "Zone 4", "current_disease": "Early blight"},
            ]})
        );
        assert!(outcome.unzoned.is_empty());

        let period_ids = outcome.zone_report().period_ids_by_zone_number(&["p3".to_string(), "p4".to_string()]);
        let mut records = outcome.image_records();
        assert_eq!(records.len(), 4);
        attach_period_ids(&mut records, &period_ids);
        let (zone, record) = &records[2];
        assert_eq!(zone.as_deref(), Some("Zone 4"));
        let json = serde_json::to_value(record)?;
        assert_eq!(json["image_path"], "uploads/field_4_0900.jpg");
        assert_eq!(json["period_of_disease_id"], "p4");
        assert_eq!(json["classification"], serde_json::json!([0, 2]));
        assert_eq!(json["image_class"], 0);
        assert_eq!(json["edited"], false);
        Ok(())
    }
}
