use anyhow::anyhow;
use ndarray::Array2;

use crate::error::{LeafError, OracleKind, Result};
use crate::models::region::MaskRecord;
use crate::models::verdict::{DiseaseClass, ImageVerdict, RegionPrediction};
use crate::my_utils::math::{argmax, bincount};

/// 每行概率得到一个预测，形状必须是 [expected_rows, 3]
pub fn predictions_from_probabilities(probs: &Array2<f32>, expected_rows: usize) -> Result<Vec<RegionPrediction>> {
    let classes = DiseaseClass::ALL.len();
    let (rows, cols) = probs.dim();
    if rows != expected_rows || cols != classes {
        return Err(LeafError::PredictionShape { expected: (expected_rows, classes), got: (rows, cols) });
    }
    let mut predictions = Vec::with_capacity(rows);
    for (i, row) in probs.rows().into_iter().enumerate() {
        let row: Vec<f32> = row.iter().copied().collect();
        let (predicted_class, confidence) = argmax(&row)
            .and_then(|(index, confidence)| DiseaseClass::from_index(index).map(|class| (class, confidence)))
            .ok_or_else(|| {
                LeafError::oracle_failure(OracleKind::Classifier, anyhow!("row {i} has no usable probability: {row:?}"))
            })?;
        predictions.push(RegionPrediction { confidence, predicted_class });
    }
    Ok(predictions)
}

/// 病害类别多数表决，平局取早疫病，没有病害区域时为健康
pub fn detect_disease(predictions: &[RegionPrediction]) -> DiseaseClass {
    let counts = bincount(predictions.iter().map(|p| p.predicted_class));
    let early = counts.get(&DiseaseClass::EarlyBlight).copied().unwrap_or(0);
    let late = counts.get(&DiseaseClass::LateBlight).copied().unwrap_or(0);
    if early == 0 && late == 0 {
        return DiseaseClass::Healthy;
    }
    if late > early {
        DiseaseClass::LateBlight
    } else {
        DiseaseClass::EarlyBlight
    }
}

/// 单张图的判定，`records` 为按批次顺序的已分类区域
pub fn build_image_verdict(records: &[MaskRecord], predictions: &[RegionPrediction]) -> ImageVerdict {
    debug_assert_eq!(records.len(), predictions.len());
    let bbox_list = records.iter().flat_map(|r| r.bbox.to_xywh()).collect();
    ImageVerdict {
        detected_disease: detect_disease(predictions),
        bbox_list,
        confidences: predictions.iter().map(|p| p.confidence).collect(),
        predictions: predictions.iter().map(|p| p.predicted_class).collect(),
        edited: false,
        treated: false,
    }
}
