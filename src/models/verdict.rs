/*
    Classification results, per region, per image and per zone.
*/

use serde::{Deserialize, Serialize};

use super::region::BBox;

/// 类别编号是下游约定，不能重新编号
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "u8", try_from = "u8")]
pub enum DiseaseClass {
    EarlyBlight = 0,
    LateBlight = 1,
    Healthy = 2,
}

impl DiseaseClass {
    pub const ALL: [DiseaseClass; 3] =
        [DiseaseClass::EarlyBlight, DiseaseClass::LateBlight, DiseaseClass::Healthy];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            DiseaseClass::EarlyBlight => "Early blight",
            DiseaseClass::LateBlight => "Late blight",
            DiseaseClass::Healthy => "Healthy",
        }
    }

    pub fn is_diseased(self) -> bool {
        !matches!(self, DiseaseClass::Healthy)
    }
}

impl From<DiseaseClass> for u8 {
    fn from(class: DiseaseClass) -> Self {
        class.index()
    }
}

impl TryFrom<u8> for DiseaseClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DiseaseClass::from_index(value as usize).ok_or_else(|| format!("unknown class id {value}"))
    }
}

impl std::fmt::Display for DiseaseClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct RegionPrediction {
    pub confidence: f32,
    pub predicted_class: DiseaseClass,
}

/// 单张图的病害结果，各数组按保留区域对齐
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageVerdict {
    pub detected_disease: DiseaseClass,
    /// 展平的 [x, y, w, h, x, y, w, h, ...]
    pub bbox_list: Vec<u32>,
    pub confidences: Vec<f32>,
    pub predictions: Vec<DiseaseClass>,
    pub edited: bool,
    pub treated: bool,
}

impl ImageVerdict {
    pub fn region_count(&self) -> usize {
        self.bbox_list.len() / 4
    }

    pub fn bboxes(&self) -> impl Iterator<Item = BBox> + '_ {
        self.bbox_list.chunks_exact(4).filter_map(BBox::from_xywh)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ZoneVerdict {
    pub zone_name: String,
    pub current_disease: String,
}

/// 区域周期接口的请求体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ZoneReport {
    pub zones: Vec<ZoneVerdict>,
}

/// 每张图的上传记录
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageRecord {
    pub image_path: String,
    pub period_of_disease_id: Option<String>,
    pub classification: Vec<DiseaseClass>,
    pub confidence: Vec<f32>,
    pub bbox: Vec<u32>,
    pub image_class: DiseaseClass,
    pub resized_path: Option<String>,
    pub annotated_path: Option<String>,
    pub edited: bool,
    pub treated: bool,
}

impl ImageRecord {
    pub fn new(image_path: &str, verdict: &ImageVerdict) -> Self {
        ImageRecord {
            image_path: image_path.to_string(),
            period_of_disease_id: None,
            classification: verdict.predictions.clone(),
            confidence: verdict.confidences.clone(),
            bbox: verdict.bbox_list.clone(),
            image_class: verdict.detected_disease,
            resized_path: None,
            annotated_path: None,
            edited: verdict.edited,
            treated: verdict.treated,
        }
    }
}
