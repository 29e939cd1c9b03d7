use std::sync::Arc;

use image::RgbImage;

use crate::my_utils::io::{file_name_of, parse_field_file_name};

/// 一张待处理的田间照片
#[derive(Debug, Clone)]
pub struct FieldImage {
    /// 文件名，格式 `<prefix>_<zone>_<time>.<ext>`
    pub name: String,
    /// 照片来源路径，写入上传记录
    pub source: String,
    pub image: Arc<RgbImage>,
    pub zone: Option<String>,
    pub captured_at: Option<String>,
}

impl FieldImage {
    /// 文件名符合约定时从中解析区域和拍摄时间
    pub fn new(source: &str, image: RgbImage) -> Self {
        let name = file_name_of(source);
        let parsed = parse_field_file_name(&name);
        FieldImage {
            name,
            source: source.to_string(),
            image: Arc::new(image),
            zone: parsed.as_ref().map(|p| p.zone.clone()),
            captured_at: parsed.map(|p| p.time),
        }
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }
}
