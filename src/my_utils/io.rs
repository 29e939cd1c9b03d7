use std::path::Path;

/// 文件名中解析出的区域和拍摄时间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFileName {
    /// "Zone <n>"
    pub zone: String,
    pub time: String,
}

/// 路径最后一段，按 linux 路径处理
pub fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// 解析 `<prefix>_<zone>_<time>.<ext>`，第三段之后忽略
pub fn parse_field_file_name(name: &str) -> Option<FieldFileName> {
    let mut parts = name.split('_');
    let _prefix = parts.next()?;
    let zone = parts.next().filter(|z| !z.is_empty())?;
    let time = parts.next()?;
    let time = time.split('.').next().filter(|t| !t.is_empty())?;
    Some(FieldFileName { zone: format!("Zone {zone}"), time: time.to_string() })
}

/// 从 "Zone <n>" 中取区域编号，即空格分隔的第二段
pub fn zone_number(zone_name: &str) -> Option<&str> {
    zone_name.split_whitespace().nth(1)
}
