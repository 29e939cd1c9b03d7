use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 指定配置文件路径的环境变量
pub const CONFIG_ENV: &str = "LEAF_BLIGHT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// 叶片候选区域过滤
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MaskFilterArgs {
    /// min_leaf_area = min_area_ratio * 图中最大面积
    pub min_area_ratio: f64,
    pub max_aspect_ratio: f64,
}

impl Default for MaskFilterArgs {
    fn default() -> Self {
        Self { min_area_ratio: 0.4, max_aspect_ratio: 2.5 }
    }
}

/// 分类模型参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClassifierArgs {
    /// 模型输入边长
    pub input_size: u32,
    /// 构建张量时每个 u8 通道乘以该系数
    pub pixel_scale: f32,
    pub timeout_ms: u64,
    pub max_in_flight: usize,
}

impl Default for ClassifierArgs {
    fn default() -> Self {
        Self { input_size: 224, pixel_scale: 1.0, timeout_ms: 60_000, max_in_flight: 1 }
    }
}

/// 分割模型参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SegmentationArgs {
    pub timeout_ms: u64,
    pub max_in_flight: usize,
}

impl Default for SegmentationArgs {
    fn default() -> Self {
        Self { timeout_ms: 120_000, max_in_flight: 1 }
    }
}

/// 标注图绘制参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AnnotateArgs {
    /// 置信度低于该值的健康区域也要画框
    pub uncertain_healthy_confidence: f32,
    pub bbox_thickness: i32,
    pub font_scale: f32,
    pub text_margin: i32,
    pub color: [u8; 3],
    pub font_path: Option<String>,
}

impl Default for AnnotateArgs {
    fn default() -> Self {
        Self {
            uncertain_healthy_confidence: 0.70,
            bbox_thickness: 2,
            font_scale: 16.0,
            text_margin: 5,
            color: [255, 255, 255],
            font_path: None,
        }
    }
}

/// 批处理参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PipelineArgs {
    /// 同时处理的图片数
    pub workers: usize,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for PipelineArgs {
    fn default() -> Self {
        Self { workers: 4, thumbnail_width: 80, thumbnail_height: 60 }
    }
}

/// 全部配置
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mask_filter: MaskFilterArgs,
    pub classifier: ClassifierArgs,
    pub segmentation: SegmentationArgs,
    pub annotate: AnnotateArgs,
    pub pipeline: PipelineArgs,
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse config")
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

fn load_global_config() -> Config {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_or_default(Path::new(&path))
}

/// 文件不存在或解析失败时回退到默认配置
fn load_config_or_default(path: &Path) -> Config {
    if !path.exists() {
        info!("no config at {}, using defaults", path.display());
        return Config::default();
    }
    match Config::from_yaml_file(path) {
        Ok(config) => config,
        Err(err) => {
            warn!("{err:#}, using defaults");
            Config::default()
        }
    }
}

// 全局配置单例
pub static CONFIG: Lazy<Config> = Lazy::new(load_global_config);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_field_pipeline() {
        let config = Config::default();
        assert_eq!(config.mask_filter.min_area_ratio, 0.4);
        assert_eq!(config.mask_filter.max_aspect_ratio, 2.5);
        assert_eq!(config.classifier.input_size, 224);
        assert_eq!(config.annotate.uncertain_healthy_confidence, 0.70);
        assert_eq!(config.pipeline.thumbnail_width, 80);
        assert_eq!(config.pipeline.thumbnail_height, 60);
    }

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let config = Config::from_yaml_str(
            "classifier:\n  input_size: 300\n  pixel_scale: 0.00392\nannotate:\n  font_path: /tmp/font.ttf\n",
        )?;
        assert_eq!(config.classifier.input_size, 300);
        assert_eq!(config.classifier.max_in_flight, 1);
        assert_eq!(config.annotate.font_path.as_deref(), Some("/tmp/font.ttf"));
        assert_eq!(config.mask_filter, MaskFilterArgs::default());
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::from_yaml_file("/definitely/not/here.yaml").is_err());
    }

    #[test]
    fn global_loader_falls_back_to_defaults() -> Result<()> {
        assert_eq!(load_config_or_default(Path::new("/definitely/not/here.yaml")), Config::default());

        let dir = std::env::temp_dir().join(format!("leaf_blight_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let broken = dir.join("broken.yaml");
        std::fs::write(&broken, "mask_filter: [not, a, map]\n")?;
        assert_eq!(load_config_or_default(&broken), Config::default());

        let custom = dir.join("custom.yaml");
        std::fs::write(&custom, "pipeline:\n  workers: 9\n")?;
        assert_eq!(load_config_or_default(&custom).pipeline.workers, 9);
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn global_config_is_loaded_once() {
        assert_eq!(*CONFIG, load_global_config());
    }

    #[test]
    fn shipped_config_parses() -> Result<()> {
        let config = Config::from_yaml_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config.yaml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }
}
