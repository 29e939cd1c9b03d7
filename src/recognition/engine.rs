use std::sync::Arc;
use std::time::Duration;

use ab_glyph::FontArc;
use futures::future::join_all;
use image::RgbImage;
use log::{debug, info, warn};
use ndarray::{Array2, Array4};
use rayon::prelude::*;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::{Config, CONFIG};
use crate::error::{LeafError, OracleKind, Result};
use crate::models::field::FieldImage;
use crate::models::region::{Canvas, MaskRecord};
use crate::models::verdict::{ImageRecord, ImageVerdict, ZoneReport, ZoneVerdict};
use crate::my_utils::image::{load_font, thumbnail};
use crate::recognition::annotate::Annotate;
use crate::recognition::canvas::ComposeCanvas;
use crate::recognition::leaf_crop::extract_leaf_crop;
use crate::recognition::mask_filter::FilterMasks;
use crate::recognition::oracle::{ClassifierOracle, SegmentationOracle};
use crate::recognition::prediction::{build_image_verdict, predictions_from_probabilities};
use crate::recognition::zone::aggregate_zones;

/// 田间照片的分割、过滤、分类、标注流程
///
/// clone 开销很小，各副本共享模型和并发上限
#[derive(Clone)]
pub struct Engine {
    config: Arc<Config>,
    segmenter: Arc<dyn SegmentationOracle>,
    classifier: Arc<dyn ClassifierOracle>,
    font: Option<FontArc>,
    worker_slots: Arc<Semaphore>,
    segmentation_slots: Arc<Semaphore>,
    classifier_slots: Arc<Semaphore>,
}

/// 保留区域及其分类器输入
#[derive(Debug, Clone)]
pub struct ComposedRegion {
    pub record: MaskRecord,
    pub canvas: Canvas,
}

/// 单张图的分类批次，行与 `records` 对齐
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub records: Vec<MaskRecord>,
    pub tensor: Array4<f32>,
}

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub verdict: ImageVerdict,
    pub annotated: RgbImage,
    pub thumbnail: RgbImage,
}

#[derive(Debug)]
pub enum ImageStatus {
    Classified(ProcessedImage),
    /// 没有区域通过过滤，跳过该图
    NoLeaves,
    Failed(LeafError),
}

#[derive(Debug)]
pub struct ImageOutcome {
    pub name: String,
    pub source: String,
    pub zone: Option<String>,
    pub status: ImageStatus,
}

impl ImageOutcome {
    pub fn processed(&self) -> Option<&ProcessedImage> {
        match &self.status {
            ImageStatus::Classified(processed) => Some(processed),
            _ => None,
        }
    }

    pub fn verdict(&self) -> Option<&ImageVerdict> {
        self.processed().map(|p| &p.verdict)
    }

    pub fn error(&self) -> Option<&LeafError> {
        match &self.status {
            ImageStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// 批次结果，图片保持输入顺序
#[derive(Debug)]
pub struct BatchOutcome {
    pub images: Vec<ImageOutcome>,
    pub zones: Vec<ZoneVerdict>,
    /// 已分类但无法参与区域投票的图片
    pub unzoned: Vec<LeafError>,
}

impl BatchOutcome {
    pub fn zone_report(&self) -> ZoneReport {
        ZoneReport::new(self.zones.clone())
    }

    /// 已分类图片的上传记录及其区域
    pub fn image_records(&self) -> Vec<(Option<String>, ImageRecord)> {
        self.images
            .iter()
            .filter_map(|o| o.verdict().map(|v| (o.zone.clone(), ImageRecord::new(&o.source, v))))
            .collect()
    }
}

impl Engine {
    pub fn new(
        config: Config,
        segmenter: Arc<dyn SegmentationOracle>,
        classifier: Arc<dyn ClassifierOracle>,
    ) -> Self {
        let font = load_font(config.annotate.font_path.as_deref());
        Engine {
            worker_slots: Arc::new(Semaphore::new(config.pipeline.workers.max(1))),
            segmentation_slots: Arc::new(Semaphore::new(config.segmentation.max_in_flight.max(1))),
            classifier_slots: Arc::new(Semaphore::new(config.classifier.max_in_flight.max(1))),
            config: Arc::new(config),
            segmenter,
            classifier,
            font,
        }
    }

    /// 使用全局 `CONFIG` 创建
    pub fn with_global_config(
        segmenter: Arc<dyn SegmentationOracle>,
        classifier: Arc<dyn ClassifierOracle>,
    ) -> Self {
        Engine::new(CONFIG.clone(), segmenter, classifier)
    }

    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    /// 并行裁剪并生成画布，空掩码丢弃，其他错误使整张图失败
    pub fn compose_regions(&self, records: Vec<MaskRecord>, image: &RgbImage) -> Result<Vec<ComposedRegion>> {
        let composed = records
            .into_par_iter()
            .map(|record| match extract_leaf_crop(&record.mask, image) {
                Ok(crop) => Ok(Some(ComposedRegion { canvas: self.compose_canvas(&crop), record })),
                Err(LeafError::EmptyMask) => {
                    warn!("dropping region {:?}: {}", record.bbox, LeafError::EmptyMask);
                    Ok(None)
                }
                Err(err) => Err(err),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(composed.into_iter().flatten().collect())
    }

    /// 过滤、裁剪、生成画布，得到单张图的分类批次
    pub fn prepare_batch(&self, records: Vec<MaskRecord>, image: &RgbImage) -> Result<PreparedBatch> {
        let filtered = self.filter_masks(records);
        let regions = self.compose_regions(filtered.records, image)?;
        let canvases: Vec<&Canvas> = regions.iter().map(|r| &r.canvas).collect();
        let tensor = self.canvas_batch(&canvases);
        let records = regions.into_iter().map(|r| r.record).collect();
        Ok(PreparedBatch { records, tensor })
    }

    /// 根据分类结果生成判定、标注图和缩略图
    pub fn finish_image(&self, image: &RgbImage, records: &[MaskRecord], probs: &Array2<f32>) -> Result<ProcessedImage> {
        let predictions = predictions_from_probabilities(probs, records.len())?;
        let verdict = build_image_verdict(records, &predictions);
        let annotated = self.annotate(image, &verdict);
        let args = &self.config.pipeline;
        let thumbnail = thumbnail(image, args.thumbnail_width, args.thumbnail_height);
        Ok(ProcessedImage { verdict, annotated, thumbnail })
    }

    /// 处理单张图，错误记录在结果中
    pub async fn process_image(&self, field: FieldImage) -> ImageOutcome {
        let FieldImage { name, source, image, zone, .. } = field;
        let status = match self.run_image(&name, image).await {
            Ok(Some(processed)) => ImageStatus::Classified(processed),
            Ok(None) => ImageStatus::NoLeaves,
            Err(err) => {
                warn!("image {name} excluded: {err}");
                ImageStatus::Failed(err)
            }
        };
        ImageOutcome { name, source, zone, status }
    }

    /// 并发处理所有图片，全部结束后再做区域投票
    pub async fn process_batch(&self, images: Vec<FieldImage>) -> BatchOutcome {
        let total = images.len();
        let outcomes = join_all(images.into_iter().map(|image| self.process_image(image))).await;

        let mut unzoned = Vec::new();
        let mut voters = Vec::new();
        for outcome in outcomes.iter() {
            let Some(verdict) = outcome.verdict() else { continue };
            match outcome.zone.as_deref() {
                Some(zone) => voters.push((zone, verdict.detected_disease)),
                None => {
                    let err = LeafError::ZoneIdentifierMissing { image: outcome.name.clone() };
                    warn!("{err}");
                    unzoned.push(err);
                }
            }
        }
        let voted = voters.len();
        let zones = aggregate_zones(voters);
        let failed = outcomes.iter().filter(|o| o.error().is_some()).count();
        info!("batch of {total}: {voted} voted in {} zones, {failed} failed", zones.len());

        BatchOutcome { images: outcomes, zones, unzoned }
    }

    async fn run_image(&self, name: &str, image: Arc<RgbImage>) -> Result<Option<ProcessedImage>> {
        let _worker = self
            .worker_slots
            .acquire()
            .await
            .map_err(|_| LeafError::WorkerLost { stage: "worker pool" })?;

        let segmenter = Arc::clone(&self.segmenter);
        let img = Arc::clone(&image);
        let records = call_oracle(
            OracleKind::Segmentation,
            &self.segmentation_slots,
            self.config.segmentation.timeout_ms,
            move || segmenter.generate(&img),
        )
        .await?;
        debug!("{name}: {} regions from segmentation", records.len());

        let engine = self.clone();
        let img = Arc::clone(&image);
        let batch = run_blocking("canvas composition", move || engine.prepare_batch(records, &img)).await?;
        if batch.records.is_empty() {
            info!("{name}: no leaf candidates");
            return Ok(None);
        }

        let classifier = Arc::clone(&self.classifier);
        let tensor = batch.tensor;
        let probs = call_oracle(
            OracleKind::Classifier,
            &self.classifier_slots,
            self.config.classifier.timeout_ms,
            move || classifier.predict(&tensor),
        )
        .await?;

        let engine = self.clone();
        let records = batch.records;
        let processed = run_blocking("annotation", move || engine.finish_image(&image, &records, &probs)).await?;
        debug!(
            "{name}: {} regions, detected {}",
            processed.verdict.region_count(),
            processed.verdict.detected_disease
        );
        Ok(Some(processed))
    }
}

async fn run_blocking<T, F>(stage: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|_| LeafError::WorkerLost { stage })?
}

/// 在阻塞线程池中调用模型，等待并发槽位也计入超时
/// 槽位一直占用到模型返回，即使调用方已经超时
async fn call_oracle<T, F>(oracle: OracleKind, slots: &Arc<Semaphore>, timeout_ms: u64, f: F) -> Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let slots = Arc::clone(slots);
    let call = async move {
        let permit = slots
            .acquire_owned()
            .await
            .map_err(|_| LeafError::WorkerLost { stage: "oracle slots" })?;
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        });
        match task.await {
            Err(join_err) => Err(LeafError::oracle_failure(oracle, join_err)),
            Ok(result) => result.map_err(|source| LeafError::OracleFailure { oracle, source }),
        }
    };
    timeout(Duration::from_millis(timeout_ms), call)
        .await
        .unwrap_or_else(|_| Err(LeafError::OracleTimeout { oracle, after_ms: timeout_ms }))
}
