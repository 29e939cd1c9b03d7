//! 测试用的确定性模型

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use image::RgbImage;
use ndarray::{Array2, Array4};

use crate::models::region::{MaskRecord, RegionMask};
use crate::recognition::oracle::{ClassifierOracle, SegmentationOracle};

/// `width` x `height` 图上的实心矩形掩码
pub fn rect_record(width: u32, height: u32, x: u32, y: u32, w: u32, h: u32) -> MaskRecord {
    MaskRecord::from_mask(RegionMask::from_fn(width, height, |px, py| {
        px >= x && px < x + w && py >= y && py < y + h
    }))
}

/// 每张图返回相同区域
pub struct FixedSegmenter(pub Vec<MaskRecord>);

impl SegmentationOracle for FixedSegmenter {
    fn generate(&self, _image: &RgbImage) -> Result<Vec<MaskRecord>> {
        Ok(self.0.clone())
    }
}

/// 每种非黑颜色一个区域
pub struct ColorSegmenter;

impl SegmentationOracle for ColorSegmenter {
    fn generate(&self, image: &RgbImage) -> Result<Vec<MaskRecord>> {
        let colors: BTreeSet<[u8; 3]> =
            image.pixels().map(|p| p.0).filter(|c| *c != [0, 0, 0]).collect();
        Ok(colors
            .into_iter()
            .map(|color| {
                MaskRecord::from_mask(RegionMask::from_fn(image.width(), image.height(), |x, y| {
                    image.get_pixel(x, y).0 == color
                }))
            })
            .collect())
    }
}

pub struct FailingSegmenter;

impl SegmentationOracle for FailingSegmenter {
    fn generate(&self, _image: &RgbImage) -> Result<Vec<MaskRecord>> {
        Err(anyhow!("checkpoint not loaded"))
    }
}

/// 指定宽度的图片报错，其余转发
pub struct FailOnWidth<S>(pub u32, pub S);

impl<S: SegmentationOracle> SegmentationOracle for FailOnWidth<S> {
    fn generate(&self, image: &RgbImage) -> Result<Vec<MaskRecord>> {
        if image.width() == self.0 {
            return Err(anyhow!("segmentation crashed"));
        }
        self.1.generate(image)
    }
}

/// 第 i 行输出为 `rows[i % rows.len()]`
pub struct FixedClassifier(pub Vec<[f32; 3]>);

impl ClassifierOracle for FixedClassifier {
    fn predict(&self, batch: &Array4<f32>) -> Result<Array2<f32>> {
        let n = batch.shape()[0];
        Ok(Array2::from_shape_fn((n, 3), |(i, c)| self.0[i % self.0.len()][c]))
    }
}

/// 按画布中心像素的主通道判定：红为晚疫病，蓝为早疫病，绿为健康
pub struct CenterColorClassifier;

impl ClassifierOracle for CenterColorClassifier {
    fn predict(&self, batch: &Array4<f32>) -> Result<Array2<f32>> {
        let n = batch.shape()[0];
        let mid = batch.shape()[1] / 2;
        let mut out = Array2::<f32>::zeros((n, 3));
        for i in 0..n {
            let (r, g, b) = (batch[[i, mid, mid, 0]], batch[[i, mid, mid, 1]], batch[[i, mid, mid, 2]]);
            let class = if r >= g && r >= b {
                1
            } else if b >= g {
                0
            } else {
                2
            };
            out[[i, class]] = 0.9;
            for other in (0..3).filter(|&c| c != class) {
                out[[i, other]] = 0.05;
            }
        }
        Ok(out)
    }
}

pub struct SlowClassifier(pub Duration);

impl ClassifierOracle for SlowClassifier {
    fn predict(&self, batch: &Array4<f32>) -> Result<Array2<f32>> {
        std::thread::sleep(self.0);
        Ok(Array2::from_elem((batch.shape()[0], 3), 1.0 / 3.0))
    }
}

/// 少返回一行
pub struct ShortClassifier;

impl ClassifierOracle for ShortClassifier {
    fn predict(&self, batch: &Array4<f32>) -> Result<Array2<f32>> {
        Ok(Array2::zeros((batch.shape()[0].saturating_sub(1), 3)))
    }
}

/// 记录同时调用数的峰值
#[derive(Default)]
pub struct CountingClassifier {
    pub active: AtomicUsize,
    pub peak: Arc<AtomicUsize>,
}

impl ClassifierOracle for CountingClassifier {
    fn predict(&self, batch: &Array4<f32>) -> Result<Array2<f32>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Array2::from_shape_fn((batch.shape()[0], 3), |(_, c)| if c == 2 { 0.9 } else { 0.05 }))
    }
}
