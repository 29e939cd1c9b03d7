//! 外部模型接口
//!
//! 两者都是阻塞调用，由 engine 放到阻塞线程池中执行并加超时和并发上限，实现方无需自己处理线程

use anyhow::Result;
use image::RgbImage;
use ndarray::{Array2, Array4};

use crate::models::region::MaskRecord;

pub trait SegmentationOracle: Send + Sync {
    /// 单张图的候选区域，掩码与图片同尺寸
    fn generate(&self, image: &RgbImage) -> Result<Vec<MaskRecord>>;
}

pub trait ClassifierOracle: Send + Sync {
    /// 输入 [N, S, S, 3] 画布，输出 [N, 3] 类别概率，行顺序一致
    fn predict(&self, batch: &Array4<f32>) -> Result<Array2<f32>>;
}
