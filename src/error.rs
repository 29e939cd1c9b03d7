//! 叶片识别流程的错误类型
//!
//! 区域级错误只丢弃该区域，图片级错误只丢弃该图片，不会中断整个批次

use thiserror::Error;

/// 出错的外部模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleKind {
    Segmentation,
    Classifier,
}

impl std::fmt::Display for OracleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleKind::Segmentation => write!(f, "segmentation"),
            OracleKind::Classifier => write!(f, "classifier"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LeafError {
    /// 掩码没有轮廓或面积
    #[error("mask has no contour")]
    DegenerateMask,

    /// 裁剪时掩码没有 true 像素
    #[error("mask contains no true pixels")]
    EmptyMask,

    #[error("mask is {mask:?} but image is {image:?}")]
    DimensionMismatch { mask: (u32, u32), image: (u32, u32) },

    #[error("{oracle} oracle timed out after {after_ms} ms")]
    OracleTimeout { oracle: OracleKind, after_ms: u64 },

    #[error("{oracle} oracle failed")]
    OracleFailure {
        oracle: OracleKind,
        #[source]
        source: anyhow::Error,
    },

    /// 分类器输出与输入批次不一致
    #[error("classifier returned shape {got:?}, expected {expected:?}")]
    PredictionShape { expected: (usize, usize), got: (usize, usize) },

    /// 阻塞任务 panic 或被取消
    #[error("worker for {stage} stopped unexpectedly")]
    WorkerLost { stage: &'static str },

    #[error("no zone identifier for image {image}")]
    ZoneIdentifierMissing { image: String },
}

impl LeafError {
    pub fn oracle_failure(oracle: OracleKind, source: impl Into<anyhow::Error>) -> Self {
        LeafError::OracleFailure { oracle, source: source.into() }
    }

    /// 图片级错误，整张图不参与后续汇总
    pub fn is_image_fatal(&self) -> bool {
        matches!(
            self,
            LeafError::OracleTimeout { .. }
                | LeafError::OracleFailure { .. }
                | LeafError::PredictionShape { .. }
                | LeafError::DimensionMismatch { .. }
                | LeafError::WorkerLost { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LeafError>;
