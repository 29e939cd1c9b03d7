//! 叶片候选提取、分类汇总和标注

pub mod annotate;
pub mod canvas;
pub mod engine;
pub mod leaf_crop;
pub mod mask_filter;
pub mod oracle;
pub mod prediction;
pub mod zone;

#[cfg(test)]
pub(crate) mod stubs;
