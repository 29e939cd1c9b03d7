//! 各处理阶段之间传递的数据结构

pub mod region;
pub mod verdict;
pub mod field;

/// 分类器画布的固定尺寸
pub mod canvas_geometry {
    /// 黑色画布边长
    pub const CANVAS_SIZE: u32 = 224;
    /// 叶片裁剪图缩放后的边长
    pub const CROP_SIZE: u32 = 150;
    /// 裁剪图在画布中的左上角偏移
    pub const CANVAS_OFFSET: u32 = 37;
    pub const CHANNELS: usize = 3;
}
