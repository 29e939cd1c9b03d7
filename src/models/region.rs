use anyhow::{ensure, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// 原图像素坐标下的外接框，(x, y) 为左上角
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct BBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        BBox { x, y, w, h }
    }

    pub fn to_xywh(&self) -> [u32; 4] {
        [self.x, self.y, self.w, self.h]
    }

    pub fn from_xywh(xywh: &[u32]) -> Option<Self> {
        match xywh {
            [x, y, w, h] => Some(BBox::new(*x, *y, *w, *h)),
            _ => None,
        }
    }
}

/// 与原图同尺寸的布尔掩码，按行存储
/// 构建后不可变，true 像素数在构建时算好
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
    area: u64,
}

impl RegionMask {
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Result<Self> {
        ensure!(
            data.len() == (width as usize) * (height as usize),
            "mask data has {} cells, expected {}x{}",
            data.len(),
            width,
            height
        );
        let area = data.iter().filter(|&&b| b).count() as u64;
        Ok(RegionMask { width, height, data, area })
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        let area = data.iter().filter(|&&b| b).count() as u64;
        RegionMask { width, height, data, area }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// true 像素数
    pub fn area(&self) -> u64 {
        self.area
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[(y * self.width + x) as usize]
    }

    /// 所有 true 像素的外接框，两端包含
    pub fn bounding_box(&self) -> Option<BBox> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut found = false;
        for y in 0..self.height {
            let row = &self.data[(y * self.width) as usize..((y + 1) * self.width) as usize];
            for (x, &set) in row.iter().enumerate() {
                if !set {
                    continue;
                }
                let x = x as u32;
                found = true;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
        if !found {
            return None;
        }
        Some(BBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }
}

/// 分割模型给出的一个区域及其元数据
#[derive(Debug, Clone, PartialEq)]
pub struct MaskRecord {
    pub mask: RegionMask,
    /// 模型给出的面积，用于计算单张图的面积阈值
    pub area: u64,
    /// 模型给出的 XYWH 框，写入 bbox_list
    pub bbox: BBox,
    pub predicted_iou: Option<f32>,
    pub stability_score: Option<f32>,
}

impl MaskRecord {
    /// 元数据直接由掩码计算
    pub fn from_mask(mask: RegionMask) -> Self {
        let area = mask.area();
        let bbox = mask.bounding_box().unwrap_or_default();
        MaskRecord { mask, area, bbox, predicted_iou: None, stability_score: None }
    }
}

/// 保留区域的掩码裁剪图
#[derive(Debug, Clone)]
pub struct LeafCrop {
    pub pixels: RgbImage,
    pub bbox: BBox,
}

/// 单个区域的分类器输入
#[derive(Debug, Clone)]
pub struct Canvas {
    pub pixels: RgbImage,
}

impl Canvas {
    pub fn size(&self) -> u32 {
        self.pixels.width()
    }
}
