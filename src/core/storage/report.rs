use image::DynamicImage;
use log::warn;
use std::collections::BTreeMap;
use std::fmt;

/// 数据库中可解码帧的尺寸统计，附带最后解码的一张图
#[derive(Debug, Clone, Default)]
pub struct MetadataReport {
    sizes: BTreeMap<(u32, u32), usize>,
    sample: Option<DynamicImage>,
}

impl MetadataReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解码一帧并计入尺寸，解码失败时按 `key` 记警告并跳过
    pub fn record(&mut self, key: &str, bytes: &[u8]) -> bool {
        match image::load_from_memory(bytes) {
            Ok(img) => {
                *self.sizes.entry((img.width(), img.height())).or_insert(0) += 1;
                self.sample = Some(img);
                true
            }
            Err(e) => {
                warn!("⚠️ reading failed for {}: {}", key, e);
                false
            }
        }
    }

    pub fn sizes(&self) -> &BTreeMap<(u32, u32), usize> {
        &self.sizes
    }

    pub fn count(&self, width: u32, height: u32) -> usize {
        self.sizes.get(&(width, height)).copied().unwrap_or(0)
    }

    pub fn total_frames(&self) -> usize {
        self.sizes.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn sample(&self) -> Option<&DynamicImage> {
        self.sample.as_ref()
    }

    pub fn into_sample(self) -> Option<DynamicImage> {
        self.sample
    }
}

impl fmt::Display for MetadataReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ((width, height), count) in &self.sizes {
            writeln!(f, "   Image size (W,H): ({}, {}) count: {}", width, height, count)?;
        }
        Ok(())
    }
}
