use super::error::FrameError;
use super::frame::{load_image, FrameEntry};
use crate::core::fingerprint::{Fingerprint, HashAlgorithm};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 最大哈希边长
pub const MAX_HASH_SIZE: u32 = 1024;

/// 去重参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// 相似度阈值 [0, 1)，0 表示关闭去重
    pub threshold: f64,
    /// 图像缩放到 hash_size × hash_size 后计算哈希
    pub hash_size: u32,
    pub algorithm: HashAlgorithm,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            hash_size: 8,
            algorithm: HashAlgorithm::AverageHash,
        }
    }
}

impl DedupConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        if !(0.0..1.0).contains(&self.threshold) {
            return Err(FrameError::InvalidConfig(format!(
                "duplicate threshold must be in [0, 1), got {}",
                self.threshold
            )));
        }
        if self.hash_size == 0 || self.hash_size > MAX_HASH_SIZE {
            return Err(FrameError::InvalidConfig(format!(
                "hash size must be in 1..={}, got {}",
                MAX_HASH_SIZE, self.hash_size
            )));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold > 0.0
    }

    /// 汉明距离不超过该值即视为重复
    pub fn diff_limit(&self) -> u32 {
        let bits = (self.hash_size as f64).powi(2);
        ((1.0 - self.threshold) * bits).round_ties_even() as u32
    }
}

/// 单个视频的去重结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub retained: Vec<FrameEntry>,
    pub total_files: usize,
    pub duplicates: usize,
}

/// 近重复帧过滤器
///
/// 每个候选帧都与此前保留的全部指纹比较（不只是最近一帧），
/// 被判为重复的帧不会加入指纹列表。指纹状态只在单个视频内有效。
pub struct FrameDeduplicator {
    config: DedupConfig,
    diff_limit: u32,
    accepted: Vec<Fingerprint>,
}

impl FrameDeduplicator {
    pub fn new(config: DedupConfig) -> Result<Self, FrameError> {
        config.validate()?;
        Ok(Self {
            config,
            diff_limit: config.diff_limit(),
            accepted: Vec::new(),
        })
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// 判定一个指纹是否重复，不重复则记录下来
    pub fn check_duplicate(&mut self, fingerprint: Fingerprint) -> bool {
        if self
            .accepted
            .iter()
            .any(|prev| fingerprint.distance(prev) <= self.diff_limit)
        {
            return true;
        }
        self.accepted.push(fingerprint);
        false
    }

    /// 过滤一个视频的帧，`frames` 须已按 frame_id 升序排列
    pub fn filter(
        &mut self,
        frame_dir: &Path,
        frames: Vec<FrameEntry>,
    ) -> Result<FilterOutcome, FrameError> {
        self.clear();
        let total_files = frames.len();

        if !self.config.is_enabled() {
            return Ok(FilterOutcome {
                retained: frames,
                total_files,
                duplicates: 0,
            });
        }

        // 指纹可以并行计算，判定必须按顺序进行
        let config = self.config;
        let fingerprints = frames
            .par_iter()
            .map(|f| {
                let image = load_image(&frame_dir.join(&f.file_name))?;
                Ok(config.algorithm.fingerprint(&image, config.hash_size))
            })
            .collect::<Result<Vec<_>, FrameError>>()?;

        let mut retained = Vec::with_capacity(frames.len());
        let mut duplicates = 0;
        for (frame, fingerprint) in frames.into_iter().zip(fingerprints) {
            if self.check_duplicate(fingerprint) {
                debug!("Frame {} is a duplicate, dropped", frame.frame_id);
                duplicates += 1;
            } else {
                retained.push(frame);
            }
        }

        Ok(FilterOutcome {
            retained,
            total_files,
            duplicates,
        })
    }

    pub fn clear(&mut self) {
        self.accepted.clear();
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}
