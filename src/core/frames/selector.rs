use super::error::FrameError;
use super::frame::FrameEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 采样模式，三者互斥
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SamplingMode {
    /// 仅保留 (frame_id - 1) % skip == 0 的帧
    Stride { skip: u32 },
    /// 在 [min, max] 上线性均匀取 count 帧
    Uniform { count: u32 },
    /// 解码阶段已按时间间隔抽帧，这里不再过滤
    Interval { seconds: f64 },
}

impl Default for SamplingMode {
    fn default() -> Self {
        SamplingMode::Stride { skip: 1 }
    }
}

impl SamplingMode {
    pub fn validate(&self) -> Result<(), FrameError> {
        match *self {
            SamplingMode::Stride { skip } if skip == 0 => {
                Err(FrameError::InvalidConfig("skip must be at least 1".into()))
            }
            SamplingMode::Uniform { count } if count == 0 => Err(FrameError::InvalidConfig(
                "uniform frame count must be positive".into(),
            )),
            SamplingMode::Interval { seconds } if !(seconds > 0.0) => Err(
                FrameError::InvalidConfig(format!("interval must be positive, got {}", seconds)),
            ),
            _ => Ok(()),
        }
    }
}

/// 帧选择器
#[derive(Debug, Clone)]
pub struct FrameSelector {
    mode: SamplingMode,
}

impl FrameSelector {
    pub fn new(mode: SamplingMode) -> Result<Self, FrameError> {
        mode.validate()?;
        Ok(Self { mode })
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// 返回保留的帧，保持输入顺序（调用方负责按 frame_id 排序）
    pub fn select(&self, frames: Vec<FrameEntry>) -> Vec<FrameEntry> {
        match self.mode {
            SamplingMode::Stride { skip } => frames
                .into_iter()
                .filter(|f| f.frame_id.checked_sub(1).is_some_and(|n| n % skip == 0))
                .collect(),
            SamplingMode::Uniform { count } => {
                let (Some(min), Some(max)) = (
                    frames.iter().map(|f| f.frame_id).min(),
                    frames.iter().map(|f| f.frame_id).max(),
                ) else {
                    return frames;
                };
                let ids = uniform_sample_ids(min, max, count);
                frames
                    .into_iter()
                    .filter(|f| ids.contains(&f.frame_id))
                    .collect()
            }
            SamplingMode::Interval { .. } => frames,
        }
    }
}

/// 均匀取样的帧序号，四舍五入后重复的序号会合并
pub fn uniform_sample_ids(min: u32, max: u32, count: u32) -> BTreeSet<u32> {
    if count <= 1 || max <= min {
        return BTreeSet::from([min]);
    }
    // 步长不超过 1 时每个序号都会被取到
    if count - 1 >= max - min {
        return (min..=max).collect();
    }
    let step = (max - min) as f64 / (count - 1) as f64;
    (0..count)
        .map(|i| (min as f64 + i as f64 * step).round() as u32)
        .collect()
}

/// 按时间间隔抽帧时传给解码器的帧步长；帧率为 0 时该视频应跳过
pub fn interval_step(seconds: f64, frame_rate: f64) -> Option<u32> {
    if !(seconds > 0.0) || !(frame_rate > 0.0) {
        return None;
    }
    let step = (seconds * frame_rate).round();
    if step < 1.0 {
        None
    } else {
        Some(step as u32)
    }
}
