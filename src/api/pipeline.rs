//! 抽帧入库流水线
//!
//! ```no_run
//! use vid2frame::{IngestionPipeline, PipelineConfig, Storage, StorageKind};
//! use std::path::Path;
//!
//! let storage = Storage::open(StorageKind::Lmdb, Path::new("frames_db"))?;
//! let mut pipeline = IngestionPipeline::new(storage, PipelineConfig::with_dedup(0.9))?;
//! pipeline.ingest_video("cooking_01", Path::new("/tmp/cooking_01"))?;
//! let report = pipeline.finish()?;
//! print!("{}", report);
//! # Ok::<(), vid2frame::IngestError>(())
//! ```

use super::video::video_key;
use crate::core::frames::{
    scan_frame_dir, DedupConfig, FrameDeduplicator, FrameError, FrameSelector, SamplingMode,
};
use crate::core::storage::{MetadataReport, Storage, StorageError, StorageKind, StorageOptions};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Frame source failed for {video:?}: {source}")]
    Source {
        video: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid video path: {0:?}")]
    InvalidVideo(PathBuf),

    #[error("Pipeline already finished")]
    Finished,
}

/// 流水线配置
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sampling: SamplingMode,
    pub dedup: DedupConfig,
    pub storage: StorageOptions,
}

impl PipelineConfig {
    /// 保留所有帧，只按相似度去重
    pub fn with_dedup(threshold: f64) -> Self {
        Self {
            dedup: DedupConfig::with_threshold(threshold),
            ..Default::default()
        }
    }

    /// 在 [1, max] 上均匀取 count 帧，不去重
    pub fn uniform(count: u32) -> Self {
        Self {
            sampling: SamplingMode::Uniform { count },
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, IngestError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        self.sampling.validate()?;
        self.dedup.validate()
    }
}

/// 单个视频的入库结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoReport {
    pub video_key: String,
    pub total_files: usize,
    pub duplicates: usize,
    pub stored: usize,
}

impl VideoReport {
    pub fn duplicate_percent(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        self.duplicates as f64 * 100.0 / self.total_files as f64
    }
}

impl fmt::Display for VideoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} duplicates removed ({:.1}% of {})",
            self.video_key,
            self.duplicates,
            self.duplicate_percent(),
            self.total_files
        )
    }
}

/// 累计统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    pub videos: usize,
    pub processed_frames: usize,
    pub duplicates: usize,
    pub stored_frames: usize,
}

/// 抽帧入库流水线：扫描 → 选帧 → 排序 → 去重 → 写入
pub struct IngestionPipeline {
    storage: Option<Storage>,
    options: StorageOptions,
    selector: FrameSelector,
    deduplicator: FrameDeduplicator,
    done_videos: HashSet<String>,
    stats: IngestionStats,
}

impl IngestionPipeline {
    pub fn new(storage: Storage, config: PipelineConfig) -> Result<Self, IngestError> {
        config.validate()?;
        let selector = FrameSelector::new(config.sampling)?;
        let deduplicator = FrameDeduplicator::new(config.dedup)?;
        info!(
            "🎬 IngestionPipeline: created ({} at {:?}, {:?}, threshold {})",
            storage.kind(),
            storage.path(),
            config.sampling,
            config.dedup.threshold
        );
        Ok(Self {
            storage: Some(storage),
            options: config.storage,
            selector,
            deduplicator,
            done_videos: HashSet::new(),
            stats: IngestionStats::default(),
        })
    }

    /// 按配置打开存储再创建流水线
    pub fn create(kind: StorageKind, path: &Path, config: PipelineConfig) -> Result<Self, IngestError> {
        let storage = Storage::open_with(kind, path, &config.storage)?;
        Self::new(storage, config)
    }

    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    pub fn stats(&self) -> IngestionStats {
        self.stats
    }

    /// 处理一个视频已解码好的帧目录。
    ///
    /// 同一个 `video_key` 在本次运行中只入库一次，重复出现时返回 `Ok(None)`。
    pub fn ingest_video(
        &mut self,
        video_key: &str,
        frame_dir: &Path,
    ) -> Result<Option<VideoReport>, IngestError> {
        if self.done_videos.contains(video_key) {
            warn!("⚠️ video {} seen before, ignored", video_key);
            return Ok(None);
        }
        let storage = self.storage.as_mut().ok_or(IngestError::Finished)?;

        let frames = scan_frame_dir(frame_dir)?;
        let mut selected = self.selector.select(frames);
        selected.sort_by_key(|f| f.frame_id);
        debug!("{}: {} frames selected", video_key, selected.len());

        let outcome = self.deduplicator.filter(frame_dir, selected)?;
        storage.put(video_key, frame_dir, &outcome.retained)?;
        self.done_videos.insert(video_key.to_string());

        let report = VideoReport {
            video_key: video_key.to_string(),
            total_files: outcome.total_files,
            duplicates: outcome.duplicates,
            stored: outcome.retained.len(),
        };
        self.stats.videos += 1;
        self.stats.processed_frames += report.total_files;
        self.stats.duplicates += report.duplicates;
        self.stats.stored_frames += report.stored;

        if self.deduplicator.config().is_enabled() {
            info!("🧹 {}", report);
        } else {
            debug!("{}: stored {} frames", video_key, report.stored);
        }
        Ok(Some(report))
    }

    /// 依次处理一批视频，`decode` 负责把视频解码成帧目录，返回 `None` 表示跳过该视频
    pub fn ingest_videos<F>(
        &mut self,
        videos: &[PathBuf],
        mut decode: F,
    ) -> Result<Vec<VideoReport>, IngestError>
    where
        F: FnMut(&Path) -> Result<Option<PathBuf>, IngestError>,
    {
        let mut reports = Vec::new();
        for video in videos {
            let key = video_key(video).ok_or_else(|| IngestError::InvalidVideo(video.clone()))?;
            if self.done_videos.contains(&key) {
                warn!("⚠️ video {} seen before, ignored", key);
                continue;
            }
            let Some(frame_dir) = decode(video)? else {
                warn!("⚠️ no frames decoded for {:?}, skipped", video);
                continue;
            };
            if let Some(report) = self.ingest_video(&key, &frame_dir)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// 关闭存储并重新扫描，返回入库结果的尺寸统计
    pub fn finish(mut self) -> Result<MetadataReport, IngestError> {
        let storage = self.storage.take().ok_or(IngestError::Finished)?;
        let kind = storage.kind();
        let path = storage.path().to_path_buf();
        storage.close()?;

        info!(
            "📊 IngestionPipeline: {} videos, {} of {} frames stored",
            self.stats.videos, self.stats.stored_frames, self.stats.processed_frames
        );
        Ok(kind.info_with(&path, &self.options)?)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        if let Some(storage) = self.storage.take() {
            warn!("⚠️ IngestionPipeline dropped without finish, closing storage");
            if let Err(e) = storage.close() {
                error!("❌ IngestionPipeline: close failed: {}", e);
            }
        }
        info!("🗑️ IngestionPipeline: released");
    }
}
