pub mod api;
pub mod core;

pub use api::pipeline::{IngestError, IngestionPipeline, IngestionStats, PipelineConfig, VideoReport};
pub use api::video::{discover_videos, video_key, VIDEO_EXTENSIONS};
pub use crate::core::storage::{MetadataReport, Storage, StorageError, StorageKind, StorageOptions};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("vid2frame"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // 重复初始化直接忽略
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    }
}
