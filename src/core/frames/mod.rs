//! 帧选择与去重
//!
//! 1. 扫描解码器输出目录（`%08d.<ext>`，一帧一个文件）
//! 2. 按采样模式（步长 / 均匀 / 时间间隔）选帧
//! 3. 按 frame_id 排序后用感知哈希去掉近重复帧

pub mod deduplicator;
pub mod error;
pub mod frame;
pub mod selector;

pub use deduplicator::{DedupConfig, FilterOutcome, FrameDeduplicator, MAX_HASH_SIZE};
pub use error::FrameError;
pub use frame::{frame_file_name, frame_key, load_image, parse_frame_id, scan_frame_dir, FrameEntry};
pub use selector::{interval_step, uniform_sample_ids, FrameSelector, SamplingMode};
