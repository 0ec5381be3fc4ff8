//! 按视频序列化存储
//!
//! 每个视频一个 `{root}/{video_key}/frames.msgpack`，按键顺序保存为
//! MessagePack 二进制数组。

use super::{read_frame, video_dirs, FrameStore, MetadataReport, StorageError, StorageOptions};
use crate::core::frames::{frame_key, FrameEntry};
use log::{debug, info, warn};
use serde_bytes::ByteBuf;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const BLOB_FILE_NAME: &str = "frames.msgpack";

pub struct BlobStorage {
    root: PathBuf,
}

impl BlobStorage {
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(root)?;
        info!("🗃️ BlobStorage: using {:?}", root);
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn read_video(artifact: &Path) -> Option<Vec<ByteBuf>> {
        let file = match File::open(artifact) {
            Ok(file) => file,
            Err(e) => {
                warn!("⚠️ reading failed for {:?}: {}", artifact, e);
                return None;
            }
        };
        match rmp_serde::from_read(BufReader::new(file)) {
            Ok(frames) => Some(frames),
            Err(e) => {
                warn!("⚠️ reading failed for {:?}: {}", artifact, e);
                None
            }
        }
    }
}

impl FrameStore for BlobStorage {
    fn put(
        &mut self,
        video_key: &str,
        frame_dir: &Path,
        frames: &[FrameEntry],
    ) -> Result<(), StorageError> {
        // 先读完所有帧，读失败时不留下残缺文件
        let data = frames
            .iter()
            .map(|frame| read_frame(frame_dir, frame).map(ByteBuf::from))
            .collect::<Result<Vec<_>, _>>()?;

        let save_dir = self.root.join(video_key);
        fs::create_dir_all(&save_dir)?;

        let mut writer = BufWriter::new(File::create(save_dir.join(BLOB_FILE_NAME))?);
        rmp_serde::encode::write(&mut writer, &data)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        debug!("BlobStorage: wrote {} frames for {}", data.len(), video_key);
        Ok(())
    }

    fn close(self) -> Result<(), StorageError> {
        info!("✅ BlobStorage: closed {:?}", self.root);
        Ok(())
    }

    fn info(path: &Path, _options: &StorageOptions) -> Result<MetadataReport, StorageError> {
        let mut report = MetadataReport::new();
        for dir in video_dirs(path)? {
            let video_key = dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some(frames) = Self::read_video(&dir.join(BLOB_FILE_NAME)) else {
                continue;
            };
            for (ith_frame, frame) in frames.iter().enumerate() {
                report.record(&frame_key(&video_key, ith_frame), frame.as_slice());
            }
        }
        Ok(report)
    }
}
