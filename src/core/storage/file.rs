//! 普通文件存储：`{root}/{video_key}/{ith_frame:08}.jpg`，原样拷贝字节

use super::{read_frame, FrameStore, MetadataReport, StorageError, StorageOptions};
use crate::core::frames::{frame_file_name, FrameEntry};
use glob::{glob, Pattern};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(root)?;
        info!("🗂️ FileStorage: using {:?}", root);
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl FrameStore for FileStorage {
    fn put(
        &mut self,
        video_key: &str,
        frame_dir: &Path,
        frames: &[FrameEntry],
    ) -> Result<(), StorageError> {
        let save_dir = self.root.join(video_key);
        fs::create_dir_all(&save_dir)?;
        for (ith_frame, frame) in frames.iter().enumerate() {
            let data = read_frame(frame_dir, frame)?;
            fs::write(save_dir.join(frame_file_name(ith_frame)), data)?;
        }
        debug!("FileStorage: copied {} frames for {}", frames.len(), video_key);
        Ok(())
    }

    fn close(self) -> Result<(), StorageError> {
        info!("✅ FileStorage: closed {:?}", self.root);
        Ok(())
    }

    fn info(path: &Path, _options: &StorageOptions) -> Result<MetadataReport, StorageError> {
        if !path.is_dir() {
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        let pattern = format!("{}/**/*.jpg", Pattern::escape(&path.to_string_lossy()));

        let mut report = MetadataReport::new();
        for entry in glob(&pattern)? {
            let image_path = match entry {
                Ok(image_path) => image_path,
                Err(e) => {
                    warn!("⚠️ reading failed for {:?}: {}", e.path(), e.error());
                    continue;
                }
            };
            let key = image_path.strip_prefix(path).unwrap_or(&image_path).display().to_string();
            match fs::read(&image_path) {
                Ok(bytes) => {
                    report.record(&key, &bytes);
                }
                Err(e) => warn!("⚠️ reading failed for {}: {}", key, e),
            }
        }
        Ok(report)
    }
}
