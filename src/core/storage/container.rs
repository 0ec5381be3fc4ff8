//! 层级容器存储
//!
//! 单个不压缩的 ZIP 归档：每个视频一个目录项，每帧一个原始数据项。
//! 已存在的归档不会被覆盖，`open` 直接失败。

use super::{read_frame, FrameStore, MetadataReport, StorageError, StorageOptions};
use crate::core::frames::{frame_key, FrameEntry};
use log::{debug, error, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub struct ContainerStorage {
    path: PathBuf,
    writer: Option<ZipWriter<File>>,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

impl ContainerStorage {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_path_buf()),
                _ => StorageError::Io(e),
            })?;

        info!("📦 ContainerStorage: created {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(ZipWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn finish(&mut self) -> Result<(), StorageError> {
        if let Some(writer) = self.writer.take() {
            let file = writer.finish()?;
            file.sync_all()?;
            debug!("ContainerStorage: finalized {:?}", self.path);
        }
        Ok(())
    }
}

impl FrameStore for ContainerStorage {
    fn put(
        &mut self,
        video_key: &str,
        frame_dir: &Path,
        frames: &[FrameEntry],
    ) -> Result<(), StorageError> {
        let writer = self.writer.as_mut().ok_or(StorageError::Closed)?;
        writer.add_directory(format!("{}/", video_key), entry_options())?;
        for (ith_frame, frame) in frames.iter().enumerate() {
            let data = read_frame(frame_dir, frame)?;
            writer.start_file(frame_key(video_key, ith_frame), entry_options())?;
            writer.write_all(&data)?;
        }
        debug!("ContainerStorage: wrote {} frames for {}", frames.len(), video_key);
        Ok(())
    }

    fn close(mut self) -> Result<(), StorageError> {
        self.finish()?;
        info!("✅ ContainerStorage: closed {:?}", self.path);
        Ok(())
    }

    fn info(path: &Path, _options: &StorageOptions) -> Result<MetadataReport, StorageError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_path_buf()),
            _ => StorageError::Io(e),
        })?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let mut report = MetadataReport::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let key = entry.name().to_string();
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            report.record(&key, &bytes);
        }
        Ok(report)
    }
}

impl Drop for ContainerStorage {
    fn drop(&mut self) {
        if self.writer.is_some() {
            warn!("⚠️ ContainerStorage dropped without close, finalizing {:?}", self.path);
            if let Err(e) = self.finish() {
                error!("❌ ContainerStorage: finalize failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::write_jpeg_frames;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_open_fails_with_already_exists() {
        let out = tempdir().unwrap();
        let path = out.path().join("frames.zip");

        let first = ContainerStorage::open(&path).unwrap();
        assert!(matches!(
            ContainerStorage::open(&path),
            Err(StorageError::AlreadyExists(_))
        ));
        first.close().unwrap();

        assert!(matches!(
            ContainerStorage::open(&path),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_entries_grouped_by_video() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let path = out.path().join("frames.zip");

        let frames = write_jpeg_frames(src.path(), 2, 2, 2);
        let mut storage = ContainerStorage::open(&path).unwrap();
        storage.put("a", src.path(), &frames).unwrap();
        storage.put("b", src.path(), &frames[..1]).unwrap();
        storage.close().unwrap();

        let archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for name in ["a/", "a/00000000", "a/00000001", "b/", "b/00000000"] {
            assert!(names.contains(&name), "missing {}", name);
        }
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_stored_bytes_are_verbatim() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let path = out.path().join("frames.zip");

        let frames = write_jpeg_frames(src.path(), 1, 2, 2);
        let mut storage = ContainerStorage::open(&path).unwrap();
        storage.put("clip", src.path(), &frames).unwrap();
        storage.close().unwrap();

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut stored = Vec::new();
        archive
            .by_name("clip/00000000")
            .unwrap()
            .read_to_end(&mut stored)
            .unwrap();
        assert_eq!(stored, std::fs::read(src.path().join("00000001.jpg")).unwrap());
    }
}
