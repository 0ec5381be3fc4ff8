//! 帧存储后端
//!
//! 所有后端使用同一种键布局 `{video_key}/{ith_frame:08}`，
//! 并且只凭磁盘数据就能重建 [`MetadataReport`]：
//! - `lmdb`: 嵌入式 KV，每个视频一个写事务
//! - `container`: 单个不压缩 ZIP 归档，每帧一项
//! - `blob`: 每个视频目录一个 MessagePack 文件
//! - `file`: 每个视频目录下每帧一个 JPEG 文件

pub mod blob;
pub mod container;
pub mod error;
pub mod file;
pub mod lmdb;
pub mod report;

use crate::core::frames::FrameEntry;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use blob::BlobStorage;
pub use container::ContainerStorage;
pub use error::StorageError;
pub use file::FileStorage;
pub use lmdb::{LmdbStorage, DEFAULT_MAP_SIZE};
pub use report::MetadataReport;

/// 所有后端共有的操作
pub trait FrameStore {
    /// 按 `{video_key}/{i:08}` 提交帧（已按 frame_id 排序）
    fn put(
        &mut self,
        video_key: &str,
        frame_dir: &Path,
        frames: &[FrameEntry],
    ) -> Result<(), StorageError>;

    /// 刷盘并释放句柄
    fn close(self) -> Result<(), StorageError>
    where
        Self: Sized;

    /// 按路径扫描已有数据库，只读
    fn info(path: &Path, options: &StorageOptions) -> Result<MetadataReport, StorageError>
    where
        Self: Sized;
}

/// 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageKind {
    Lmdb,
    Container,
    Blob,
    File,
}

impl StorageKind {
    pub const ALL: [StorageKind; 4] = [
        StorageKind::Lmdb,
        StorageKind::Container,
        StorageKind::Blob,
        StorageKind::File,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StorageKind::Lmdb => "LMDB",
            StorageKind::Container => "CONTAINER",
            StorageKind::Blob => "BLOB",
            StorageKind::File => "FILE",
        }
    }

    pub fn info(&self, path: &Path) -> Result<MetadataReport, StorageError> {
        self.info_with(path, &StorageOptions::default())
    }

    pub fn info_with(
        &self,
        path: &Path,
        options: &StorageOptions,
    ) -> Result<MetadataReport, StorageError> {
        let report = match self {
            StorageKind::Lmdb => LmdbStorage::info(path, options)?,
            StorageKind::Container => ContainerStorage::info(path, options)?,
            StorageKind::Blob => BlobStorage::info(path, options)?,
            StorageKind::File => FileStorage::info(path, options)?,
        };
        if report.is_empty() {
            warn!("📭 No video frames found in {:?}", path);
        }
        Ok(report)
    }

    /// 打印 `path` 的尺寸统计表
    pub fn display_info(&self, path: &Path) -> Result<MetadataReport, StorageError> {
        let report = self.info(path)?;
        println!("{} :", path.display());
        print!("{}", report);
        Ok(report)
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StorageKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LMDB" => Ok(StorageKind::Lmdb),
            "CONTAINER" | "HDF5" | "ZIP" => Ok(StorageKind::Container),
            "BLOB" | "PKL" | "MSGPACK" => Ok(StorageKind::Blob),
            "FILE" => Ok(StorageKind::File),
            _ => Err(StorageError::UnknownKind(s.to_string())),
        }
    }
}

/// 后端参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// LMDB 映射预留的虚拟地址空间
    pub lmdb_map_size: u64,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            lmdb_map_size: DEFAULT_MAP_SIZE,
        }
    }
}

/// 已打开的后端
pub enum Storage {
    Lmdb(LmdbStorage),
    Container(ContainerStorage),
    Blob(BlobStorage),
    File(FileStorage),
}

impl Storage {
    pub fn open(kind: StorageKind, path: &Path) -> Result<Self, StorageError> {
        Self::open_with(kind, path, &StorageOptions::default())
    }

    pub fn open_with(
        kind: StorageKind,
        path: &Path,
        options: &StorageOptions,
    ) -> Result<Self, StorageError> {
        Ok(match kind {
            StorageKind::Lmdb => Storage::Lmdb(LmdbStorage::open(path, options)?),
            StorageKind::Container => Storage::Container(ContainerStorage::open(path)?),
            StorageKind::Blob => Storage::Blob(BlobStorage::open(path)?),
            StorageKind::File => Storage::File(FileStorage::open(path)?),
        })
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            Storage::Lmdb(_) => StorageKind::Lmdb,
            Storage::Container(_) => StorageKind::Container,
            Storage::Blob(_) => StorageKind::Blob,
            Storage::File(_) => StorageKind::File,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Storage::Lmdb(s) => s.path(),
            Storage::Container(s) => s.path(),
            Storage::Blob(s) => s.path(),
            Storage::File(s) => s.path(),
        }
    }

    pub fn put(
        &mut self,
        video_key: &str,
        frame_dir: &Path,
        frames: &[FrameEntry],
    ) -> Result<(), StorageError> {
        match self {
            Storage::Lmdb(s) => s.put(video_key, frame_dir, frames),
            Storage::Container(s) => s.put(video_key, frame_dir, frames),
            Storage::Blob(s) => s.put(video_key, frame_dir, frames),
            Storage::File(s) => s.put(video_key, frame_dir, frames),
        }
    }

    pub fn close(self) -> Result<(), StorageError> {
        match self {
            Storage::Lmdb(s) => s.close(),
            Storage::Container(s) => s.close(),
            Storage::Blob(s) => s.close(),
            Storage::File(s) => s.close(),
        }
    }
}

/// 读取一帧源文件，失败则整个 `put` 中止
pub(crate) fn read_frame(frame_dir: &Path, frame: &FrameEntry) -> Result<Vec<u8>, StorageError> {
    let path = frame_dir.join(&frame.file_name);
    fs::read(&path).map_err(|source| StorageError::SourceRead { path, source })
}

/// 存储根目录下的视频子目录，按名称排序
pub(crate) fn video_dirs(root: &Path) -> Result<Vec<PathBuf>, StorageError> {
    if !root.is_dir() {
        return Err(StorageError::NotFound(root.to_path_buf()));
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}


#[cfg(test)]
mod tests {
    use super::test_support::write_jpeg_frames;
    use super::*;
    use tempfile::tempdir;

    fn db_path(root: &Path, kind: StorageKind) -> PathBuf {
        match kind {
            StorageKind::Container => root.join("frames.zip"),
            _ => root.join("frames_db"),
        }
    }

    #[test]
    fn test_every_backend_round_trips_frame_count() {
        for kind in StorageKind::ALL {
            let src = tempdir().unwrap();
            let out = tempdir().unwrap();
            let path = db_path(out.path(), kind);

            let first = write_jpeg_frames(src.path(), 4, 3, 2);
            let mut storage = Storage::open(kind, &path).unwrap();
            assert_eq!(storage.kind(), kind);
            storage.put("alpha", src.path(), &first).unwrap();
            storage.put("beta", src.path(), &first[..2]).unwrap();
            storage.close().unwrap();

            let report = kind.info(&path).unwrap();
            assert_eq!(report.total_frames(), 6, "{}", kind);
            assert_eq!(report.count(3, 2), 6, "{}", kind);
            assert!(report.sample().is_some(), "{}", kind);
        }
    }

    #[test]
    fn test_info_does_not_mutate_backend() {
        for kind in StorageKind::ALL {
            let src = tempdir().unwrap();
            let out = tempdir().unwrap();
            let path = db_path(out.path(), kind);

            let frames = write_jpeg_frames(src.path(), 3, 2, 2);
            let mut storage = Storage::open(kind, &path).unwrap();
            storage.put("clip", src.path(), &frames).unwrap();
            storage.close().unwrap();

            let first = kind.info(&path).unwrap();
            let second = kind.info(&path).unwrap();
            assert_eq!(first.sizes(), second.sizes(), "{}", kind);
        }
    }

    #[test]
    fn test_missing_source_frame_aborts_put() {
        for kind in StorageKind::ALL {
            let src = tempdir().unwrap();
            let out = tempdir().unwrap();
            let path = db_path(out.path(), kind);

            let mut frames = write_jpeg_frames(src.path(), 2, 2, 2);
            frames.push(FrameEntry::new(3, "00000003.jpg"));

            let mut storage = Storage::open(kind, &path).unwrap();
            let result = storage.put("clip", src.path(), &frames);
            assert!(
                matches!(result, Err(StorageError::SourceRead { .. })),
                "{}",
                kind
            );
            storage.close().unwrap();
        }
    }

    #[test]
    fn test_empty_database_reports_nothing() {
        let out = tempdir().unwrap();
        for kind in StorageKind::ALL {
            let path = db_path(out.path(), kind).with_extension(kind.name().to_lowercase());
            Storage::open(kind, &path).unwrap().close().unwrap();
            let report = kind.info(&path).unwrap();
            assert!(report.is_empty(), "{}", kind);
            assert!(report.sample().is_none(), "{}", kind);
        }
    }

    #[test]
    fn test_display_info_matches_info() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let path = out.path().join("frames_db");

        let frames = write_jpeg_frames(src.path(), 3, 2, 2);
        let mut storage = Storage::open(StorageKind::File, &path).unwrap();
        storage.put("clip", src.path(), &frames).unwrap();
        storage.close().unwrap();

        let shown = StorageKind::File.display_info(&path).unwrap();
        assert_eq!(shown.sizes(), StorageKind::File.info(&path).unwrap().sizes());
        assert_eq!(shown.to_string(), "   Image size (W,H): (2, 2) count: 3\n");
    }

    #[test]
    fn test_info_on_missing_path_fails() {
        let out = tempdir().unwrap();
        let missing = out.path().join("nothing_here");
        for kind in StorageKind::ALL {
            assert!(kind.info(&missing).is_err(), "{}", kind);
        }
    }

    #[test]
    fn test_storage_kind_names() {
        assert_eq!("lmdb".parse::<StorageKind>().unwrap(), StorageKind::Lmdb);
        assert_eq!("HDF5".parse::<StorageKind>().unwrap(), StorageKind::Container);
        assert_eq!("PKL".parse::<StorageKind>().unwrap(), StorageKind::Blob);
        assert_eq!("file".parse::<StorageKind>().unwrap(), StorageKind::File);
        assert!(matches!(
            "sqlite".parse::<StorageKind>(),
            Err(StorageError::UnknownKind(_))
        ));
        for kind in StorageKind::ALL {
            assert_eq!(kind.name().parse::<StorageKind>().unwrap(), kind);
        }
    }
}
