//! LMDB 存储
//!
//! 一个视频的所有帧在同一个写事务内提交，要么全部写入，要么一帧都不写。

use super::{read_frame, FrameStore, MetadataReport, StorageError, StorageOptions};
use crate::core::frames::{frame_key, FrameEntry};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvFlags, EnvOpenOptions};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// 1 TiB，只占虚拟地址空间，文件随数据增长
pub const DEFAULT_MAP_SIZE: u64 = 1 << 40;

pub struct LmdbStorage {
    path: PathBuf,
    env: Option<Env>,
    db: Database<Str, Bytes>,
}

fn map_size(options: &StorageOptions) -> Result<usize, StorageError> {
    usize::try_from(options.lmdb_map_size).map_err(|_| StorageError::MapSize(options.lmdb_map_size))
}

impl LmdbStorage {
    pub fn open(path: &Path, options: &StorageOptions) -> Result<Self, StorageError> {
        let map_size = map_size(options)?;
        fs::create_dir_all(path)?;

        // SAFETY: 每个路径只打开一次，环境归本句柄所有
        let env = unsafe { EnvOpenOptions::new().map_size(map_size).open(path)? };
        let mut wtxn = env.write_txn()?;
        let db: Database<Str, Bytes> = env.create_database(&mut wtxn, None)?;
        wtxn.commit()?;

        info!("🗄️ LmdbStorage: opened {:?} (map size {} bytes)", path, map_size);
        Ok(Self {
            path: path.to_path_buf(),
            env: Some(env),
            db,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn finish(&mut self) -> Result<(), StorageError> {
        if let Some(env) = self.env.take() {
            let synced = env.force_sync();
            env.prepare_for_closing().wait();
            synced?;
            debug!("LmdbStorage: synced and closed {:?}", self.path);
        }
        Ok(())
    }
}

impl FrameStore for LmdbStorage {
    fn put(
        &mut self,
        video_key: &str,
        frame_dir: &Path,
        frames: &[FrameEntry],
    ) -> Result<(), StorageError> {
        let env = self.env.as_ref().ok_or(StorageError::Closed)?;
        // 出错时事务随 drop 回滚
        let mut wtxn = env.write_txn()?;
        for (ith_frame, frame) in frames.iter().enumerate() {
            let data = read_frame(frame_dir, frame)?;
            let key = frame_key(video_key, ith_frame);
            self.db.put(&mut wtxn, key.as_str(), data.as_slice())?;
        }
        wtxn.commit()?;
        debug!("LmdbStorage: committed {} frames for {}", frames.len(), video_key);
        Ok(())
    }

    fn close(mut self) -> Result<(), StorageError> {
        self.finish()?;
        info!("✅ LmdbStorage: closed {:?}", self.path);
        Ok(())
    }

    fn info(path: &Path, options: &StorageOptions) -> Result<MetadataReport, StorageError> {
        if !path.is_dir() {
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        let map_size = map_size(options)?;

        // SAFETY: 只读环境，返回前关闭
        let env = unsafe {
            let mut env_options = EnvOpenOptions::new();
            env_options.map_size(map_size).flags(EnvFlags::READ_ONLY);
            env_options.open(path)?
        };

        let mut report = MetadataReport::new();
        {
            let rtxn = env.read_txn()?;
            let db: Option<Database<Str, Bytes>> = env.open_database(&rtxn, None)?;
            if let Some(db) = db {
                for entry in db.iter(&rtxn)? {
                    let (key, bytes) = entry?;
                    report.record(key, bytes);
                }
            }
        }
        env.prepare_for_closing().wait();

        Ok(report)
    }
}

impl Drop for LmdbStorage {
    fn drop(&mut self) {
        if self.env.is_some() {
            warn!("⚠️ LmdbStorage dropped without close, syncing {:?}", self.path);
            if let Err(e) = self.finish() {
                error!("❌ LmdbStorage: final sync failed: {}", e);
            }
        }
    }
}
