//! 视频文件发现

use super::pipeline::IngestError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 参与处理的视频扩展名
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "flv", "mkv", "webm", "mov"];

/// 视频的存储键：文件名去掉扩展名
pub fn video_key(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|key| !key.is_empty())
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
}

/// 单个文件原样返回；目录则列出其中的视频，同名（同 stem）只保留第一个
pub fn discover_videos(path: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(IngestError::InvalidVideo(path.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(path).map_err(|source| IngestError::Source {
        video: path.to_path_buf(),
        source,
    })? {
        let entry = entry.map_err(|source| IngestError::Source {
            video: path.to_path_buf(),
            source,
        })?;
        let file = entry.path();
        if file.is_file() && is_video_file(&file) {
            candidates.push(file);
        }
    }
    candidates.sort();

    let mut seen = HashSet::new();
    Ok(candidates
        .into_iter()
        .filter(|file| video_key(file).is_some_and(|key| seen.insert(key)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_video_key_is_file_stem() {
        assert_eq!(video_key(Path::new("/data/cooking_01.mp4")).as_deref(), Some("cooking_01"));
        assert_eq!(video_key(Path::new("/data/a.b.mkv")).as_deref(), Some("a.b"));
    }

    #[test]
    fn test_discover_filters_and_dedups_by_stem() {
        let dir = tempdir().unwrap();
        for name in ["b.mp4", "a.mkv", "a.webm", "notes.txt", "c.MOV"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("d.mp4")).unwrap();

        let videos = discover_videos(dir.path()).unwrap();
        let names: Vec<String> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mkv", "b.mp4", "c.MOV"]);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("clip.avi");
        fs::write(&file, b"").unwrap();
        assert_eq!(discover_videos(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_discover_missing_path() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            discover_videos(&dir.path().join("missing")),
            Err(IngestError::InvalidVideo(_))
        ));
    }
}
