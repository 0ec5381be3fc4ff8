use super::error::FrameError;
use image::DynamicImage;
use log::debug;
use std::fs;
use std::path::Path;

/// 解码器输出目录中的一帧（文件名按解码顺序编号）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameEntry {
    /// 从 1 开始的解码序号
    pub frame_id: u32,
    pub file_name: String,
}

impl FrameEntry {
    pub fn new(frame_id: u32, file_name: impl Into<String>) -> Self {
        Self {
            frame_id,
            file_name: file_name.into(),
        }
    }
}

/// 与后端无关的帧地址：`{video_key}/{ith_frame:08}`
pub fn frame_key(video_key: &str, ith_frame: usize) -> String {
    format!("{}/{:08}", video_key, ith_frame)
}

/// 文件后端中单帧的文件名
pub fn frame_file_name(ith_frame: usize) -> String {
    format!("{:08}.jpg", ith_frame)
}

/// 从文件名解析帧序号，解码器可能用空格补齐宽度
pub fn parse_frame_id(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|&id| id > 0)
}

/// 扫描帧目录，保持目录枚举顺序
pub fn scan_frame_dir(dir: &Path) -> Result<Vec<FrameEntry>, FrameError> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match parse_frame_id(&path) {
            Some(frame_id) => frames.push(FrameEntry::new(
                frame_id,
                entry.file_name().to_string_lossy().into_owned(),
            )),
            None => debug!("Skipping non-frame file {:?}", path),
        }
    }
    Ok(frames)
}

/// 按内容猜测格式解码，不依赖扩展名
pub fn load_image(path: &Path) -> Result<DynamicImage, FrameError> {
    image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|source| FrameError::Decode {
            path: path.to_path_buf(),
            source,
        })
}
