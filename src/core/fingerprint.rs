//! 感知哈希指纹 - 仅用于近重复帧检测
//!
//! 所有算法都在灰度图上计算，输出 `hash_size * hash_size` 位。

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use rustdct::DctPlanner;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 指纹算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// 均值哈希：缩放到 s×s，像素大于均值记 1
    #[default]
    #[serde(rename = "average_hash")]
    AverageHash,
    /// DCT 感知哈希：取低频 s×s 块与中位数比较
    #[serde(rename = "phash")]
    PHash,
    /// 水平梯度哈希
    #[serde(rename = "dhash")]
    DHash,
    /// 垂直梯度哈希
    #[serde(rename = "dhash_vertical")]
    DHashVertical,
    /// Haar 小波哈希：取低频 LL 子带与中位数比较
    #[serde(rename = "whash")]
    WHash,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::AverageHash => "average_hash",
            HashAlgorithm::PHash => "phash",
            HashAlgorithm::DHash => "dhash",
            HashAlgorithm::DHashVertical => "dhash_vertical",
            HashAlgorithm::WHash => "whash",
        }
    }

    /// 计算图像指纹
    pub fn fingerprint(&self, image: &DynamicImage, hash_size: u32) -> Fingerprint {
        let gray = image.to_luma8();
        match self {
            HashAlgorithm::AverageHash => average_hash(&gray, hash_size),
            HashAlgorithm::PHash => phash(&gray, hash_size),
            HashAlgorithm::DHash => dhash(&gray, hash_size),
            HashAlgorithm::DHashVertical => dhash_vertical(&gray, hash_size),
            HashAlgorithm::WHash => whash(&gray, hash_size),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "average_hash" => Ok(HashAlgorithm::AverageHash),
            "phash" => Ok(HashAlgorithm::PHash),
            "dhash" => Ok(HashAlgorithm::DHash),
            "dhash_vertical" => Ok(HashAlgorithm::DHashVertical),
            "whash" => Ok(HashAlgorithm::WHash),
            other => Err(format!("unknown hash algorithm: {}", other)),
        }
    }
}

/// 定长位指纹，按 u64 打包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    words: Vec<u64>,
    len: usize,
}

impl Fingerprint {
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut words = Vec::new();
        let mut len = 0;
        for bit in bits {
            if len % 64 == 0 {
                words.push(0u64);
            }
            if bit {
                words[len / 64] |= 1 << (len % 64);
            }
            len += 1;
        }
        Self { words, len }
    }

    /// 位数
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// 汉明距离，两个指纹必须来自同一 hash_size
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        debug_assert_eq!(self.len, other.len, "fingerprint size mismatch");
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(&a, &b)| hamming_distance(a, b))
            .sum()
    }
}

pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

fn average_hash(gray: &GrayImage, hash_size: u32) -> Fingerprint {
    let small = imageops::resize(gray, hash_size, hash_size, FilterType::Lanczos3);
    let pixels: Vec<f64> = small.pixels().map(|p| p.0[0] as f64).collect();
    let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
    Fingerprint::from_bits(pixels.iter().map(|&v| v > mean))
}

fn dhash(gray: &GrayImage, hash_size: u32) -> Fingerprint {
    let small = imageops::resize(gray, hash_size + 1, hash_size, FilterType::Lanczos3);
    let small = &small;
    let bits = (0..hash_size).flat_map(move |y| {
        (0..hash_size).map(move |x| small.get_pixel(x + 1, y).0[0] > small.get_pixel(x, y).0[0])
    });
    Fingerprint::from_bits(bits)
}

fn dhash_vertical(gray: &GrayImage, hash_size: u32) -> Fingerprint {
    let small = imageops::resize(gray, hash_size, hash_size + 1, FilterType::Lanczos3);
    let small = &small;
    let bits = (0..hash_size).flat_map(move |y| {
        (0..hash_size).map(move |x| small.get_pixel(x, y + 1).0[0] > small.get_pixel(x, y).0[0])
    });
    Fingerprint::from_bits(bits)
}

fn phash(gray: &GrayImage, hash_size: u32) -> Fingerprint {
    // 4 倍过采样后做二维 DCT-II
    let n = (hash_size * 4) as usize;
    let small = imageops::resize(gray, n as u32, n as u32, FilterType::Lanczos3);
    let mut coeffs: Vec<f32> = small.pixels().map(|p| p.0[0] as f32).collect();

    let mut planner = DctPlanner::new();
    let dct = planner.plan_dct2(n);

    for row in coeffs.chunks_exact_mut(n) {
        dct.process_dct2(row);
    }
    let mut transposed = transpose(&coeffs, n);
    for row in transposed.chunks_exact_mut(n) {
        dct.process_dct2(row);
    }

    // transposed[u * n + v] 为第 v 行、第 u 列频率分量
    let s = hash_size as usize;
    let transposed = &transposed;
    let low: Vec<f32> = (0..s)
        .flat_map(move |v| (0..s).map(move |u| transposed[u * n + v]))
        .collect();

    let med = median(&low);
    Fingerprint::from_bits(low.iter().map(|&c| c > med))
}

fn whash(gray: &GrayImage, hash_size: u32) -> Fingerprint {
    // 边长取 hash_size * 2^k，且不超过图像短边
    let short_side = gray.width().min(gray.height());
    let mut scale = hash_size;
    while scale.saturating_mul(2) <= short_side {
        scale *= 2;
    }
    let small = imageops::resize(gray, scale, scale, FilterType::Lanczos3);
    let mut ll: Vec<f32> = small.pixels().map(|p| p.0[0] as f32 / 255.0).collect();

    let mut n = scale as usize;
    while n > hash_size as usize {
        ll = haar_ll(&ll, n);
        n /= 2;
    }

    let med = median(&ll);
    Fingerprint::from_bits(ll.iter().map(|&c| c > med))
}

/// 一层二维 Haar 分解的 LL 子带，`data` 为 n×n
fn haar_ll(data: &[f32], n: usize) -> Vec<f32> {
    let half = n / 2;
    let mut out = Vec::with_capacity(half * half);
    for y in 0..half {
        for x in 0..half {
            let i = 2 * y * n + 2 * x;
            out.push((data[i] + data[i + 1] + data[i + n] + data[i + n + 1]) / 2.0);
        }
    }
    out
}

fn transpose(data: &[f32], n: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; data.len()];
    for y in 0..n {
        for x in 0..n {
            out[x * n + y] = data[y * n + x];
        }
    }
    out
}

fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn split_image(horizontal: bool) -> DynamicImage {
        let img = GrayImage::from_fn(32, 32, |x, y| {
            let bright = if horizontal { x < 16 } else { y < 16 };
            Luma([if bright { 255 } else { 0 }])
        });
        DynamicImage::ImageLuma8(img)
    }

    fn gradient_image() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| Luma([(x * 4) as u8])))
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(0b0, 0b0), 0);
        assert_eq!(hamming_distance(0b1111, 0b0000), 4);
    }

    #[test]
    fn test_fingerprint_len_matches_hash_size() {
        let img = gradient_image();
        for alg in [
            HashAlgorithm::AverageHash,
            HashAlgorithm::PHash,
            HashAlgorithm::DHash,
            HashAlgorithm::DHashVertical,
            HashAlgorithm::WHash,
        ] {
            assert_eq!(alg.fingerprint(&img, 8).len(), 64, "{}", alg);
            assert_eq!(alg.fingerprint(&img, 12).len(), 144, "{}", alg);
        }
    }

    #[test]
    fn test_identical_images_have_zero_distance() {
        let a = split_image(true);
        let b = split_image(true);
        for alg in [
            HashAlgorithm::AverageHash,
            HashAlgorithm::PHash,
            HashAlgorithm::DHash,
            HashAlgorithm::WHash,
        ] {
            assert_eq!(alg.fingerprint(&a, 8).distance(&alg.fingerprint(&b, 8)), 0);
        }
    }

    #[test]
    fn test_average_hash_separates_orientations() {
        let left_right = HashAlgorithm::AverageHash.fingerprint(&split_image(true), 8);
        let top_bottom = HashAlgorithm::AverageHash.fingerprint(&split_image(false), 8);
        assert_eq!(left_right.count_ones(), 32);
        assert_eq!(left_right.distance(&top_bottom), 32);
    }

    #[test]
    fn test_whash_separates_orientations() {
        let left_right = HashAlgorithm::WHash.fingerprint(&split_image(true), 8);
        let top_bottom = HashAlgorithm::WHash.fingerprint(&split_image(false), 8);
        assert_eq!(left_right.count_ones(), 32);
        assert_eq!(left_right.distance(&top_bottom), 32);
    }

    #[test]
    fn test_haar_ll_halves_each_side() {
        let data = vec![1.0f32; 16];
        let ll = haar_ll(&data, 4);
        assert_eq!(ll, vec![2.0; 4]);
    }

    #[test]
    fn test_whash_on_image_smaller_than_hash() {
        let tiny = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([10])));
        assert_eq!(HashAlgorithm::WHash.fingerprint(&tiny, 8).len(), 64);
    }

    #[test]
    fn test_solid_image_average_hash_is_zero() {
        let solid = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([77])));
        assert_eq!(HashAlgorithm::AverageHash.fingerprint(&solid, 8).count_ones(), 0);
    }

    #[test]
    fn test_dhash_on_horizontal_gradient() {
        let img = gradient_image();
        let horizontal = HashAlgorithm::DHash.fingerprint(&img, 8);
        let vertical = HashAlgorithm::DHashVertical.fingerprint(&img, 8);
        assert_eq!(horizontal.count_ones(), 64);
        assert_eq!(vertical.count_ones(), 0);
    }

    #[test]
    fn test_from_bits_spans_words() {
        let fp = Fingerprint::from_bits((0..130).map(|i| i % 2 == 0));
        assert_eq!(fp.len(), 130);
        assert_eq!(fp.count_ones(), 65);
        let zeros = Fingerprint::from_bits((0..130).map(|_| false));
        assert_eq!(fp.distance(&zeros), 65);
    }

    #[test]
    fn test_algorithm_names_round_trip() {
        for name in ["average_hash", "phash", "dhash", "dhash_vertical", "whash"] {
            let alg: HashAlgorithm = name.parse().unwrap();
            assert_eq!(alg.name(), name);
        }
        assert!("colorhash".parse::<HashAlgorithm>().is_err());
    }
}
