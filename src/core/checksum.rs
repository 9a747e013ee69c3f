//! 校验和解析 - 为一对匹配的文件选出共同算法并得到可比较的摘要

use crate::core::scanner::FileEntry;
use crate::storage::AssetStore;
use anyhow::Result;
use serde::Serialize;
use sha2::Digest;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// 支持的摘要算法，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Sha1,
    Md5,
}

impl HashAlgorithm {
    pub const PREFERENCE: [HashAlgorithm; 3] =
        [HashAlgorithm::Sha256, HashAlgorithm::Sha1, HashAlgorithm::Md5];

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Md5 => "md5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "md5" => Ok(HashAlgorithm::Md5),
            other => Err(anyhow::anyhow!("unsupported hash algorithm: {}", other)),
        }
    }
}

/// 增量哈希器
pub enum Hasher {
    Sha256(sha2::Sha256),
    Sha1(sha1::Sha1),
    Md5(md5::Context),
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Md5 => Hasher::Md5(md5::Context::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha1(h) => h.update(data),
            Hasher::Md5(h) => h.consume(data),
        }
    }

    /// 小写十六进制
    pub fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha256(h) => format!("{:x}", h.finalize()),
            Hasher::Sha1(h) => format!("{:x}", h.finalize()),
            Hasher::Md5(h) => format!("{:x}", h.compute()),
        }
    }
}

impl Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}

/// 流式计算本地文件摘要（阻塞）
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new(algorithm);
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize_hex())
}

/// 统一为小写键值，丢弃空值和未知算法
pub fn normalize_checksums(input: &HashMap<String, String>) -> HashMap<HashAlgorithm, String> {
    input
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .filter_map(|(key, value)| {
            key.parse::<HashAlgorithm>()
                .ok()
                .map(|algorithm| (algorithm, value.to_ascii_lowercase()))
        })
        .collect()
}

/// 两边都已有的算法优先；否则任意一边有的；都没有则用 sha256
pub fn choose_algorithm(
    source: &HashMap<HashAlgorithm, String>,
    target: &HashMap<HashAlgorithm, String>,
) -> HashAlgorithm {
    HashAlgorithm::PREFERENCE
        .into_iter()
        .find(|a| source.contains_key(a) && target.contains_key(a))
        .or_else(|| {
            HashAlgorithm::PREFERENCE
                .into_iter()
                .find(|a| source.contains_key(a) || target.contains_key(a))
        })
        .unwrap_or(HashAlgorithm::Sha256)
}

/// 可直接比较的一对摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDigests {
    pub algorithm: HashAlgorithm,
    pub source: String,
    pub target: String,
}

impl ResolvedDigests {
    pub fn matches(&self) -> bool {
        self.source.eq_ignore_ascii_case(&self.target)
    }
}

/// 校验和解析器
///
/// 先用服务端已经给出的摘要，缺哪边才去下载/读取哪边。远程条目需要对应的
/// 仓库客户端，本地条目直接读文件。
pub struct ChecksumResolver<'a> {
    source_store: Option<&'a dyn AssetStore>,
    target_store: Option<&'a dyn AssetStore>,
}

impl<'a> ChecksumResolver<'a> {
    pub fn new(
        source_store: Option<&'a dyn AssetStore>,
        target_store: Option<&'a dyn AssetStore>,
    ) -> Self {
        Self {
            source_store,
            target_store,
        }
    }

    pub async fn resolve(&self, source: &FileEntry, target: &FileEntry) -> Result<ResolvedDigests> {
        // 只在局部副本上补充摘要，原始 Asset 不变
        let mut source_sums = source.reported_checksums();
        let mut target_sums = target.reported_checksums();

        let algorithm = choose_algorithm(&source_sums, &target_sums);

        if !source_sums.contains_key(&algorithm) {
            debug!("计算源端 {}: {}", algorithm, source.relative_path);
            let digest = source.compute_digest(self.source_store, algorithm).await?;
            source_sums.insert(algorithm, digest.to_ascii_lowercase());
        }
        if !target_sums.contains_key(&algorithm) {
            debug!("计算目标端 {}: {}", algorithm, target.relative_path);
            let digest = target.compute_digest(self.target_store, algorithm).await?;
            target_sums.insert(algorithm, digest.to_ascii_lowercase());
        }

        Ok(ResolvedDigests {
            algorithm,
            source: source_sums.remove(&algorithm).unwrap_or_default(),
            target: target_sums.remove(&algorithm).unwrap_or_default(),
        })
    }
}
