use crate::core::checksum::{ChecksumResolver, HashAlgorithm};
use crate::core::scanner::EntryMap;
use crate::storage::AssetStore;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

/// 内容一致的文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdenticalFile {
    pub path: String,
    pub algorithm: HashAlgorithm,
    pub hash: String,
}

/// 内容不同的文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifferentFile {
    pub path: String,
    pub algorithm: HashAlgorithm,
    pub source_hash: String,
    pub target_hash: String,
}

/// 比较报告，四个列表互不相交且按路径排序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub identical: Vec<IdenticalFile>,
    pub only_source: Vec<String>,
    pub only_target: Vec<String>,
    pub different: Vec<DifferentFile>,
}

impl DiffReport {
    fn sort(&mut self) {
        self.identical.sort_by(|a, b| a.path.cmp(&b.path));
        self.only_source.sort();
        self.only_target.sort();
        self.different.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

/// 文件比较器
pub struct FileComparator<'a> {
    resolver: ChecksumResolver<'a>,
}

impl<'a> FileComparator<'a> {
    /// 本地一侧传 `None`
    pub fn new(
        source_store: Option<&'a dyn AssetStore>,
        target_store: Option<&'a dyn AssetStore>,
    ) -> Self {
        Self {
            resolver: ChecksumResolver::new(source_store, target_store),
        }
    }

    /// 按相对路径配对并分类；任何一对解析失败都会终止整个比较
    pub async fn compare_trees(&self, source: &EntryMap, target: &EntryMap) -> Result<DiffReport> {
        info!("开始比较: 源 {} 个文件, 目标 {} 个文件", source.len(), target.len());

        let mut report = DiffReport::default();

        for (path, source_entry) in source {
            let Some(target_entry) = target.get(path) else {
                report.only_source.push(path.clone());
                continue;
            };

            let digests = self
                .resolver
                .resolve(source_entry, target_entry)
                .await
                .with_context(|| format!("failed to compare '{}'", path))?;

            if digests.matches() {
                report.identical.push(IdenticalFile {
                    path: path.clone(),
                    algorithm: digests.algorithm,
                    hash: digests.source,
                });
            } else {
                debug!("内容不同: {} ({})", path, digests.algorithm);
                report.different.push(DifferentFile {
                    path: path.clone(),
                    algorithm: digests.algorithm,
                    source_hash: digests.source,
                    target_hash: digests.target,
                });
            }
        }

        report.only_target = target
            .keys()
            .filter(|path| !source.contains_key(*path))
            .cloned()
            .collect();

        report.sort();

        info!(
            "比较完成: 相同 {}, 仅源 {}, 仅目标 {}, 不同 {}",
            report.identical.len(),
            report.only_source.len(),
            report.only_target.len(),
            report.different.len()
        );

        Ok(report)
    }
}
