use crate::core::checksum::{normalize_checksums, HashAlgorithm};
use crate::core::path::{filter_excluded, relativize};
use crate::storage::{Asset, AssetStore, LocalTree};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 条目的来源：远程仓库中的文件，或本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    Remote(Asset),
    Local(PathBuf),
}

/// 比较时使用的文件条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub relative_path: String,
    pub source: EntrySource,
}

/// 相对路径 -> 条目
pub type EntryMap = HashMap<String, FileEntry>;

impl FileEntry {
    pub fn remote(relative_path: &str, asset: Asset) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            source: EntrySource::Remote(asset),
        }
    }

    pub fn local(relative_path: &str, path: PathBuf) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            source: EntrySource::Local(path),
        }
    }

    /// 服务端已给出的摘要；本地文件总是为空
    pub fn reported_checksums(&self) -> HashMap<HashAlgorithm, String> {
        match &self.source {
            EntrySource::Remote(asset) => asset
                .checksum
                .as_ref()
                .map(normalize_checksums)
                .unwrap_or_default(),
            EntrySource::Local(_) => HashMap::new(),
        }
    }

    /// 计算内容摘要：远程条目下载计算，本地条目直接读取文件
    pub async fn compute_digest(
        &self,
        store: Option<&dyn AssetStore>,
        algorithm: HashAlgorithm,
    ) -> Result<String> {
        match &self.source {
            EntrySource::Remote(asset) => {
                if asset.download_url.is_empty() {
                    bail!("download URL missing for {}", asset.path);
                }
                let Some(store) = store else {
                    bail!("a repository client is required to hash {}", asset.path);
                };
                Ok(store.digest(&asset.download_url, algorithm).await?)
            }
            EntrySource::Local(path) => {
                if path.as_os_str().is_empty() {
                    bail!("local path is missing for {}", self.relative_path);
                }
                Ok(LocalTree::digest(path, algorithm).await?)
            }
        }
    }
}

/// 文件扫描器：把仓库或本地目录转换为以相对路径为键的条目表
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    /// 排除的子树（已规范化的相对路径）
    exclude: Option<String>,
}

impl FileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclude(mut self, exclude: &str) -> Self {
        self.exclude = (!exclude.is_empty()).then(|| exclude.to_string());
        self
    }

    fn apply_exclude(&self, entries: EntryMap) -> EntryMap {
        match &self.exclude {
            Some(exclude) => {
                let before = entries.len();
                let kept = filter_excluded(entries, exclude);
                debug!("排除 '{}' 下 {} 个文件", exclude, before - kept.len());
                kept
            }
            None => entries,
        }
    }

    /// 扫描仓库中 root 下的全部文件
    pub async fn scan_repository(
        &self,
        store: &dyn AssetStore,
        repository: &str,
        root: &str,
    ) -> Result<EntryMap> {
        info!("开始扫描仓库: {} {}, root: '{}'", store.name(), repository, root);

        let assets = store.list_assets(repository, root).await?;

        let mut entries = HashMap::with_capacity(assets.len());
        for asset in assets {
            let key = relativize(&asset.path, root);
            entries.insert(key.clone(), FileEntry::remote(&key, asset));
        }

        Ok(self.apply_exclude(entries))
    }

    /// 扫描本地文件或目录
    pub async fn scan_local(&self, root: &Path) -> Result<EntryMap> {
        info!("开始扫描本地目录: {}", root.display());

        let files = LocalTree::new(root)
            .list_files()
            .await
            .with_context(|| format!("failed to walk '{}'", root.display()))?;

        let entries = files
            .into_iter()
            .map(|file| {
                let entry = FileEntry::local(&file.relative_path, file.path);
                (file.relative_path, entry)
            })
            .collect();

        Ok(self.apply_exclude(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    fn keys(entries: &EntryMap) -> Vec<String> {
        let mut keys: Vec<_> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_scan_repository_relativizes_and_excludes() {
        let store = MemoryStore::new("mem")
            .with_file("repo", "releases/v1/app.bin", b"1")
            .with_file("repo", "releases/v1/tmp/scratch.bin", b"2")
            .with_file("repo", "releases/v1/docs/a.md", b"3");

        let entries = FileScanner::new()
            .with_exclude("tmp")
            .scan_repository(&store, "repo", "releases/v1")
            .await
            .unwrap();

        assert_eq!(keys(&entries), vec!["app.bin", "docs/a.md"]);
        match &entries["app.bin"].source {
            EntrySource::Remote(asset) => assert_eq!(asset.path, "releases/v1/app.bin"),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scan_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("top.txt"), b"t").unwrap();
        std::fs::write(dir.path().join("a/b/deep.txt"), b"d").unwrap();

        let entries = FileScanner::new().scan_local(dir.path()).await.unwrap();

        assert_eq!(keys(&entries), vec!["a/b/deep.txt", "top.txt"]);
        assert_eq!(
            entries["a/b/deep.txt"].source,
            EntrySource::Local(dir.path().join("a").join("b").join("deep.txt"))
        );
    }

    #[tokio::test]
    async fn test_scan_local_single_file_uses_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.bin");
        std::fs::write(&file, b"x").unwrap();

        let entries = FileScanner::new().scan_local(&file).await.unwrap();
        assert_eq!(keys(&entries), vec!["only.bin"]);
    }

    #[tokio::test]
    async fn test_scan_local_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileScanner::new().scan_local(&dir.path().join("absent")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_local_entries_report_nothing() {
        let entry = FileEntry::local("a", PathBuf::from("/tmp/a"));
        assert!(entry.reported_checksums().is_empty());
    }
}
