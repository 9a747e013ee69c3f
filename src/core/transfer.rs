//! 单仓库文件传输：下载、上传、删除

use crate::core::path::{
    base_name, exclusion_key, filter_excluded, join_repo_path, join_under_root, normalize, relativize,
};
use crate::storage::{Asset, AssetStore, DeleteOutcome, LocalTree};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 下载请求
#[derive(Debug, Clone, Default)]
pub struct PullRequest {
    /// 以 `/` 结尾表示目录，否则是单个文件
    pub source: String,
    /// 仓库内的根路径，source 相对于它
    pub root: String,
    /// 本地目标目录，必须已存在
    pub destination: PathBuf,
    /// 保留相对 root 的目录结构；否则平铺为文件名
    pub save_structure: bool,
    /// 目录下载时跳过的子目录
    pub exclude: Vec<String>,
}

/// 上传请求
#[derive(Debug, Clone, Default)]
pub struct PushRequest {
    pub local: PathBuf,
    /// 仓库内的目标目录
    pub destination: String,
    /// 只用相对路径（文件取文件名，目录取相对目录的路径）
    pub relative: bool,
}

/// 删除统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub deleted: usize,
    pub not_found: usize,
}

/// 传输管理器
pub struct TransferManager<'a> {
    store: &'a dyn AssetStore,
    repository: String,
    dry_run: bool,
}

impl<'a> TransferManager<'a> {
    pub fn new(store: &'a dyn AssetStore, repository: &str, dry_run: bool) -> Self {
        Self {
            store,
            repository: repository.to_string(),
            dry_run,
        }
    }

    /// 下载文件或目录到本地，返回处理的文件数
    pub async fn pull(&self, request: &PullRequest) -> Result<usize> {
        let is_dir = std::fs::metadata(&request.destination)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            bail!(
                "destination '{}' is not an existing directory",
                request.destination.display()
            );
        }

        if request.source.ends_with('/') {
            self.pull_directory(request).await
        } else {
            self.pull_file(request).await.map(|_| 1)
        }
    }

    async fn pull_directory(&self, request: &PullRequest) -> Result<usize> {
        let prefix = join_under_root(&request.root, &request.source);
        let assets = self
            .store
            .list_assets(&self.repository, &prefix)
            .await
            .with_context(|| format!("failed to list '{}'", prefix))?;

        let keyed: HashMap<String, Asset> = assets
            .into_iter()
            .map(|asset| (relativize(&asset.path, &prefix), asset))
            .collect();
        let kept = request.exclude.iter().fold(keyed, |entries, exclude| {
            filter_excluded(entries, &exclusion_key(exclude, &prefix))
        });

        let mut assets: Vec<Asset> = kept.into_values().collect();
        assets.sort_by(|a, b| a.path.cmp(&b.path));

        info!("下载 {} 个文件到 {}", assets.len(), request.destination.display());
        for asset in &assets {
            self.save_asset(asset, request).await?;
        }

        Ok(assets.len())
    }

    async fn pull_file(&self, request: &PullRequest) -> Result<()> {
        let path = join_under_root(&request.root, &request.source);
        let asset = self
            .store
            .find_asset(&self.repository, &path)
            .await
            .with_context(|| format!("failed to locate '{}'", path))?;

        self.save_asset(&asset, request).await
    }

    async fn save_asset(&self, asset: &Asset, request: &PullRequest) -> Result<()> {
        if asset.download_url.is_empty() {
            bail!("download URL missing for {}", asset.path);
        }

        let name = if request.save_structure {
            relativize(&asset.path, &request.root)
        } else {
            base_name(&asset.path).to_string()
        };
        let local = request.destination.join(name.trim_start_matches('/'));

        if self.dry_run {
            info!("[dry-run] 将下载: {} -> {}", asset.path, local.display());
            return Ok(());
        }

        let content = self
            .store
            .download(&asset.download_url)
            .await
            .with_context(|| format!("failed to download '{}'", asset.path))?;
        LocalTree::write(&local, &content)
            .await
            .with_context(|| format!("failed to write '{}'", local.display()))?;

        debug!("已下载: {} -> {}", asset.path, local.display());
        Ok(())
    }

    /// 上传本地文件或目录，返回处理的文件数
    pub async fn push(&self, request: &PushRequest) -> Result<usize> {
        let metadata = match std::fs::metadata(&request.local) {
            Ok(m) => m,
            Err(_) => bail!("path '{}' does not exist", request.local.display()),
        };

        if !metadata.is_dir() {
            let name = if request.relative {
                base_name(&normalize(&request.local.to_string_lossy())).to_string()
            } else {
                request.local.to_string_lossy().into_owned()
            };
            let remote = join_repo_path(&[&request.destination, &name]);
            self.upload_file(&request.local, &remote).await?;
            return Ok(1);
        }

        let files = LocalTree::new(&request.local)
            .list_files()
            .await
            .with_context(|| format!("failed to walk '{}'", request.local.display()))?;

        info!("上传 {} 个文件到 {}", files.len(), self.repository);
        for file in &files {
            let remote = if request.relative {
                join_repo_path(&[&request.destination, &file.relative_path])
            } else {
                join_repo_path(&[&request.destination, &file.path.to_string_lossy()])
            };
            self.upload_file(&file.path, &remote).await?;
        }

        Ok(files.len())
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        if self.dry_run {
            info!("[dry-run] 将上传: {} -> {}", local.display(), remote);
            return Ok(());
        }

        let content = LocalTree::read(local)
            .await
            .with_context(|| format!("failed to read '{}'", local.display()))?;
        self.store
            .upload(&self.repository, remote, content)
            .await
            .with_context(|| format!("failed to upload '{}'", remote))?;

        debug!("已上传: {} -> {}", local.display(), remote);
        Ok(())
    }

    /// 删除文件；以 `/` 结尾时删除该目录下的全部文件
    pub async fn delete(&self, path: &str) -> Result<DeleteSummary> {
        let targets: Vec<String> = if path.ends_with('/') {
            let prefix = normalize(path);
            self.store
                .list_assets(&self.repository, &prefix)
                .await
                .with_context(|| format!("failed to list '{}'", prefix))?
                .into_iter()
                .map(|asset| asset.path)
                .collect()
        } else {
            vec![normalize(path)]
        };

        let mut summary = DeleteSummary::default();
        for target in &targets {
            if self.dry_run {
                info!("[dry-run] 将删除: {}", target);
                summary.deleted += 1;
                continue;
            }

            match self
                .store
                .delete(&self.repository, target)
                .await
                .with_context(|| format!("failed to delete '{}'", target))?
            {
                DeleteOutcome::Deleted => {
                    info!("已删除: {}", target);
                    summary.deleted += 1;
                }
                DeleteOutcome::NotFound => {
                    warn!("文件不存在: {}", target);
                    summary.not_found += 1;
                }
            }
        }

        Ok(summary)
    }
}
