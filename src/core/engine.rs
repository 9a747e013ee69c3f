use crate::storage::{Asset, AssetStore};
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 同步配置
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncConfig {
    /// 只演练，不下载不上传
    pub dry_run: bool,
    /// 目标已存在同路径文件时跳过
    pub skip_existing: bool,
    /// 逐个打印 `[i/n] Processing: path`
    pub show_progress: bool,
}

/// 源端最大的文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargestFile {
    pub path: String,
    pub size: u64,
}

/// 同步报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub transferred: usize,
    pub skipped: usize,
    pub largest: Option<LargestFile>,
    pub duration_ms: u64,
}

/// 同步引擎：顺序地把源仓库的所有文件复制到目标仓库
pub struct SyncEngine<'a> {
    source: &'a dyn AssetStore,
    target: &'a dyn AssetStore,
    config: SyncConfig,
}

impl<'a> SyncEngine<'a> {
    pub fn new(source: &'a dyn AssetStore, target: &'a dyn AssetStore, config: SyncConfig) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    /// 运行同步；任何一个文件传输失败都会终止整个同步
    pub async fn run(&self, source_repo: &str, target_repo: &str) -> Result<SyncReport> {
        let start = Instant::now();
        info!(
            "开始同步: {}/{} -> {}/{}",
            self.source.name(),
            source_repo,
            self.target.name(),
            target_repo
        );

        let assets = self
            .source
            .list_assets(source_repo, "")
            .await
            .context("failed to load source repository files")?;

        let mut report = SyncReport::default();
        if assets.is_empty() {
            info!("源仓库中没有文件");
            return Ok(report);
        }

        if !self.config.dry_run {
            report.largest = self.find_largest(source_repo, &assets).await;
            if let Some(largest) = &report.largest {
                info!("Largest file: {} ({} bytes)", largest.path, largest.size);
            }
        }

        let total = assets.len();
        for (index, asset) in assets.iter().enumerate() {
            if self.config.show_progress {
                println!("[{}/{}] Processing: {}", index + 1, total, asset.path);
            }

            if self.config.skip_existing && self.exists_in_target(target_repo, &asset.path).await {
                if self.config.show_progress {
                    println!("  Skipped (already exists)");
                }
                report.skipped += 1;
                continue;
            }

            self.transfer(target_repo, asset)
                .await
                .with_context(|| format!("failed to transfer file '{}'", asset.path))?;
            report.transferred += 1;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "同步完成: 传输 {}, 跳过 {}, 耗时 {}ms",
            report.transferred, report.skipped, report.duration_ms
        );

        Ok(report)
    }

    /// 查询每个文件大小，找出最大的一个；全部为空文件时没有结果，查询失败只记录警告
    async fn find_largest(&self, repository: &str, assets: &[Asset]) -> Option<LargestFile> {
        let mut largest: Option<LargestFile> = None;

        for asset in assets {
            match self.source.content_length(repository, &asset.path).await {
                Ok(size) => {
                    if size > largest.as_ref().map_or(0, |l| l.size) {
                        largest = Some(LargestFile {
                            path: asset.path.clone(),
                            size,
                        });
                    }
                }
                Err(e) => warn!("获取文件大小失败 {}: {}", asset.path, e),
            }
        }

        largest
    }

    /// 存在性检查失败视为不存在
    async fn exists_in_target(&self, repository: &str, path: &str) -> bool {
        match self.target.exists(repository, path).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("检查目标文件是否存在失败 {}: {}", path, e);
                false
            }
        }
    }

    async fn transfer(&self, target_repo: &str, asset: &Asset) -> Result<()> {
        if self.config.dry_run {
            info!("[dry-run] 将传输: {}", asset.path);
            return Ok(());
        }

        let content = self
            .source
            .download(&asset.download_url)
            .await
            .context("download failed")?;
        debug!("已下载 {} ({} bytes)", asset.path, content.len());

        self.target
            .upload(target_repo, &asset.path, content)
            .await
            .context("upload failed")?;

        Ok(())
    }
}
