//! 单仓库文件命令：list / pull / push / delete

use super::CommandContext;
use crate::cli::{ConnectionArgs, RepositoryArgs};
use crate::core::path::normalize;
use crate::core::{DeleteSummary, PullRequest, PushRequest, TransferManager};
use crate::storage::AssetStore;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// 下载参数
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub destination: PathBuf,
    pub root: String,
    pub save_structure: bool,
    pub exclude: Vec<String>,
}

pub async fn list(
    ctx: &CommandContext,
    connection: &ConnectionArgs,
    repository: &RepositoryArgs,
    subdir: Option<&str>,
) -> Result<()> {
    let client = ctx.connect(connection)?;
    let repository = ctx.repository(repository)?;

    let paths = list_paths(&client, &repository, subdir.unwrap_or_default()).await?;

    if !ctx.quiet {
        let location = match subdir.map(normalize).filter(|s| !s.is_empty()) {
            Some(dir) => format!("{}/{}", repository, dir),
            None => repository.clone(),
        };
        println!("Files in {} ({} files):", location, paths.len());
    }
    for path in paths {
        println!("{}", path);
    }
    Ok(())
}

/// 目录下全部文件路径，按字典序
pub async fn list_paths(store: &dyn AssetStore, repository: &str, subdir: &str) -> Result<Vec<String>> {
    let prefix = normalize(subdir);
    let mut paths: Vec<String> = store
        .list_assets(repository, &prefix)
        .await
        .with_context(|| format!("failed to list files in '{}'", repository))?
        .into_iter()
        .map(|asset| asset.path)
        .collect();
    paths.sort();
    Ok(paths)
}

pub async fn pull(
    ctx: &CommandContext,
    connection: &ConnectionArgs,
    repository: &RepositoryArgs,
    sources: &[String],
    options: &PullOptions,
) -> Result<()> {
    let client = ctx.connect(connection)?;
    let repository = ctx.repository(repository)?;
    let manager = TransferManager::new(&client, &repository, ctx.dry_run);

    let mut total = 0;
    for source in sources {
        let request = PullRequest {
            source: source.replace('\\', "/"),
            root: options.root.clone(),
            destination: options.destination.clone(),
            save_structure: options.save_structure,
            exclude: options.exclude.clone(),
        };
        total += manager
            .pull(&request)
            .await
            .with_context(|| format!("failed to download '{}'", source))?;
    }

    if !ctx.quiet {
        println!("Success! {} files downloaded", total);
    }
    Ok(())
}

pub async fn push(
    ctx: &CommandContext,
    connection: &ConnectionArgs,
    repository: &RepositoryArgs,
    paths: &[PathBuf],
    destination: &str,
    relative: bool,
) -> Result<()> {
    let client = ctx.connect(connection)?;
    let repository = ctx.repository(repository)?;
    let manager = TransferManager::new(&client, &repository, ctx.dry_run);

    let mut total = 0;
    for local in paths {
        let request = PushRequest {
            local: local.clone(),
            destination: destination.to_string(),
            relative,
        };
        total += manager
            .push(&request)
            .await
            .with_context(|| format!("failed to upload '{}'", local.display()))?;
    }

    if !ctx.quiet {
        println!("Success! {} files uploaded", total);
        println!("{}", client.browse_url(&repository, Some(destination)));
    }
    Ok(())
}

pub async fn delete(
    ctx: &CommandContext,
    connection: &ConnectionArgs,
    repository: &RepositoryArgs,
    paths: &[String],
) -> Result<()> {
    let client = ctx.connect(connection)?;
    let repository = ctx.repository(repository)?;
    let manager = TransferManager::new(&client, &repository, ctx.dry_run);

    let mut summary = DeleteSummary::default();
    for path in paths {
        let result = manager.delete(path).await?;
        summary.deleted += result.deleted;
        summary.not_found += result.not_found;
    }

    if !ctx.quiet {
        println!(
            "Deleted {} files ({} not found)",
            summary.deleted, summary.not_found
        );
    }
    Ok(())
}
