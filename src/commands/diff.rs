//! 仓库与仓库、仓库与本地目录的比较

use super::CommandContext;
use crate::cli::DiffArgs;
use crate::config::Endpoint;
use crate::core::path::{exclusion_key, normalize};
use crate::core::{DiffReport, FileComparator, FileScanner};
use crate::storage::AssetStore;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// 比较的目标端
pub enum DiffTarget<'a> {
    Local(PathBuf),
    Repository {
        store: &'a dyn AssetStore,
        repository: String,
    },
}

/// 扫描两端并比较；`path` 同时作用于两端，`exclude` 可以是相对 path 的路径或仓库全路径
pub async fn compare(
    source: &dyn AssetStore,
    source_repo: &str,
    target: &DiffTarget<'_>,
    path: &str,
    exclude: &str,
) -> Result<DiffReport> {
    let root = normalize(path);
    let scanner = FileScanner::new().with_exclude(&exclusion_key(exclude, &root));

    let source_entries = scanner
        .scan_repository(source, source_repo, &root)
        .await
        .context("failed to load source repository files")?;

    let (target_entries, target_store) = match target {
        DiffTarget::Local(dir) => {
            let local_root = local_root(dir, &root);
            let entries = scanner
                .scan_local(&local_root)
                .await
                .context("failed to load local files")?;
            (entries, None)
        }
        DiffTarget::Repository { store, repository } => {
            let entries = scanner
                .scan_repository(*store, repository, &root)
                .await
                .context("failed to load target repository files")?;
            (entries, Some(*store))
        }
    };

    FileComparator::new(Some(source), target_store)
        .compare_trees(&source_entries, &target_entries)
        .await
}

fn local_root(dir: &Path, root: &str) -> PathBuf {
    root.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(dir.to_path_buf(), |acc, segment| acc.join(segment))
}

pub async fn run(ctx: &CommandContext, args: &DiffArgs) -> Result<()> {
    let remote_target = !args.target_address.is_empty() || !args.target_repo.is_empty();
    if args.local.is_none() && !remote_target {
        bail!("must specify either --local or --target-* flags");
    }

    let connection = &args.connection;
    let source_endpoint = ctx
        .endpoint(&connection.address, &connection.user, &connection.password)
        .context("invalid source connection")?;
    let source_repo = ctx.repository(&args.repository)?;
    let source = ctx.client(&source_endpoint)?;

    let report = match &args.local {
        Some(dir) => {
            info!("比较 {} 与本地目录 {}", source_repo, dir.display());
            compare(&source, &source_repo, &DiffTarget::Local(dir.clone()), &args.path, &args.exclude)
                .await?
        }
        None => {
            if args.target_repo.is_empty() {
                bail!("target repository is required when comparing repositories");
            }
            let target_endpoint = target_endpoint(&source_endpoint, args)?;
            let target = ctx.client(&target_endpoint)?;
            info!("比较 {} 与 {}/{}", source_repo, target.base_url(), args.target_repo);

            let target = DiffTarget::Repository {
                store: &target,
                repository: args.target_repo.clone(),
            };
            compare(&source, &source_repo, &target, &args.path, &args.exclude).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// 目标端未指定的连接参数沿用源端
fn target_endpoint(source: &Endpoint, args: &DiffArgs) -> Result<Endpoint> {
    fn or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
        if value.is_empty() {
            fallback
        } else {
            value
        }
    }

    Endpoint::new(
        or(&args.target_address, &source.address),
        or(&args.target_user, &source.user),
        or(&args.target_pass, &source.password),
    )
    .context("invalid target connection")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checksum::HashAlgorithm;
    use crate::storage::memory::MemoryStore;

    #[tokio::test]
    async fn test_compare_repository_with_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("releases").join("v1");
        std::fs::create_dir_all(local.join("cache")).unwrap();
        std::fs::write(local.join("app.bin"), b"binary").unwrap();
        std::fs::write(local.join("cache/tmp.bin"), b"ignored").unwrap();

        let store = MemoryStore::new("mem")
            .with_file("raw", "releases/v1/app.bin", b"binary")
            .with_file("raw", "releases/v1/cache/other.bin", b"ignored too")
            .with_file("raw", "releases/v1/only-remote.txt", b"r");

        let report = compare(
            &store,
            "raw",
            &DiffTarget::Local(dir.path().to_path_buf()),
            "/releases/v1/",
            "releases/v1/cache",
        )
        .await
        .unwrap();

        assert_eq!(report.identical.len(), 1);
        assert_eq!(report.identical[0].path, "app.bin");
        assert_eq!(
            report.identical[0].hash,
            "9a3a45d01531a20e89ac6ae10b0b0beb0492acd7216a368aa062d1a5fecaf9cd"
        );
        assert_eq!(report.only_source, vec!["only-remote.txt"]);
        assert!(report.only_target.is_empty());
        assert!(report.different.is_empty());
    }

    #[tokio::test]
    async fn test_compare_two_repositories() {
        let source = MemoryStore::new("source")
            .with_reported_file("raw", "a.txt", b"same", &[("sha1", "1111")])
            .with_file("raw", "b.txt", b"left");
        let target = MemoryStore::new("target")
            .with_reported_file("mirror", "a.txt", b"same", &[("sha1", "1111")])
            .with_file("mirror", "b.txt", b"right")
            .with_file("mirror", "c.txt", b"new");

        let report = compare(
            &source,
            "raw",
            &DiffTarget::Repository {
                store: &target,
                repository: "mirror".to_string(),
            },
            "",
            "",
        )
        .await
        .unwrap();

        assert_eq!(report.identical[0].algorithm, HashAlgorithm::Sha1);
        assert_eq!(report.different[0].path, "b.txt");
        assert_eq!(report.only_target, vec!["c.txt"]);
        assert_eq!(source.calls().digests, 1);
        assert_eq!(target.calls().digests, 1);
    }

    #[tokio::test]
    async fn test_compare_missing_local_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new("mem").with_file("raw", "x/a.txt", b"a");

        let err = compare(
            &store,
            "raw",
            &DiffTarget::Local(dir.path().to_path_buf()),
            "x",
            "",
        )
        .await
        .unwrap_err();
        assert!(format!("{:#}", err).contains("failed to load local files"));
    }

    #[test]
    fn test_target_endpoint_defaults_to_source() {
        let source = Endpoint::new("http://nexus", "u", "p").unwrap();
        let args = DiffArgs {
            target_repo: "mirror".to_string(),
            target_user: "other".to_string(),
            ..DiffArgs::default()
        };

        let target = target_endpoint(&source, &args).unwrap();
        assert_eq!(target.address, "http://nexus");
        assert_eq!(target.user, "other");
        assert_eq!(target.password, "p");
    }
}
