//! 初始化配置文件

use super::CommandContext;
use crate::cli::{ConnectionArgs, RepositoryArgs};
use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// 合并已有配置与命令行参数，校验后写入
pub fn run(ctx: &CommandContext, connection: &ConnectionArgs, repository: &RepositoryArgs) -> Result<()> {
    let config = build_config(&ctx.config, connection, repository)?;

    if ctx.dry_run {
        info!("[dry-run] 将写入配置文件: {}", ctx.config_path.display());
        return Ok(());
    }

    write_config(&config, &ctx.config_path)?;
    if !ctx.quiet {
        println!("Configuration saved to {}", ctx.config_path.display());
    }
    Ok(())
}

fn build_config(
    existing: &AppConfig,
    connection: &ConnectionArgs,
    repository: &RepositoryArgs,
) -> Result<AppConfig> {
    let mut config = existing.clone();
    config.merge(
        &connection.address,
        &connection.user,
        &connection.password,
        &repository.repository,
    );
    config.validate().context("configuration error")?;
    Ok(config)
}

fn write_config(config: &AppConfig, path: &Path) -> Result<()> {
    config.save(path)?;
    info!("配置已写入: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_merged_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg/nexsync.yaml");

        let connection = ConnectionArgs {
            address: "https://nexus.local/".to_string(),
            user: "ci".to_string(),
            password: "token".to_string(),
        };
        let repository = RepositoryArgs {
            repository: "raw-hosted".to_string(),
        };
        let config = build_config(&AppConfig::default(), &connection, &repository).unwrap();
        write_config(&config, &path).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.nexus_address, "https://nexus.local/");
        assert_eq!(loaded.repository, "raw-hosted");
        assert_eq!(loaded.endpoint().unwrap().address, "https://nexus.local");
    }

    #[test]
    fn test_init_rejects_address_without_scheme() {
        let connection = ConnectionArgs {
            address: "nexus.local".to_string(),
            ..ConnectionArgs::default()
        };
        let result = build_config(&AppConfig::default(), &connection, &RepositoryArgs::default());
        assert!(result.is_err());
    }
}
