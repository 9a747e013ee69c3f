//! Blob store 管理：list / show / create

use super::{format_table, CommandContext};
use crate::cli::{BlobCreateArgs, ConnectionArgs};
use crate::storage::{BlobStore, BlobStoreConfig, SoftQuota};
use anyhow::{bail, Context, Result};
use tracing::info;

const QUOTA_TYPES: [&str; 2] = ["spaceRemainingQuota", "spaceUsedQuota"];

pub async fn list(ctx: &CommandContext, connection: &ConnectionArgs) -> Result<()> {
    let client = ctx.connect(connection)?;

    let stores = if ctx.dry_run {
        info!("[dry-run] 将请求 blob store 列表: {}", client.base_url());
        Vec::new()
    } else {
        client
            .list_blob_stores()
            .await
            .context("failed to list blob stores")?
    };

    if stores.is_empty() {
        println!("No blob stores found.");
    } else {
        print!("{}", blob_store_table(&stores));
    }
    Ok(())
}

pub async fn show(ctx: &CommandContext, connection: &ConnectionArgs, name: &str) -> Result<()> {
    let client = ctx.connect(connection)?;

    if ctx.dry_run {
        info!("[dry-run] 将查询 blob store '{}': {}", name, client.base_url());
        return Ok(());
    }

    let store = client
        .get_blob_store(name)
        .await
        .context("failed to get blob store information")?;
    println!("{}", serde_json::to_string_pretty(&store)?);
    Ok(())
}

pub async fn create(
    ctx: &CommandContext,
    connection: &ConnectionArgs,
    args: &BlobCreateArgs,
) -> Result<()> {
    let config = build_config(args)?;
    let client = ctx.connect(connection)?;

    if ctx.dry_run {
        info!(
            "[dry-run] 将创建 blob store '{}' ({}): {}",
            config.name,
            config.kind,
            client.base_url()
        );
        return Ok(());
    }

    client
        .create_blob_store(&config)
        .await
        .context("failed to create blob store")?;

    if !ctx.quiet {
        println!("Blob store '{}' created successfully", config.name);
    }
    Ok(())
}

fn build_config(args: &BlobCreateArgs) -> Result<BlobStoreConfig> {
    if args.name.trim().is_empty() {
        bail!("blob store name is required");
    }
    if args.kind.is_empty() {
        bail!("--type is required (e.g., 'file')");
    }
    if args.kind.eq_ignore_ascii_case("file") && args.path.is_empty() {
        bail!("--path is required for file blob stores");
    }

    let soft_quota = if args.soft_quota.is_empty() {
        None
    } else {
        if !QUOTA_TYPES.contains(&args.soft_quota_type.as_str()) {
            bail!(
                "invalid soft quota type '{}' (expected {})",
                args.soft_quota_type,
                QUOTA_TYPES.join(" or ")
            );
        }
        Some(SoftQuota {
            limit: parse_size(&args.soft_quota)?,
            kind: args.soft_quota_type.clone(),
        })
    };

    Ok(BlobStoreConfig {
        name: args.name.clone(),
        kind: args.kind.clone(),
        path: args.path.clone(),
        soft_quota,
    })
}

/// 解析 `512`、`100M`、`10GB` 形式的大小，单位按 1024 进位
pub fn parse_size(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    let upper = trimmed.to_ascii_uppercase();
    let number = upper.strip_suffix('B').unwrap_or(&upper);

    let (digits, shift) = match number.chars().last() {
        Some('K') => (&number[..number.len() - 1], 10),
        Some('M') => (&number[..number.len() - 1], 20),
        Some('G') => (&number[..number.len() - 1], 30),
        Some('T') => (&number[..number.len() - 1], 40),
        _ => (number, 0),
    };

    let base: u64 = digits
        .trim()
        .parse()
        .with_context(|| format!("invalid size '{}'", trimmed))?;
    base.checked_mul(1u64 << shift)
        .with_context(|| format!("size '{}' is too large", trimmed))
}

/// 1024 进位，保留一位小数
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}

fn blob_store_table(stores: &[BlobStore]) -> String {
    let header = ["NAME", "TYPE", "AVAILABLE SPACE", "TOTAL SPACE", "BLOB COUNT"];
    let separator: Vec<String> = header.iter().map(|h| "-".repeat(h.len())).collect();

    let rows: Vec<Vec<String>> = std::iter::once(separator)
        .chain(stores.iter().map(|s| {
            vec![
                s.name.clone(),
                s.kind.clone(),
                format_bytes(s.available_space_in_bytes),
                format_bytes(s.total_size_in_bytes),
                s.blob_count.to_string(),
            ]
        }))
        .collect();

    format_table(&header, &rows)
}
