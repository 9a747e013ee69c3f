//! 仓库列表

use super::{format_table, CommandContext};
use crate::cli::ConnectionArgs;
use crate::storage::nexus::browse_url;
use crate::storage::{AssetStore, Repository};
use anyhow::{Context, Result};
use tracing::info;

pub async fn list(ctx: &CommandContext, connection: &ConnectionArgs) -> Result<()> {
    let client = ctx.connect(connection)?;

    let repositories = if ctx.dry_run {
        info!("[dry-run] 将请求仓库列表: {}", client.base_url());
        Vec::new()
    } else {
        client
            .list_repositories()
            .await
            .context("failed to list repositories")?
    };

    print!("{}", repository_table(&repositories, client.base_url()));
    Ok(())
}

/// NAME/FORMAT/TYPE/BROWSER 表格
pub fn repository_table(repositories: &[Repository], base_url: &str) -> String {
    let rows: Vec<Vec<String>> = repositories
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.format.clone(),
                r.kind.clone(),
                browse_url(base_url, &r.name, None),
            ]
        })
        .collect();

    format_table(&["NAME", "FORMAT", "TYPE", "BROWSER"], &rows)
}
