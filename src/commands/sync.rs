use super::CommandContext;
use crate::cli::SyncArgs;
use crate::core::{SyncConfig, SyncEngine, SyncReport};
use anyhow::{bail, Context, Result};
use tracing::info;

/// 把源仓库的全部文件传输到目标仓库
pub async fn run(ctx: &CommandContext, args: &SyncArgs) -> Result<()> {
    let source_endpoint = ctx
        .endpoint(&args.source_address, &args.source_user, &args.source_pass)
        .context("invalid source connection")?;
    let target_endpoint = ctx
        .endpoint(&args.target_address, &args.target_user, &args.target_pass)
        .context("invalid target connection")?;

    if args.source_repo.is_empty() {
        bail!("source repository is required");
    }
    if args.target_repo.is_empty() {
        bail!("target repository is required");
    }

    let source = ctx.client(&source_endpoint)?;
    let target = ctx.client(&target_endpoint)?;

    info!(
        "扫描源仓库 '{}' ({})",
        args.source_repo,
        source.base_url()
    );

    let config = SyncConfig {
        dry_run: ctx.dry_run,
        skip_existing: args.skip_existing,
        show_progress: args.show_progress,
    };
    let report = SyncEngine::new(&source, &target, config)
        .run(&args.source_repo, &args.target_repo)
        .await?;

    println!("{}", summary_line(&report));
    Ok(())
}

fn summary_line(report: &SyncReport) -> String {
    format!(
        "Transfer completed: {} files transferred, {} files skipped",
        report.transferred, report.skipped
    )
}
