pub mod asset;
pub mod blob;
pub mod diff;
pub mod init;
pub mod repo;
pub mod sync;

use crate::cli::{
    AssetCommand, BlobCommand, Cli, Commands, ConnectionArgs, RepoCommand, RepositoryArgs,
};
use crate::config::{AppConfig, Endpoint};
use crate::storage::NexusClient;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// 命令共享的运行参数
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub quiet: bool,
    pub dry_run: bool,
    pub insecure: bool,
}

impl CommandContext {
    pub fn new(cli: &Cli, config: AppConfig) -> Self {
        Self {
            config,
            config_path: cli.config.clone().unwrap_or_else(AppConfig::default_path),
            quiet: cli.quiet,
            dry_run: cli.dry,
            insecure: cli.insecure,
        }
    }

    /// 命令行参数覆盖配置文件后的连接参数
    pub fn endpoint(&self, address: &str, user: &str, password: &str) -> Result<Endpoint> {
        let mut config = self.config.clone();
        config.merge(address, user, password, "");
        config.endpoint().context("configuration error")
    }

    pub fn connect(&self, connection: &ConnectionArgs) -> Result<NexusClient> {
        let endpoint = self.endpoint(&connection.address, &connection.user, &connection.password)?;
        self.client(&endpoint)
    }

    pub fn client(&self, endpoint: &Endpoint) -> Result<NexusClient> {
        NexusClient::new(endpoint, self.insecure).context("failed to create HTTP client")
    }

    /// 仓库名：命令行优先，其次配置文件
    pub fn repository(&self, args: &RepositoryArgs) -> Result<String> {
        let repository = if args.repository.is_empty() {
            self.config.repository.as_str()
        } else {
            args.repository.as_str()
        };

        if repository.is_empty() {
            bail!("repository is required (use --repository or set repository in the config file)");
        }
        Ok(repository.to_string())
    }
}

/// 按列宽左对齐，列间两个空格，去掉行尾空白
pub fn format_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let mut out = String::new();
    for row in std::iter::once(&header).chain(rows) {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// 执行子命令
pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let ctx = CommandContext::new(&cli, config);

    match cli.command {
        Commands::Init {
            connection,
            repository,
        } => init::run(&ctx, &connection, &repository),
        Commands::Repo {
            command: RepoCommand::Ls { connection },
        } => repo::list(&ctx, &connection).await,
        Commands::Asset { command } => match command {
            AssetCommand::List {
                connection,
                repository,
                subdir,
            } => asset::list(&ctx, &connection, &repository, subdir.as_deref()).await,
            AssetCommand::Pull {
                connection,
                repository,
                destination,
                root,
                save_structure,
                exclude,
                sources,
            } => {
                let options = asset::PullOptions {
                    destination,
                    root,
                    save_structure,
                    exclude,
                };
                asset::pull(&ctx, &connection, &repository, &sources, &options).await
            }
            AssetCommand::Push {
                connection,
                repository,
                destination,
                relative,
                paths,
            } => asset::push(&ctx, &connection, &repository, &paths, &destination, relative).await,
            AssetCommand::Delete {
                connection,
                repository,
                paths,
            } => asset::delete(&ctx, &connection, &repository, &paths).await,
            AssetCommand::Diff(args) => diff::run(&ctx, &args).await,
        },
        Commands::Blob { command } => match command {
            BlobCommand::List { connection } => blob::list(&ctx, &connection).await,
            BlobCommand::Show { connection, name } => blob::show(&ctx, &connection, &name).await,
            BlobCommand::Create {
                connection,
                options,
            } => blob::create(&ctx, &connection, &options).await,
        },
        Commands::Sync(args) => sync::run(&ctx, &args).await,
    }
}
