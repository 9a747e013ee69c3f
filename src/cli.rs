//! 命令行参数

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// nexsync - Nexus raw 仓库的镜像、比较与传输工具
#[derive(Parser, Debug)]
#[command(name = "nexsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (default: ~/.nexsync.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Dry run - show what would be done without actually doing it
    #[arg(long, global = true)]
    pub dry: bool,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 单个服务器的连接参数，非空时覆盖配置文件
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Nexus host address (overrides config file)
    #[arg(short, long, default_value = "")]
    pub address: String,

    /// User authentication login (overrides config file)
    #[arg(short, long, default_value = "")]
    pub user: String,

    /// User authentication password (overrides config file)
    #[arg(short, long, default_value = "")]
    pub password: String,
}

/// 仓库名参数
#[derive(Args, Debug, Clone, Default)]
pub struct RepositoryArgs {
    /// Nexus raw repository name (overrides config file)
    #[arg(short, long, default_value = "")]
    pub repository: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the configuration file
    Init {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        repository: RepositoryArgs,
    },

    /// Work with repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Work with assets of one repository
    Asset {
        #[command(subcommand)]
        command: AssetCommand,
    },

    /// Blob store management
    Blob {
        #[command(subcommand)]
        command: BlobCommand,
    },

    /// Transfer contents from one repository to another
    Sync(SyncArgs),
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// List repositories
    Ls {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    /// List files in a repository directory
    List {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        repository: RepositoryArgs,

        /// Directory inside the repository
        subdir: Option<String>,
    },

    /// Download files or directories (directories end with '/')
    Pull {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        repository: RepositoryArgs,

        /// Local destination directory
        #[arg(short, long, default_value = ".")]
        destination: PathBuf,

        /// Root path in the repository
        #[arg(long, default_value = "")]
        root: String,

        /// Save directory structure in the destination
        #[arg(short, long = "save-structure")]
        save_structure: bool,

        /// Nested directories to skip (can be repeated or comma separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Upload files or directories
    Push {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        repository: RepositoryArgs,

        /// Destination path in the repository
        #[arg(short, long, default_value = "")]
        destination: String,

        /// Use relative paths when uploading
        #[arg(long)]
        relative: bool,

        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Delete files (paths ending with '/' delete a whole directory)
    Delete {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        repository: RepositoryArgs,

        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Compare a repository with another repository or a local directory
    Diff(DiffArgs),
}

#[derive(Subcommand, Debug)]
pub enum BlobCommand {
    /// List all blob stores
    List {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Show detailed information about a blob store
    Show {
        #[command(flatten)]
        connection: ConnectionArgs,

        name: String,
    },

    /// Create a new blob store
    Create {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        options: BlobCreateArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct BlobCreateArgs {
    pub name: String,

    /// Blob store type (e.g. 'file')
    #[arg(short = 't', long = "type")]
    pub kind: String,

    /// Path for a file blob store (required for the file type)
    #[arg(long, default_value = "")]
    pub path: String,

    /// Soft quota limit (e.g. '100M', '10G')
    #[arg(long, default_value = "")]
    pub soft_quota: String,

    /// Soft quota type (spaceRemainingQuota or spaceUsedQuota)
    #[arg(long, default_value = "spaceRemainingQuota")]
    pub soft_quota_type: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DiffArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub repository: RepositoryArgs,

    /// Target Nexus address (defaults to the source address)
    #[arg(long, default_value = "")]
    pub target_address: String,

    /// Target repository name
    #[arg(long, default_value = "")]
    pub target_repo: String,

    /// Target user (defaults to the source user)
    #[arg(long, default_value = "")]
    pub target_user: String,

    /// Target password (defaults to the source password)
    #[arg(long, default_value = "")]
    pub target_pass: String,

    /// Local directory to compare against
    #[arg(long, conflicts_with_all = ["target_address", "target_repo", "target_user", "target_pass"])]
    pub local: Option<PathBuf>,

    /// Path inside the repository (and the local directory) to compare
    #[arg(long, default_value = "")]
    pub path: String,

    /// Subdirectory to leave out of the comparison
    #[arg(long, default_value = "")]
    pub exclude: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Source Nexus address (defaults to the config file)
    #[arg(long, default_value = "")]
    pub source_address: String,

    /// Source repository name
    #[arg(long, default_value = "")]
    pub source_repo: String,

    #[arg(long, default_value = "")]
    pub source_user: String,

    #[arg(long, default_value = "")]
    pub source_pass: String,

    /// Target Nexus address (defaults to the config file)
    #[arg(long, default_value = "")]
    pub target_address: String,

    /// Target repository name
    #[arg(long, default_value = "")]
    pub target_repo: String,

    #[arg(long, default_value = "")]
    pub target_user: String,

    #[arg(long, default_value = "")]
    pub target_pass: String,

    /// Skip files that already exist in the target repository
    #[arg(long)]
    pub skip_existing: bool,

    /// Print progress for every file
    #[arg(long)]
    pub show_progress: bool,
}
