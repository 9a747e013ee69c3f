pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod logging;
pub mod storage;

pub use config::{AppConfig, Endpoint};
pub use core::{DiffReport, FileComparator, FileScanner, SyncConfig, SyncEngine, SyncReport};
pub use storage::{AssetStore, NexusClient};

/// 用户目录
pub mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("USERPROFILE").ok().map(PathBuf::from)
        } else {
            std::env::var("HOME").ok().map(PathBuf::from)
        }
    }
}
