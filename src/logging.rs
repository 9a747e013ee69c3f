//! 日志模块 - 终端日志，可选的文件日志和大小管理

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
    /// 额外写入的日志文件
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// 最大日志文件大小（MB）
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u32,
}

fn default_max_size_mb() -> u32 {
    5 // 默认 5MB
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
            max_size_mb: default_max_size_mb(),
        }
    }
}

impl LogConfig {
    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }

    /// 命令行开关优先：-q 降到 warn，-v 升到 debug
    pub fn effective_level(&self, quiet: bool, verbose: bool) -> tracing::Level {
        if verbose {
            tracing::Level::DEBUG
        } else if quiet {
            tracing::Level::WARN
        } else {
            self.tracing_level()
        }
    }
}

/// 带大小限制的日志写入器，超过上限时轮转为 `<file>.old`
#[derive(Clone)]
pub struct SizeRotatingWriter {
    file_path: PathBuf,
    max_size: u64,
    writer: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl SizeRotatingWriter {
    pub fn new(file_path: &Path, max_size_mb: u32) -> io::Result<Self> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let max_size = (max_size_mb.max(1) as u64) * 1024 * 1024;
        let writer = Self::open_file(file_path, max_size)?;

        Ok(Self {
            file_path: file_path.to_path_buf(),
            max_size,
            writer: Arc::new(Mutex::new(Some(writer))),
        })
    }

    fn open_file(file_path: &Path, max_size: u64) -> io::Result<BufWriter<File>> {
        // 检查现有文件大小，如果超过限制则轮转
        if Self::over_limit(file_path, max_size) {
            Self::rotate_log(file_path)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(BufWriter::new(file))
    }

    fn over_limit(file_path: &Path, max_size: u64) -> bool {
        fs::metadata(file_path)
            .map(|m| m.len() > max_size)
            .unwrap_or(false)
    }

    fn backup_path(file_path: &Path) -> PathBuf {
        let mut name = file_path.as_os_str().to_os_string();
        name.push(".old");
        PathBuf::from(name)
    }

    /// 轮转日志文件
    fn rotate_log(file_path: &Path) -> io::Result<()> {
        let backup_path = Self::backup_path(file_path);

        // 如果备份已存在，删除它
        if backup_path.exists() {
            fs::remove_file(&backup_path)?;
        }

        fs::rename(file_path, &backup_path)
    }

    fn lock(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        // 写日志的线程 panic 后仍然继续使用同一个文件
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rotate_if_needed(&self) -> io::Result<()> {
        if !Self::over_limit(&self.file_path, self.max_size) {
            return Ok(());
        }

        let mut guard = self.lock();
        if let Some(mut w) = guard.take() {
            let _ = w.flush();
        }
        Self::rotate_log(&self.file_path)?;
        *guard = Some(Self::open_file(&self.file_path, self.max_size)?);
        Ok(())
    }
}

/// 日志写入器包装
pub struct LogWriter {
    inner: SizeRotatingWriter,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = {
            let mut guard = self.inner.lock();
            match guard.as_mut() {
                Some(writer) => {
                    let n = writer.write(buf)?;
                    writer.flush()?;
                    n
                }
                None => return Err(io::Error::other("Writer not available")),
            }
        };

        let _ = self.inner.rotate_if_needed();
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.lock().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SizeRotatingWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: self.clone(),
        }
    }
}

/// 构建日志过滤器；`RUST_LOG` 优先
fn build_filter(level: tracing::Level) -> Result<EnvFilter> {
    Ok(EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?))
}

/// 初始化日志系统：终端输出到 stderr，配置了文件时同时写文件
pub fn init_logging(config: &LogConfig, quiet: bool, verbose: bool) -> Result<()> {
    let level = config.effective_level(quiet, verbose);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let file_layer = match &config.file {
        Some(path) => {
            let writer = SizeRotatingWriter::new(path, config.max_size_mb)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(build_filter(level)?)
        .with(console_layer)
        .with(file_layer);

    // 已经初始化过（例如测试中）时忽略
    let _ = tracing::subscriber::set_global_default(subscriber);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        let config = LogConfig {
            level: "error".to_string(),
            ..LogConfig::default()
        };
        assert_eq!(config.effective_level(false, false), tracing::Level::ERROR);
        assert_eq!(config.effective_level(true, false), tracing::Level::WARN);
        assert_eq!(config.effective_level(true, true), tracing::Level::DEBUG);
        assert_eq!(LogConfig::default().tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_writer_rotates_to_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nexsync.log");

        let writer = SizeRotatingWriter::new(&path, 1).unwrap();
        let chunk = vec![b'x'; 600 * 1024];
        let mut w = writer.make_writer();
        w.write_all(&chunk).unwrap();
        w.write_all(&chunk).unwrap();
        w.write_all(b"after\n").unwrap();
        w.flush().unwrap();

        let backup = dir.path().join("logs/nexsync.log.old");
        assert!(backup.exists());
        assert_eq!(fs::metadata(&backup).unwrap().len(), 1200 * 1024);
        assert_eq!(fs::read(&path).unwrap(), b"after\n");
    }
}
