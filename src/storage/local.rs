use crate::core::checksum::{hash_file, HashAlgorithm};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// 本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// 相对根目录的路径，统一使用 `/`
    pub relative_path: String,
    pub path: PathBuf,
    pub size: u64,
}

/// 本地目录树
pub struct LocalTree {
    root: PathBuf,
}

impl LocalTree {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// 规范化路径分隔符（统一使用 /）
    fn normalize_path(path: &str) -> String {
        path.replace('\\', "/")
    }

    /// 递归列出所有文件；根是单个文件时只返回它自己（以文件名为键）
    pub async fn list_files(&self) -> io::Result<Vec<LocalFile>> {
        let root = self.root.clone();
        // 使用 spawn_blocking 避免阻塞 async runtime
        tokio::task::spawn_blocking(move || Self::walk(&root))
            .await
            .map_err(io::Error::other)?
    }

    fn walk(root: &Path) -> io::Result<Vec<LocalFile>> {
        let metadata = std::fs::metadata(root)?;

        if !metadata.is_dir() {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Ok(vec![LocalFile {
                relative_path: name,
                path: root.to_path_buf(),
                size: metadata.len(),
            }]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            // 任何一个条目出错都终止整个扫描
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

            files.push(LocalFile {
                relative_path: Self::normalize_path(&relative.to_string_lossy()),
                path: entry.path().to_path_buf(),
                size: entry.metadata()?.len(),
            });
        }

        Ok(files)
    }

    /// 流式计算文件摘要
    pub async fn digest(path: &Path, algorithm: HashAlgorithm) -> io::Result<String> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || hash_file(&path, algorithm))
            .await
            .map_err(io::Error::other)?
    }

    /// 读取整个文件
    pub async fn read(path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    /// 写入整个文件，自动创建父目录
    pub async fn write(path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // 使用临时文件写入，然后原子重命名
        let mut temp_name = path.as_os_str().to_os_string();
        temp_name.push(".part");
        let temp_path = PathBuf::from(temp_name);
        fs::write(&temp_path, data).await?;
        fs::rename(&temp_path, path).await?;

        Ok(())
    }
}
