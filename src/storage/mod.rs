pub mod local;
#[cfg(test)]
pub(crate) mod memory;
pub mod nexus;

use crate::core::checksum::HashAlgorithm;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

pub use local::{LocalFile, LocalTree};
pub use nexus::NexusClient;

// ============ 公共常量 ============

/// 单个请求超时（秒）- 文件整体读入内存，大文件需要足够时间
pub const HTTP_TIMEOUT_SECS: u64 = 30 * 60;

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{action} request failed with status {status}")]
    Status { action: &'static str, status: u16 },
    #[error("failed to decode {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {what} request: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("file '{0}' not found in repository")]
    NotFound(String),
    #[error("invalid content length for '{0}'")]
    InvalidContentLength(String),
    #[error("{action} request failed with status {status}: {body}")]
    Rejected {
        action: &'static str,
        status: u16,
        body: String,
    },
    #[error("blob store '{0}' not found")]
    BlobStoreNotFound(String),
    #[error("unsupported blob store type '{kind}' for blob store '{name}'")]
    UnsupportedBlobStore { name: String, kind: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 仓库中的单个文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub download_url: String,
    /// 算法名 -> 十六进制摘要，服务端可能只给出一部分
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<HashMap<String, String>>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// 搜索接口的一页结果
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub items: Vec<Asset>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

impl SearchPage {
    /// 下一页的游标；空串与 null 都表示最后一页
    pub fn next_token(&self) -> Option<&str> {
        self.continuation_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// 仓库描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub format: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
}

/// Blob store 描述；详情接口只补充 path 与 softQuota
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobStore {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub available_space_in_bytes: u64,
    #[serde(default)]
    pub total_size_in_bytes: u64,
    #[serde(default)]
    pub blob_count: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_quota: Option<SoftQuota>,
}

/// 创建 blob store 的请求体
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobStoreConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_quota: Option<SoftQuota>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftQuota {
    pub limit: u64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// 删除结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// 远程制品仓库抽象
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;

    /// 请求一页搜索结果。`name` 为名称过滤（可带结尾 `*` 通配）
    async fn search_page(
        &self,
        repository: &str,
        name: Option<&str>,
        continuation_token: Option<&str>,
    ) -> StoreResult<SearchPage>;

    /// 列出前缀下（含前缀本身）的全部文件，跟随游标直到最后一页
    async fn list_assets(&self, repository: &str, prefix: &str) -> StoreResult<Vec<Asset>> {
        let prefix = prefix.trim_end_matches('/');
        let name_filter = (!prefix.is_empty()).then(|| format!("{}/*", prefix));
        let match_prefix = prefix.trim_start_matches('/');

        let mut assets = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .search_page(repository, name_filter.as_deref(), token.as_deref())
                .await?;
            pages += 1;

            let next = page.next_token().map(str::to_string);
            assets.extend(
                page.items
                    .into_iter()
                    .filter(|asset| asset.path.trim_start_matches('/').starts_with(match_prefix)),
            );

            match next {
                Some(t) => token = Some(t),
                None => break,
            }
        }

        debug!("搜索共 {} 页", pages);
        info!(
            "{}: 在 '{}' 中找到 {} 个文件",
            self.name(),
            if prefix.is_empty() { repository } else { prefix },
            assets.len()
        );
        Ok(assets)
    }

    /// 按精确路径查找单个文件
    async fn find_asset(&self, repository: &str, path: &str) -> StoreResult<Asset> {
        let page = self.search_page(repository, Some(path), None).await?;
        page.items
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    /// 读取整个文件
    async fn download(&self, download_url: &str) -> StoreResult<Vec<u8>>;

    /// 边下载边计算摘要
    async fn digest(&self, download_url: &str, algorithm: HashAlgorithm) -> StoreResult<String>;

    /// 写入整个文件
    async fn upload(&self, repository: &str, path: &str, content: Vec<u8>) -> StoreResult<()>;

    /// 检查文件是否存在
    async fn exists(&self, repository: &str, path: &str) -> StoreResult<bool>;

    /// 文件大小
    async fn content_length(&self, repository: &str, path: &str) -> StoreResult<u64>;

    async fn delete(&self, repository: &str, path: &str) -> StoreResult<DeleteOutcome>;

    async fn list_repositories(&self) -> StoreResult<Vec<Repository>>;
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn test_search_page_tokens() {
        let last: SearchPage =
            serde_json::from_str(r#"{"items": [], "continuationToken": null}"#).unwrap();
        assert_eq!(last.next_token(), None);

        let empty: SearchPage =
            serde_json::from_str(r#"{"items": [], "continuationToken": ""}"#).unwrap();
        assert_eq!(empty.next_token(), None);

        let more: SearchPage = serde_json::from_str(
            r#"{"items": [{"path": "a.txt", "downloadUrl": null}], "continuationToken": "abc"}"#,
        )
        .unwrap();
        assert_eq!(more.next_token(), Some("abc"));
        assert_eq!(more.items[0].download_url, "");
        assert!(more.items[0].checksum.is_none());
    }

    #[tokio::test]
    async fn test_list_assets_follows_every_page() {
        let store = MemoryStore::new("mem")
            .with_page_size(2)
            .with_file("repo", "dist/a.txt", b"a")
            .with_file("repo", "dist/b.txt", b"b")
            .with_file("repo", "dist/sub/c.txt", b"c");

        let assets = store.list_assets("repo", "").await.unwrap();
        let mut paths: Vec<_> = assets.iter().map(|a| a.path.as_str()).collect();
        paths.sort();

        assert_eq!(paths, vec!["dist/a.txt", "dist/b.txt", "dist/sub/c.txt"]);
        assert_eq!(store.calls().searches, 2);
    }

    #[tokio::test]
    async fn test_list_assets_keeps_prefix_only() {
        let store = MemoryStore::new("mem")
            .with_file("repo", "releases/v1/app.bin", b"1")
            .with_file("repo", "releases/v1/docs/readme.md", b"2")
            .with_file("repo", "releases/v2/app.bin", b"3");

        let assets = store.list_assets("repo", "releases/v1/").await.unwrap();
        assert_eq!(assets.len(), 2);
        assert!(assets.iter().all(|a| a.path.starts_with("releases/v1")));
    }

    #[tokio::test]
    async fn test_find_asset_missing() {
        let store = MemoryStore::new("mem").with_file("repo", "a.txt", b"a");
        let err = store.find_asset("repo", "b.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(p) if p == "b.txt"));
    }
}
