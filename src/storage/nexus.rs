use super::{
    AssetStore, BlobStore, BlobStoreConfig, DeleteOutcome, Repository, SearchPage, SoftQuota,
    StoreError, StoreResult,
};
use crate::config::Endpoint;
use crate::core::checksum::{HashAlgorithm, Hasher};
use crate::core::path::normalize;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Nexus REST 客户端
pub struct NexusClient {
    base_url: String,
    /// 用户名和密码都不为空时才有值
    credentials: Option<(String, String)>,
    http: reqwest::Client,
}

impl NexusClient {
    pub fn new(endpoint: &Endpoint, insecure: bool) -> StoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(super::HTTP_TIMEOUT_SECS))
            .danger_accept_invalid_certs(insecure)
            .build()?;

        Ok(Self {
            base_url: endpoint.address.clone(),
            credentials: endpoint
                .has_credentials()
                .then(|| (endpoint.user.clone(), endpoint.password.clone())),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 浏览器中查看仓库（或仓库内目录）的地址
    pub fn browse_url(&self, repository: &str, path: Option<&str>) -> String {
        browse_url(&self.base_url, repository, path)
    }

    fn repository_url(&self, repository: &str, path: &str) -> String {
        format!(
            "{}/repository/{}/{}",
            self.base_url,
            repository,
            encode_repository_path(path.trim_start_matches('/'))
        )
    }

    fn search_url(&self, repository: &str, name: Option<&str>, token: Option<&str>) -> String {
        let mut url = format!(
            "{}/service/rest/v1/search/assets?repository={}",
            self.base_url,
            urlencoding::encode(repository)
        );
        if let Some(name) = name {
            url.push_str("&name=");
            url.push_str(&encode_name_filter(name));
        }
        if let Some(token) = token {
            url.push_str("&continuationToken=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn get_ok(&self, url: &str, action: &'static str) -> StoreResult<Response> {
        let response = self.request(Method::GET, url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(StoreError::Status {
                action,
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

/// 按类型查询到的 blob store 详情
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobStoreDetail {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    soft_quota: Option<SoftQuota>,
}

// ============ Blob store 管理 ============

impl NexusClient {
    fn blob_stores_url(&self) -> String {
        format!("{}/service/rest/v1/blobstores", self.base_url)
    }

    pub async fn list_blob_stores(&self) -> StoreResult<Vec<BlobStore>> {
        let url = self.blob_stores_url();
        debug!("REST API request: {}", url);

        let body = self.get_ok(&url, "blob stores").await?.bytes().await?;
        let stores: Vec<BlobStore> =
            serde_json::from_slice(&body).map_err(|source| StoreError::Decode {
                what: "blob stores",
                source,
            })?;

        info!("找到 {} 个 blob store", stores.len());
        Ok(stores)
    }

    /// 先从列表中确定类型，再按类型读取详情
    pub async fn get_blob_store(&self, name: &str) -> StoreResult<BlobStore> {
        let mut store = self
            .list_blob_stores()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| StoreError::BlobStoreNotFound(name.to_string()))?;

        let kind = store.kind.to_lowercase();
        if !matches!(kind.as_str(), "file" | "s3" | "azure") {
            return Err(StoreError::UnsupportedBlobStore {
                name: name.to_string(),
                kind: store.kind,
            });
        }

        let url = format!(
            "{}/{}/{}",
            self.blob_stores_url(),
            kind,
            urlencoding::encode(name)
        );
        debug!("REST API request: {}", url);

        let response = self.request(Method::GET, &url).send().await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(StoreError::BlobStoreNotFound(name.to_string())),
            other => {
                return Err(StoreError::Status {
                    action: "blob store",
                    status: other.as_u16(),
                })
            }
        }

        let body = response.bytes().await?;
        let detail: BlobStoreDetail =
            serde_json::from_slice(&body).map_err(|source| StoreError::Decode {
                what: "blob store",
                source,
            })?;

        if let Some(path) = detail.path {
            store.path = path;
        }
        if detail.soft_quota.is_some() {
            store.soft_quota = detail.soft_quota;
        }
        Ok(store)
    }

    pub async fn create_blob_store(&self, config: &BlobStoreConfig) -> StoreResult<()> {
        let url = format!(
            "{}/{}",
            self.blob_stores_url(),
            urlencoding::encode(&config.kind)
        );
        debug!("REST API request: {}", url);

        let body = serde_json::to_vec(config).map_err(|source| StoreError::Encode {
            what: "blob store",
            source,
        })?;

        info!("创建 blob store '{}' ({})", config.name, config.kind);
        let response = self
            .request(Method::POST, &url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                action: "create blob store",
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// 浏览地址中目录分隔符写作 `%2F`
pub fn browse_url(base_url: &str, repository: &str, path: Option<&str>) -> String {
    let path = path.map(normalize).unwrap_or_default();
    if path.is_empty() {
        format!("{}/#browse/browse:{}", base_url, repository)
    } else {
        format!(
            "{}/#browse/browse:{}:{}",
            base_url,
            repository,
            path.replace('/', "%2F")
        )
    }
}

/// 仓库路径中的空格和方括号需要转义，其余字符保持原样
pub fn encode_repository_path(path: &str) -> String {
    path.replace(' ', "%20")
        .replace('[', "%5B")
        .replace(']', "%5D")
}

/// 名称过滤：结尾的 `*` 通配符不转义
fn encode_name_filter(name: &str) -> String {
    match name.strip_suffix('*') {
        Some(stem) => format!("{}*", urlencoding::encode(stem)),
        None => urlencoding::encode(name).into_owned(),
    }
}

#[async_trait]
impl AssetStore for NexusClient {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn search_page(
        &self,
        repository: &str,
        name: Option<&str>,
        continuation_token: Option<&str>,
    ) -> StoreResult<SearchPage> {
        let url = self.search_url(repository, name, continuation_token);
        debug!("REST API request: {}", url);

        let body = self.get_ok(&url, "search").await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| StoreError::Decode {
            what: "search",
            source,
        })
    }

    async fn download(&self, download_url: &str) -> StoreResult<Vec<u8>> {
        debug!("下载到内存: {}", download_url);
        let response = self.get_ok(download_url, "download").await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn digest(&self, download_url: &str, algorithm: HashAlgorithm) -> StoreResult<String> {
        debug!("计算远程 {}: {}", algorithm, download_url);
        let response = self.get_ok(download_url, "download").await?;

        let mut hasher = Hasher::new(algorithm);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            hasher.update(&chunk?);
        }
        Ok(hasher.finalize_hex())
    }

    async fn upload(&self, repository: &str, path: &str, content: Vec<u8>) -> StoreResult<()> {
        let url = self.repository_url(repository, path);
        debug!("上传 {} 字节到 {}", content.len(), url);

        let response = self
            .request(Method::PUT, &url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Status {
                action: "upload",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn exists(&self, repository: &str, path: &str) -> StoreResult<bool> {
        let url = self.repository_url(repository, path);
        let response = self.request(Method::HEAD, &url).send().await?;
        Ok(response.status() == StatusCode::OK)
    }

    async fn content_length(&self, repository: &str, path: &str) -> StoreResult<u64> {
        let url = self.repository_url(repository, path);
        let response = self.request(Method::HEAD, &url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(StoreError::Status {
                action: "size lookup",
                status: response.status().as_u16(),
            });
        }

        // HEAD 响应没有 body，直接读取头部
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| StoreError::InvalidContentLength(path.to_string()))
    }

    async fn delete(&self, repository: &str, path: &str) -> StoreResult<DeleteOutcome> {
        let url = self.repository_url(repository, path);
        info!("删除 '{}': {}", path, url);

        let response = self.request(Method::DELETE, &url).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            other => Err(StoreError::Status {
                action: "delete",
                status: other.as_u16(),
            }),
        }
    }

    async fn list_repositories(&self) -> StoreResult<Vec<Repository>> {
        let url = format!("{}/service/rest/v1/repositories", self.base_url);
        debug!("REST API request: {}", url);

        let body = self.get_ok(&url, "repositories").await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| StoreError::Decode {
            what: "repositories",
            source,
        })
    }
}
