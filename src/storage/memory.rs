//! 内存仓库，仅用于测试：记录每一次调用，便于断言网络开销

use super::{Asset, AssetStore, DeleteOutcome, Repository, SearchPage, StoreError, StoreResult};
use crate::core::checksum::{hash_bytes, HashAlgorithm};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct CallLog {
    pub searches: usize,
    pub downloads: usize,
    pub digests: usize,
    pub uploads: Vec<String>,
    pub exists_checks: usize,
    pub size_lookups: usize,
    pub deletes: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    checksum: Option<HashMap<String, String>>,
}

pub struct MemoryStore {
    name: String,
    page_size: usize,
    repos: Mutex<HashMap<String, BTreeMap<String, StoredFile>>>,
    calls: Mutex<CallLog>,
    report_all_existing: bool,
    fail_exists: bool,
    fail_size: bool,
    fail_upload: Option<String>,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            page_size: 50,
            repos: Mutex::new(HashMap::new()),
            calls: Mutex::new(CallLog::default()),
            report_all_existing: false,
            fail_exists: false,
            fail_size: false,
            fail_upload: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_file(self, repository: &str, path: &str, content: &[u8]) -> Self {
        self.insert(repository, path, content.to_vec(), None);
        self
    }

    pub fn with_reported_file(
        self,
        repository: &str,
        path: &str,
        content: &[u8],
        checksums: &[(&str, &str)],
    ) -> Self {
        let checksum = checksums
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.insert(repository, path, content.to_vec(), Some(checksum));
        self
    }

    pub fn with_repository(self, repository: &str) -> Self {
        self.repos
            .lock()
            .unwrap()
            .entry(repository.to_string())
            .or_default();
        self
    }

    pub fn reporting_all_existing(mut self) -> Self {
        self.report_all_existing = true;
        self
    }

    pub fn failing_exists(mut self) -> Self {
        self.fail_exists = true;
        self
    }

    pub fn failing_size_lookups(mut self) -> Self {
        self.fail_size = true;
        self
    }

    pub fn failing_upload(mut self, path: &str) -> Self {
        self.fail_upload = Some(path.to_string());
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().unwrap().clone()
    }

    pub fn content(&self, repository: &str, path: &str) -> Option<Vec<u8>> {
        self.repos
            .lock()
            .unwrap()
            .get(repository)
            .and_then(|files| files.get(path))
            .map(|f| f.content.clone())
    }

    pub fn paths(&self, repository: &str) -> Vec<String> {
        self.repos
            .lock()
            .unwrap()
            .get(repository)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn insert(
        &self,
        repository: &str,
        path: &str,
        content: Vec<u8>,
        checksum: Option<HashMap<String, String>>,
    ) {
        self.repos
            .lock()
            .unwrap()
            .entry(repository.to_string())
            .or_default()
            .insert(path.to_string(), StoredFile { content, checksum });
    }

    fn download_url(repository: &str, path: &str) -> String {
        format!("mem://{}/{}", repository, path)
    }

    fn lookup_url(&self, download_url: &str) -> StoreResult<Vec<u8>> {
        let rest = download_url
            .strip_prefix("mem://")
            .ok_or_else(|| StoreError::NotFound(download_url.to_string()))?;
        let (repository, path) = rest
            .split_once('/')
            .ok_or_else(|| StoreError::NotFound(download_url.to_string()))?;
        self.content(repository, path)
            .ok_or_else(|| StoreError::Status {
                action: "download",
                status: 404,
            })
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search_page(
        &self,
        repository: &str,
        name: Option<&str>,
        continuation_token: Option<&str>,
    ) -> StoreResult<SearchPage> {
        self.calls.lock().unwrap().searches += 1;

        let repos = self.repos.lock().unwrap();
        let files = repos.get(repository).ok_or(StoreError::Status {
            action: "search",
            status: 404,
        })?;

        let matching: Vec<Asset> = files
            .iter()
            .filter(|(path, _)| match name {
                Some(filter) => match filter.strip_suffix('*') {
                    Some(prefix) => path.starts_with(prefix),
                    None => path.as_str() == filter,
                },
                None => true,
            })
            .map(|(path, file)| Asset {
                path: path.clone(),
                download_url: Self::download_url(repository, path),
                checksum: file.checksum.clone(),
            })
            .collect();

        let page: usize = continuation_token
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let start = page * self.page_size;
        let end = (start + self.page_size).min(matching.len());
        let items = matching.get(start..end).unwrap_or_default().to_vec();
        let continuation_token = (end < matching.len()).then(|| format!("page-{}", page + 1));

        Ok(SearchPage {
            items,
            continuation_token,
        })
    }

    async fn download(&self, download_url: &str) -> StoreResult<Vec<u8>> {
        self.calls.lock().unwrap().downloads += 1;
        self.lookup_url(download_url)
    }

    async fn digest(&self, download_url: &str, algorithm: HashAlgorithm) -> StoreResult<String> {
        self.calls.lock().unwrap().digests += 1;
        let content = self.lookup_url(download_url)?;
        Ok(hash_bytes(algorithm, &content))
    }

    async fn upload(&self, repository: &str, path: &str, content: Vec<u8>) -> StoreResult<()> {
        self.calls.lock().unwrap().uploads.push(path.to_string());
        if self.fail_upload.as_deref() == Some(path) {
            return Err(StoreError::Status {
                action: "upload",
                status: 500,
            });
        }
        self.insert(repository, path, content, None);
        Ok(())
    }

    async fn exists(&self, repository: &str, path: &str) -> StoreResult<bool> {
        self.calls.lock().unwrap().exists_checks += 1;
        if self.fail_exists {
            return Err(StoreError::Status {
                action: "existence check",
                status: 503,
            });
        }
        Ok(self.report_all_existing || self.content(repository, path).is_some())
    }

    async fn content_length(&self, repository: &str, path: &str) -> StoreResult<u64> {
        self.calls.lock().unwrap().size_lookups += 1;
        if self.fail_size {
            return Err(StoreError::InvalidContentLength(path.to_string()));
        }
        self.content(repository, path)
            .map(|c| c.len() as u64)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn delete(&self, repository: &str, path: &str) -> StoreResult<DeleteOutcome> {
        self.calls.lock().unwrap().deletes.push(path.to_string());
        let removed = self
            .repos
            .lock()
            .unwrap()
            .get_mut(repository)
            .and_then(|files| files.remove(path));
        Ok(if removed.is_some() {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn list_repositories(&self) -> StoreResult<Vec<Repository>> {
        let mut names: Vec<String> = self.repos.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| Repository {
                name,
                format: "raw".to_string(),
                kind: "hosted".to_string(),
                url: String::new(),
            })
            .collect())
    }
}
