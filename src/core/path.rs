//! 路径规范化与排除过滤

use std::collections::HashMap;
use tracing::warn;

/// 去掉首尾空白，反斜杠转为 `/`，去掉首尾的 `/`
pub fn normalize(path: &str) -> String {
    path.trim().replace('\\', "/").trim_matches('/').to_string()
}

/// 路径最后一段
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// 把仓库路径转换为相对 root 的键
///
/// 路径等于 root 时返回 root 的最后一段；不在 root 之下时原样返回。
pub fn relativize(asset_path: &str, root: &str) -> String {
    let root = normalize(root);
    let asset_path = asset_path.replace('\\', "/");
    if root.is_empty() {
        return asset_path;
    }

    let trimmed = asset_path.trim_start_matches('/');
    if trimmed == root {
        return base_name(trimmed).to_string();
    }

    match trimmed.strip_prefix(&format!("{}/", root)) {
        Some(rest) => rest.to_string(),
        None => asset_path,
    }
}

/// 去掉 `exclude/` 之下的所有条目；与 exclude 完全相同的键保留
pub fn filter_excluded<V>(entries: HashMap<String, V>, exclude: &str) -> HashMap<String, V> {
    if exclude.is_empty() {
        return entries;
    }

    let prefix = format!("{}/", exclude);
    entries
        .into_iter()
        .filter(|(key, _)| !key.starts_with(&prefix))
        .collect()
}

/// 把排除路径换算到 root 之下的相对键；既可传仓库全路径也可传相对路径
///
/// exclude 等于 root 本身时不排除任何文件（只记录警告），返回值原样保留。
pub fn exclusion_key(exclude: &str, root: &str) -> String {
    let exclude = normalize(exclude);
    let root = normalize(root);
    if root.is_empty() {
        return exclude;
    }
    if exclude == root {
        warn!("排除路径 '{}' 与比较路径相同，不会排除任何文件", exclude);
        return exclude;
    }

    match exclude.strip_prefix(&format!("{}/", root)) {
        Some(rest) => rest.to_string(),
        None => exclude,
    }
}

/// 把 source 放到 root 之下；source 已经位于 root 之下时原样使用
pub fn join_under_root(root: &str, source: &str) -> String {
    let root = normalize(root);
    let source = normalize(source);
    if root.is_empty() || source == root || source.starts_with(&format!("{}/", root)) {
        return source;
    }
    join_repo_path(&[&root, &source])
}

/// 拼接仓库路径片段，忽略空片段
pub fn join_repo_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| normalize(p))
        .map(|p| p.trim_start_matches("./").to_string())
        .filter(|p| !p.is_empty() && p != ".")
        .collect::<Vec<_>>()
        .join("/")
}
