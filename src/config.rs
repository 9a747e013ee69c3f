//! 应用配置模块

use crate::logging::LogConfig;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件名（位于用户主目录）
pub const DEFAULT_CONFIG_FILE: &str = ".nexsync.yaml";

/// 配置文件内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub nexus_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// `~/.nexsync.yaml`，取不到主目录时用当前目录
    pub fn default_path() -> PathBuf {
        crate::dirs::home_dir()
            .map(|home| home.join(DEFAULT_CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// 读取配置；文件不存在时返回默认值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))
    }

    /// 写入配置文件，unix 下权限为 0600
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create '{}'", parent.display()))?;
            }
        }

        let content = serde_yaml_ng::to_string(self).context("failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config file '{}'", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// 用非空的命令行参数覆盖文件中的值
    pub fn merge(&mut self, address: &str, user: &str, password: &str, repository: &str) {
        fn set(field: &mut String, value: &str) {
            if !value.is_empty() {
                *field = value.to_string();
            }
        }

        set(&mut self.nexus_address, address);
        set(&mut self.user, user);
        set(&mut self.password, password);
        set(&mut self.repository, repository);
    }

    /// 得到校验过的连接参数
    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::new(&self.nexus_address, &self.user, &self.password)
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint().map(|_| ())
    }
}

/// 校验过的连接参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// 不带结尾 `/` 的服务地址
    pub address: String,
    pub user: String,
    pub password: String,
}

impl Endpoint {
    pub fn new(address: &str, user: &str, password: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            bail!("Nexus address is required (set nexusAddress in the config file or pass --address)");
        }
        if !(address.starts_with("http://") || address.starts_with("https://")) {
            return Err(anyhow!(
                "Nexus address '{}' must start with http:// or https://",
                address
            ));
        }

        Ok(Self {
            address: address.trim_end_matches(['/', '\\']).to_string(),
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    /// 只有用户名和密码都不为空时才使用认证
    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_validation() {
        let endpoint = Endpoint::new(" https://nexus.example.com/ ", "u", "").unwrap();
        assert_eq!(endpoint.address, "https://nexus.example.com");
        assert!(!endpoint.has_credentials());

        assert!(Endpoint::new("", "u", "p").is_err());
        assert!(Endpoint::new("nexus.example.com", "u", "p").is_err());
        assert!(Endpoint::new("http://localhost:8081", "u", "p")
            .unwrap()
            .has_credentials());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_camel_case_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "nexusAddress: http://nexus:8081\nuser: admin\npassword: secret\nrepository: raw\nlog:\n  level: debug\n  maxSizeMb: 2\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.nexus_address, "http://nexus:8081");
        assert_eq!(config.repository, "raw");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.max_size_mb, 2);
        assert!(config.log.file.is_none());
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "nexusAddress: [unclosed").unwrap();

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_save_round_trip_and_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.yaml");

        let config = AppConfig {
            nexus_address: "https://nexus".to_string(),
            user: "admin".to_string(),
            password: "pw".to_string(),
            ..AppConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(Some(&path)).unwrap(), config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_merge_only_non_empty() {
        let mut config = AppConfig {
            nexus_address: "http://file".to_string(),
            user: "file-user".to_string(),
            ..AppConfig::default()
        };
        config.merge("http://flag", "", "flag-pass", "");

        assert_eq!(config.nexus_address, "http://flag");
        assert_eq!(config.user, "file-user");
        assert_eq!(config.password, "flag-pass");
        assert_eq!(config.repository, "");
    }
}
