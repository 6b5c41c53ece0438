use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_JWT_SECRET;
use crate::errors::{LinkVaultError, Result};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 单次请求存储操作的超时上限（秒）
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Which storage backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    File,
    Database,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File => write!(f, "file"),
            Self::Database => write!(f, "database"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "database" | "db" => Ok(Self::Database),
            _ => Err(format!(
                "Invalid storage backend: '{}'. Valid: memory, file, database",
                s
            )),
        }
    }
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 监听地址与对外 base URL
/// - storage: 存储后端选择
/// - auth: 匿名会话 JWT 设置
/// - features: 短码生成
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：LV，分隔符：__
    /// 示例：LV__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("LV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| LinkVaultError::config(format!("Failed to build config: {}", e)))?;

        let config = settings
            .try_deserialize::<StaticConfig>()
            .map_err(|e| LinkVaultError::config(format!("Failed to deserialize config: {}", e)))?;

        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.random_code_length == 0 {
            return Err(LinkVaultError::config(
                "features.random_code_length must be greater than zero",
            ));
        }
        if self.features.key_attempts == 0 {
            return Err(LinkVaultError::config(
                "features.key_attempts must be greater than zero",
            ));
        }
        if self.storage.request_timeout_secs == 0
            || self.storage.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
        {
            return Err(LinkVaultError::config(format!(
                "storage.request_timeout_secs must be between 1 and {}",
                MAX_REQUEST_TIMEOUT_SECS
            )));
        }
        if self.auth.token_days <= 0 {
            return Err(LinkVaultError::config("auth.token_days must be positive"));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(LinkVaultError::config("auth.jwt_secret must not be empty"));
        }
        if self.storage.backend == BackendKind::File && self.storage.file_path.is_empty() {
            return Err(LinkVaultError::config(
                "storage.file_path is required for the file backend",
            ));
        }
        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 生成短链接时使用的前缀
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_file_path")]
    pub file_path: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// 匿名会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_carrier")]
    pub cookie_name: String,
    #[serde(default = "default_token_carrier")]
    pub metadata_key: String,
    #[serde(default = "default_token_days")]
    pub token_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_random_code_length")]
    pub random_code_length: usize,
    /// 短码冲突时的最大重试次数
    #[serde(default = "default_key_attempts")]
    pub key_attempts: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_file_path() -> String {
    "links.jsonl".to_string()
}

fn default_database_url() -> String {
    "sqlite://links.db?mode=rwc".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_carrier() -> String {
    "token".to_string()
}

fn default_token_days() -> i64 {
    30
}

fn default_random_code_length() -> usize {
    8
}

fn default_key_attempts() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            base_url: default_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            file_path: default_file_path(),
            database_url: default_database_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            cookie_name: default_token_carrier(),
            metadata_key: default_token_carrier(),
            token_days: default_token_days(),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            random_code_length: default_random_code_length(),
            key_attempts: default_key_attempts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StaticConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.auth.token_days, 30);
        assert_eq!(config.auth.cookie_name, "token");
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("FILE".parse::<BackendKind>().unwrap(), BackendKind::File);
        assert_eq!("db".parse::<BackendKind>().unwrap(), BackendKind::Database);
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_zero_key_length_rejected() {
        let mut config = StaticConfig::default();
        config.features.random_code_length = 0;
        assert!(matches!(config.validate(), Err(LinkVaultError::Config(_))));
    }

    #[test]
    fn test_sample_config_round_trips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[storage]"));
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.features.random_code_length, 8);
    }
}
