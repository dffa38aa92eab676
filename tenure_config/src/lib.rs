//! 配置管理系统
//!
//! 缓存、通道池与统计上报的构造参数，支持 TOML 文件和环境变量覆盖。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析配置文件失败: {0}")]
    Parse(String),

    /// 验证错误
    #[error("配置验证失败: {0}")]
    Validation(String),

    /// 环境变量错误
    #[error("环境变量解析失败: {0}")]
    EnvVar(String),
}

/// 配置 Result 类型
pub type Result<T> = std::result::Result<T, ConfigError>;

/// 清理间隔、宽限期与上报间隔的上限（秒），即 30 天
pub const MAX_INTERVAL_SECS: u64 = 30 * 24 * 3600;

fn check_interval(field: &str, secs: u64) -> Result<()> {
    if secs > MAX_INTERVAL_SECS {
        return Err(ConfigError::Validation(format!(
            "{} ({}s) 超过上限 {}s",
            field, secs, MAX_INTERVAL_SECS
        )));
    }
    Ok(())
}

/// TTL 缓存配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 最大条目数（硬上限）
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// 调用方未指定时使用的默认 TTL（秒）
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// 过期清理间隔（秒）
    #[serde(default = "default_cache_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// 是否合并同一 key 的并发未命中计算
    #[serde(default = "default_coalesce")]
    pub coalesce_misses: bool,
}

/// 通道池配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// 最大通道数
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// 无订阅者通道的空闲宽限期（秒），必须大于清理间隔
    #[serde(default = "default_idle_grace")]
    pub idle_grace_secs: u64,

    /// 空闲清理间隔（秒）
    #[serde(default = "default_pool_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// 是否合并同名通道的并发创建
    #[serde(default = "default_coalesce")]
    pub coalesce_acquires: bool,
}

/// 统计上报配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// 快照间隔（秒）
    #[serde(default = "default_reporter_interval")]
    pub interval_secs: u64,
}

/// 完整配置
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TenureConfig {
    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 通道池配置
    #[serde(default)]
    pub pool: PoolConfig,

    /// 统计上报配置
    #[serde(default)]
    pub reporter: ReporterConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            default_ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_cache_sweep_interval(),
            coalesce_misses: default_coalesce(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            idle_grace_secs: default_idle_grace(),
            sweep_interval_secs: default_pool_sweep_interval(),
            coalesce_acquires: default_coalesce(),
        }
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reporter_interval(),
        }
    }
}

impl CacheConfig {
    /// 默认 TTL
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// 清理间隔
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// 验证缓存配置
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(ConfigError::Validation("缓存最大条目数不能为 0".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation("缓存清理间隔不能为 0".to_string()));
        }
        check_interval("缓存清理间隔", self.sweep_interval_secs)
    }
}

impl PoolConfig {
    /// 空闲宽限期
    pub fn idle_grace(&self) -> Duration {
        Duration::from_secs(self.idle_grace_secs)
    }

    /// 清理间隔
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// 验证通道池配置
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(ConfigError::Validation("最大通道数不能为 0".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation("通道池清理间隔不能为 0".to_string()));
        }
        if self.idle_grace_secs <= self.sweep_interval_secs {
            return Err(ConfigError::Validation(format!(
                "空闲宽限期 ({}s) 必须大于清理间隔 ({}s)",
                self.idle_grace_secs, self.sweep_interval_secs
            )));
        }
        check_interval("通道池清理间隔", self.sweep_interval_secs)?;
        check_interval("空闲宽限期", self.idle_grace_secs)
    }
}

impl ReporterConfig {
    /// 快照间隔
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl TenureConfig {
    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从环境变量加载配置并覆盖
    ///
    /// 支持的环境变量：
    /// - TENURE_CACHE_MAX_ENTRIES: 缓存最大条目数
    /// - TENURE_CACHE_DEFAULT_TTL_SECS: 默认 TTL（秒）
    /// - TENURE_CACHE_SWEEP_INTERVAL_SECS: 缓存清理间隔（秒）
    /// - TENURE_POOL_MAX_CONNECTIONS: 最大通道数
    /// - TENURE_POOL_IDLE_GRACE_SECS: 空闲宽限期（秒）
    /// - TENURE_POOL_SWEEP_INTERVAL_SECS: 通道池清理间隔（秒）
    /// - TENURE_REPORTER_INTERVAL_SECS: 统计快照间隔（秒）
    pub fn load_with_env_override(mut self) -> Result<Self> {
        if let Some(v) = env_parse("TENURE_CACHE_MAX_ENTRIES")? {
            self.cache.max_entries = v;
        }
        if let Some(v) = env_parse("TENURE_CACHE_DEFAULT_TTL_SECS")? {
            self.cache.default_ttl_secs = v;
        }
        if let Some(v) = env_parse("TENURE_CACHE_SWEEP_INTERVAL_SECS")? {
            self.cache.sweep_interval_secs = v;
        }
        if let Some(v) = env_parse("TENURE_POOL_MAX_CONNECTIONS")? {
            self.pool.max_connections = v;
        }
        if let Some(v) = env_parse("TENURE_POOL_IDLE_GRACE_SECS")? {
            self.pool.idle_grace_secs = v;
        }
        if let Some(v) = env_parse("TENURE_POOL_SWEEP_INTERVAL_SECS")? {
            self.pool.sweep_interval_secs = v;
        }
        if let Some(v) = env_parse("TENURE_REPORTER_INTERVAL_SECS")? {
            self.reporter.interval_secs = v;
        }
        Ok(self)
    }

    /// 从文件加载并应用环境变量覆盖
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file(path)?.load_with_env_override()
    }

    /// 验证配置是否有效
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.pool.validate()?;
        if self.reporter.interval_secs == 0 {
            return Err(ConfigError::Validation("统计快照间隔不能为 0".to_string()));
        }
        check_interval("统计快照间隔", self.reporter.interval_secs)
    }

    /// 获取配置摘要信息
    pub fn summary(&self) -> String {
        format!(
            "Tenure 配置:\n  缓存: 最大 {} 条, 默认 TTL {}s, 清理间隔 {}s\n  通道池: 最大 {} 个, 宽限期 {}s, 清理间隔 {}s\n  上报间隔: {}s",
            self.cache.max_entries,
            self.cache.default_ttl_secs,
            self.cache.sweep_interval_secs,
            self.pool.max_connections,
            self.pool.idle_grace_secs,
            self.pool.sweep_interval_secs,
            self.reporter.interval_secs
        )
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVar(format!("{} 必须是有效的非负整数", name))),
        Err(_) => Ok(None),
    }
}

// 默认值函数
fn default_max_entries() -> usize {
    500
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_cache_sweep_interval() -> u64 {
    60
}

fn default_max_connections() -> usize {
    10
}

fn default_idle_grace() -> u64 {
    120
}

fn default_pool_sweep_interval() -> u64 {
    30
}

fn default_reporter_interval() -> u64 {
    15
}

fn default_coalesce() -> bool {
    true
}
