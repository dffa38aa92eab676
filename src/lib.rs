//! # Tenure - 有界资源生命周期管理
//!
//! Tenure 管理进程内两类有界资源：带过期时间的计算结果缓存，以及按名称共享、
//! 按订阅者引用计数的长连接通道。两者都由后台周期任务清理，都可以被只读地统计。
//!
//! ## 特性
//!
//! - 读取时惰性过期的 TTL 缓存，容量满时淘汰最旧条目
//! - get-or-compute 合并同一键上的并发未命中
//! - 按订阅者引用计数的通道池，空闲超过宽限期后回收
//! - 统计快照与周期发布，生成快照不修改计数器
//!
//! ## 快速开始
//!
//! ```rust,no_run,ignore
//! use std::time::Duration;
//! use tenure::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> tenure::Result<()> {
//!     let config = TenureConfig::from_file_with_env("tenure.toml")?;
//!     let cache: Arc<TtlCache<String>> = TtlCache::start(config.cache.clone())?;
//!
//!     let profile = cache
//!         .get_or_compute("profile:42", || fetch_profile(42), Duration::from_secs(300))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## 模块组织
//!
//! ### 配置模块
//! - TenureConfig - 全局配置
//! - CacheConfig / PoolConfig / ReporterConfig - 各组件配置
//!
//! ### 核心模块
//! - TenureError - 统一错误类型
//! - Reaper - 周期回收任务
//! - SubscriberId - 订阅者标识
//!
//! ### 缓存模块
//! - TtlCache - TTL 缓存
//! - CacheStats - 缓存统计快照
//!
//! ### 通道池模块
//! - ConnectionPool - 共享订阅通道池
//! - Channel - 通道关闭 trait
//! - Subscription - 订阅守卫
//!
//! ### 统计模块
//! - StatsReporter - 资源统计报告器
//! - ResourceSnapshot - 资源快照

pub mod reporter;

pub use crate::reporter::{ResourceSnapshot, StatsReporter};

// ============================================================================
// Crate Re-exports
// ============================================================================

pub use tenure_cache;
pub use tenure_config;
pub use tenure_core;
pub use tenure_pool;

pub use tenure_cache::{CacheStats, TtlCache, cache_key};
pub use tenure_config::{CacheConfig, ConfigError, PoolConfig, ReporterConfig, TenureConfig};
pub use tenure_core::{Reaper, SubscriberId, SubscriberIdGenerator, TenureError};
pub use tenure_pool::{Channel, ConnectionPool, PoolStats, Subscription};

// ============================================================================
// Prelude Module
// ============================================================================

/// 预导出常用类型
///
/// 通过 `use tenure::prelude::*;` 导入所有常用类型
pub mod prelude {
    pub use std::result::Result as StdResult;
    pub use std::sync::Arc;

    pub use tenure_cache::prelude::*;
    pub use tenure_config::{ConfigError, ReporterConfig, TenureConfig};
    pub use tenure_core::prelude::*;
    pub use tenure_pool::prelude::*;

    pub use crate::reporter::{ResourceSnapshot, StatsReporter};
}

// ============================================================================
// Error Types
// ============================================================================

/// Tenure 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// Tenure 统一错误枚举
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 核心错误
    #[error(transparent)]
    Core(#[from] TenureError),

    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO 错误
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 自定义错误
    #[error("{0}")]
    Custom(String),
}

// ============================================================================
// Version Information
// ============================================================================

/// Tenure 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tenure 包名
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: Error = TenureError::channel("断开").into();
        assert!(matches!(err, Error::Core(_)));
        assert_eq!(err.to_string(), TenureError::channel("断开").to_string());

        let err: Error = ConfigError::Validation("max_entries 不能为 0".into()).into();
        assert!(matches!(err, Error::Config(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件未找到");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_version_info() {
        assert_eq!(NAME, "tenure");
        assert!(!VERSION.is_empty());
    }
}
