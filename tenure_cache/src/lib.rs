//! Tenure TTL 缓存
//!
//! 带过期时间窗口的计算结果/远程数据缓存：
//!
//! - 读取时惰性过期，后台定期清理
//! - 容量满时按创建时间淘汰最旧条目，插入永不因容量失败
//! - get-or-compute 可选地合并同一键上的并发未命中
//! - 命中/未命中统计与只读快照

pub mod cache;
pub mod entry;
pub mod key;
pub mod metrics;
pub mod stats;

// 导出主要类型到 crate root
pub use crate::cache::TtlCache;
pub use crate::entry::CacheEntry;
pub use crate::key::cache_key;
pub use crate::metrics::CacheMetrics;
pub use crate::stats::{CacheEntryStats, CacheStats};
pub use tenure_config::CacheConfig;

// 预导出
pub mod prelude {
    pub use crate::cache::TtlCache;
    pub use crate::key::cache_key;
    pub use crate::stats::CacheStats;
    pub use tenure_config::CacheConfig;
}
