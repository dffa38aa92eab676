//! Tenure 共享订阅通道池
//!
//! 按名称共享的长连接通道（实时推送订阅）的有界集合：
//!
//! - 按订阅者引用计数，第一个订阅者到来时惰性创建
//! - 超出容量时淘汰最久未 acquire 的通道
//! - 无订阅者且空闲超过宽限期的通道由后台任务回收
//! - 关闭失败只记录，不影响簿记

pub mod channel;
pub mod metrics;
pub mod pool;
pub mod stats;
pub mod subscription;

// 导出主要类型到 crate root
pub use crate::channel::Channel;
pub use crate::metrics::PoolMetrics;
pub use crate::pool::ConnectionPool;
pub use crate::stats::{ChannelStats, PoolStats};
pub use crate::subscription::Subscription;
pub use tenure_config::PoolConfig;
pub use tenure_core::{SubscriberId, SubscriberIdGenerator};

// 预导出
pub mod prelude {
    pub use crate::channel::Channel;
    pub use crate::pool::ConnectionPool;
    pub use crate::stats::PoolStats;
    pub use crate::subscription::Subscription;
    pub use tenure_config::PoolConfig;
    pub use tenure_core::{SubscriberId, SubscriberIdGenerator};
}
