//! Tenure 核心类型
//!
//! 提供统一错误类型、订阅者标识，以及缓存和通道池共用的周期回收任务与并发闸门。

pub mod error;
pub mod inflight;
pub mod reaper;
pub mod subscriber;

// 导出主要类型到 crate root
pub use crate::error::{ErrorContext, Result, TenureError, TenureErrorKind};
pub use crate::inflight::{InflightGates, InflightPermit};
pub use crate::reaper::Reaper;
pub use crate::subscriber::{SubscriberId, SubscriberIdGenerator};

// 预导出
pub mod prelude {
    pub use crate::error::{ErrorContext, Result, TenureError, TenureErrorKind};
    pub use crate::reaper::Reaper;
    pub use crate::subscriber::{SubscriberId, SubscriberIdGenerator};
}
