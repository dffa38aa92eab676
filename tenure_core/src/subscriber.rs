//! 订阅者标识
//!
//! 持有共享通道的逻辑调用方使用的不透明标识，以及每个挂载点使用的生成器。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 订阅者唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// 创建新的订阅者 ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

impl From<u64> for SubscriberId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// 订阅者 ID 生成器
#[derive(Debug)]
pub struct SubscriberIdGenerator {
    next_id: AtomicU64,
}

impl SubscriberIdGenerator {
    /// 创建新的生成器
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// 生成下一个 ID
    pub fn next(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_id() {
        let id1 = SubscriberId::new(1);
        let id2 = SubscriberId::from(2);
        assert_ne!(id1, id2);
        assert_eq!(id1.value(), 1);
        assert_eq!(id2.to_string(), "sub-2");
    }

    #[test]
    fn test_id_generator() {
        let generator = SubscriberIdGenerator::new();
        let id1 = generator.next();
        let id2 = generator.next();
        assert_eq!(id1.value(), 1);
        assert_eq!(id2.value(), 2);
    }
}
