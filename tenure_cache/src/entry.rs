//! 缓存条目

use std::time::Duration;
use tokio::time::Instant;

/// 缓存条目
///
/// 仅当 `now - created_at <= ttl` 时可见；过期后在逻辑上不存在，
/// 即使在回收前仍然占据存储。
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// 缓存值
    pub value: V,
    /// 创建时间（覆盖写入时重置）
    pub created_at: Instant,
    /// 存活时间
    pub ttl: Duration,
    /// 命中次数
    pub hit_count: u64,
    /// 写入序号，创建时间相同时决定先后
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, ttl: Duration, now: Instant, seq: u64) -> Self {
        Self {
            value,
            created_at: now,
            ttl,
            hit_count: 0,
            seq,
        }
    }

    /// 条目年龄
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// 是否已过期（年龄恰好等于 TTL 时仍然有效）
    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) > self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expiry_boundary() {
        let entry = CacheEntry::new("v", Duration::from_millis(1000), Instant::now(), 0);

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(!entry.is_expired(Instant::now()));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl() {
        let entry = CacheEntry::new(1, Duration::ZERO, Instant::now(), 0);
        assert!(!entry.is_expired(Instant::now()));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired(Instant::now()));
    }
}
