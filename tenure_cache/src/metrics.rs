//! 缓存指标
//!
//! 收集和统计缓存访问相关的累计指标。

use std::sync::atomic::{AtomicU64, Ordering};

/// 缓存指标
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// 命中次数
    hits: AtomicU64,
    /// 未命中次数
    misses: AtomicU64,
    /// 写入次数（含覆盖）
    inserts: AtomicU64,
    /// 容量淘汰次数
    evictions: AtomicU64,
    /// 过期删除次数（读取时惰性删除与后台清理）
    expirations: AtomicU64,
    /// 取值函数调用次数
    computes: AtomicU64,
}

impl CacheMetrics {
    /// 创建新的缓存指标
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_compute(&self) {
        self.computes.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取命中次数
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// 获取未命中次数
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// 获取写入次数
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// 获取淘汰次数
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// 获取过期删除次数
    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// 获取取值函数调用次数
    pub fn computes(&self) -> u64 {
        self.computes.load(Ordering::Relaxed)
    }

    /// 命中率，尚无访问时为 0
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> String {
        format!(
            "缓存指标:\n\
             - 命中: {}\n\
             - 未命中: {}\n\
             - 命中率: {:.1}%\n\
             - 写入: {}\n\
             - 淘汰: {}\n\
             - 过期: {}\n\
             - 计算: {}",
            self.hits(),
            self.misses(),
            self.hit_rate() * 100.0,
            self.inserts(),
            self.evictions(),
            self.expirations(),
            self.computes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.hits(), 0);
        assert_eq!(metrics.misses(), 0);
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        assert_eq!(metrics.hit_rate(), 0.75);
    }

    #[test]
    fn test_metrics_summary() {
        let metrics = CacheMetrics::new();
        metrics.record_eviction();
        metrics.record_expirations(3);
        let summary = metrics.summary();
        assert!(summary.contains("缓存指标"));
        assert!(summary.contains("淘汰: 1"));
        assert!(summary.contains("过期: 3"));
    }
}
