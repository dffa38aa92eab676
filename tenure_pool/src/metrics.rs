//! 通道池指标
//!
//! 收集和统计通道生命周期相关的累计指标。

use std::sync::atomic::{AtomicU64, Ordering};

/// 通道池指标
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// 新建通道数（工厂调用成功次数）
    created: AtomicU64,
    /// 复用已有通道的 acquire 次数
    reused: AtomicU64,
    /// release 次数
    released: AtomicU64,
    /// 容量淘汰次数
    evicted: AtomicU64,
    /// 空闲回收次数
    reaped: AtomicU64,
    /// 并发创建时被后写入者替换的通道数
    displaced: AtomicU64,
    /// 关闭失败次数
    teardown_failures: AtomicU64,
}

impl PoolMetrics {
    /// 创建新的通道池指标
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reused(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reaped(&self, count: u64) {
        self.reaped.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_displaced(&self) {
        self.displaced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_teardown_failure(&self) {
        self.teardown_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取新建通道数
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// 获取复用次数
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    /// 获取 release 次数
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    /// 获取容量淘汰次数
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// 获取空闲回收次数
    pub fn reaped(&self) -> u64 {
        self.reaped.load(Ordering::Relaxed)
    }

    /// 获取被替换的通道数
    pub fn displaced(&self) -> u64 {
        self.displaced.load(Ordering::Relaxed)
    }

    /// 获取关闭失败次数
    pub fn teardown_failures(&self) -> u64 {
        self.teardown_failures.load(Ordering::Relaxed)
    }

    /// 生成摘要报告
    pub fn summary(&self) -> String {
        format!(
            "通道池指标:\n\
             - 新建: {}\n\
             - 复用: {}\n\
             - 释放: {}\n\
             - 淘汰: {}\n\
             - 回收: {}\n\
             - 替换: {}\n\
             - 关闭失败: {}",
            self.created(),
            self.reused(),
            self.released(),
            self.evicted(),
            self.reaped(),
            self.displaced(),
            self.teardown_failures()
        )
    }
}
