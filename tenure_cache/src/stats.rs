//! 缓存统计快照

use serde::Serialize;

/// 单个条目的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryStats {
    /// 键
    pub key: String,
    /// 年龄（毫秒）
    pub age_ms: u64,
    /// TTL（毫秒）
    pub ttl_ms: u64,
    /// 命中次数
    pub hit_count: u64,
    /// 是否已过期但尚未回收
    pub expired: bool,
}

/// 缓存统计快照，从实时状态重新计算
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// 当前存储的条目数（可能包含尚未回收的过期条目）
    pub size: usize,
    /// 最大条目数
    pub max_entries: usize,
    /// 累计命中
    pub hits: u64,
    /// 累计未命中
    pub misses: u64,
    /// hits / (hits + misses)，无访问时为 0
    pub hit_rate: f64,
    /// 按键排序的条目统计
    pub entries: Vec<CacheEntryStats>,
}
