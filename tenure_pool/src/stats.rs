//! 通道池统计快照

use serde::Serialize;

/// 单个通道的统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// 通道名
    pub name: String,
    /// 订阅者数量
    pub subscriber_count: usize,
    /// 距上次 acquire 的时间（毫秒）
    pub idle_ms: u64,
}

/// 通道池统计快照，从实时状态重新计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// 活跃通道数
    pub active_connections: usize,
    /// 最大通道数
    pub max_connections: usize,
    /// 按名称排序的通道统计
    pub per_channel: Vec<ChannelStats>,
}
