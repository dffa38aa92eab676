//! 资源统计报告
//!
//! 汇总缓存和通道池的只读快照，供运维面板轮询或订阅。
//! 生成快照不会修改任何计数器。

use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tenure_cache::{CacheStats, TtlCache};
use tenure_core::{Reaper, Result};
use tenure_pool::{Channel, ConnectionPool, PoolStats};
use tokio::sync::watch;

/// 某一时刻的资源快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    /// 缓存统计
    pub cache: CacheStats,
    /// 通道池统计
    pub pool: PoolStats,
    /// 缓存累计容量淘汰数
    pub cache_evictions: u64,
    /// 缓存累计过期删除数
    pub cache_expirations: u64,
    /// 通道累计容量淘汰数
    pub pool_evictions: u64,
    /// 通道累计空闲回收数
    pub pool_reaped: u64,
    /// 通道关闭失败次数
    pub teardown_failures: u64,
}

impl ResourceSnapshot {
    /// 文本报告
    pub fn summary(&self) -> String {
        format!(
            "资源报告:\n\
             - 缓存: {}/{} 条, 命中 {}, 未命中 {}, 命中率 {:.1}%\n\
             - 缓存淘汰: {}, 过期删除: {}\n\
             - 通道: {}/{} 个, 订阅者 {}\n\
             - 通道淘汰: {}, 空闲回收: {}, 关闭失败: {}",
            self.cache.size,
            self.cache.max_entries,
            self.cache.hits,
            self.cache.misses,
            self.cache.hit_rate * 100.0,
            self.cache_evictions,
            self.cache_expirations,
            self.pool.active_connections,
            self.pool.max_connections,
            self.total_subscribers(),
            self.pool_evictions,
            self.pool_reaped,
            self.teardown_failures,
        )
    }

    /// 所有通道的订阅者总数
    pub fn total_subscribers(&self) -> usize {
        self.pool.per_channel.iter().map(|c| c.subscriber_count).sum()
    }
}

/// 缓存与通道池的统计报告器
pub struct StatsReporter<V, C> {
    cache: Arc<TtlCache<V>>,
    pool: Arc<ConnectionPool<C>>,
    publisher: Mutex<Option<Reaper>>,
}

impl<V, C> StatsReporter<V, C>
where
    V: Clone + Send + Sync + 'static,
    C: Channel,
{
    /// 创建报告器
    pub fn new(cache: Arc<TtlCache<V>>, pool: Arc<ConnectionPool<C>>) -> Self {
        Self {
            cache,
            pool,
            publisher: Mutex::new(None),
        }
    }

    /// 被观测的缓存
    pub fn cache(&self) -> &Arc<TtlCache<V>> {
        &self.cache
    }

    /// 被观测的通道池
    pub fn pool(&self) -> &Arc<ConnectionPool<C>> {
        &self.pool
    }

    /// 生成当前快照
    pub fn snapshot(&self) -> ResourceSnapshot {
        collect(&self.cache, &self.pool)
    }

    /// 启动周期发布任务，返回快照订阅端
    ///
    /// 接收端会立即看到一份初始快照，之后每个 `interval` 更新一次。
    /// 所有接收端都被释放，或缓存/通道池被释放后，任务自动结束。
    /// 重复调用会替换之前的发布任务。
    pub fn spawn(&self, interval: Duration) -> Result<watch::Receiver<ResourceSnapshot>> {
        let (tx, rx) = watch::channel(self.snapshot());
        let cache = Arc::downgrade(&self.cache);
        let pool = Arc::downgrade(&self.pool);

        let publisher = Reaper::spawn("stats-reporter", interval, move || {
            let snapshot = match (cache.upgrade(), pool.upgrade()) {
                (Some(cache), Some(pool)) if !tx.is_closed() => Some(collect(&cache, &pool)),
                _ => None,
            };
            let flow = match snapshot {
                Some(snapshot) => {
                    tracing::trace!(
                        cache_size = snapshot.cache.size,
                        channels = snapshot.pool.active_connections,
                        "发布资源快照"
                    );
                    tx.send_replace(snapshot);
                    ControlFlow::Continue(0)
                }
                None => ControlFlow::Break(()),
            };
            async move { flow }
        })?;

        let previous = self
            .publisher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(publisher);
        if let Some(previous) = previous {
            previous.stop();
        }
        Ok(rx)
    }

    /// 发布任务是否在运行
    pub fn is_running(&self) -> bool {
        self.publisher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(Reaper::is_running)
    }

    /// 停止发布任务（幂等）
    pub fn stop(&self) {
        let publisher = self.publisher.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(publisher) = publisher {
            publisher.stop();
        }
    }
}

fn collect<V, C>(cache: &TtlCache<V>, pool: &ConnectionPool<C>) -> ResourceSnapshot
where
    V: Clone + Send + Sync + 'static,
    C: Channel,
{
    let cache_metrics = cache.metrics();
    let pool_metrics = pool.metrics();
    ResourceSnapshot {
        cache: cache.stats(),
        pool: pool.stats(),
        cache_evictions: cache_metrics.evictions(),
        cache_expirations: cache_metrics.expirations(),
        pool_evictions: pool_metrics.evicted(),
        pool_reaped: pool_metrics.reaped(),
        teardown_failures: pool_metrics.teardown_failures(),
    }
}
