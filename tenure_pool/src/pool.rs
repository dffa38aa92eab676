//! 通道池
//!
//! 管理一组有上限、按名称共享的长连接通道。每个通道记录其订阅者集合，
//! 第一个订阅者到来时惰性创建，超出容量时淘汰最久未 acquire 的通道，
//! 无订阅者且空闲超过宽限期的通道由后台任务回收。

use crate::channel::Channel;
use crate::metrics::PoolMetrics;
use crate::stats::{ChannelStats, PoolStats};
use crate::subscription::Subscription;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};
use tenure_config::PoolConfig;
use tenure_core::{InflightGates, Reaper, Result, SubscriberId, TenureError};
use tokio::time::Instant;

/// 池中的通道
#[derive(Debug)]
struct PooledChannel<C> {
    /// 底层连接
    handle: Arc<C>,
    /// 最近一次 acquire 的时间（底层连接上的流量不刷新它）
    last_used: Instant,
    /// 订阅者集合
    subscribers: HashSet<SubscriberId>,
    /// acquire 序号，时间相同时决定先后
    seq: u64,
}

impl<C> PooledChannel<C> {
    fn lru_key(&self) -> (Instant, u64) {
        (self.last_used, self.seq)
    }
}

/// 通道池内部存储
#[derive(Debug)]
struct PoolInner<C> {
    /// 通道映射: name -> channel
    channels: HashMap<String, PooledChannel<C>>,
    /// 下一个 acquire 序号
    next_seq: u64,
}

impl<C> PoolInner<C> {
    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// 为新名称腾出位置，返回被移除的通道
    ///
    /// 优先淘汰无订阅者的通道中最久未使用的一个；全部都有订阅者时
    /// 淘汰全局最久未使用的通道，保证插入不会因容量失败。
    fn make_room(&mut self, incoming: &str, max: usize) -> Vec<(String, PooledChannel<C>)> {
        let mut victims = Vec::new();
        if self.channels.contains_key(incoming) {
            return victims;
        }

        while self.channels.len() >= max {
            let idle = self
                .channels
                .iter()
                .filter(|(_, ch)| ch.subscribers.is_empty())
                .min_by_key(|(_, ch)| ch.lru_key())
                .map(|(name, _)| name.clone());

            let victim = match idle {
                Some(name) => name,
                None => match self
                    .channels
                    .iter()
                    .min_by_key(|(_, ch)| ch.lru_key())
                    .map(|(name, _)| name.clone())
                {
                    Some(name) => {
                        tracing::warn!(
                            channel = %name,
                            incoming,
                            "所有通道都有订阅者，淘汰最久未使用的通道"
                        );
                        name
                    }
                    None => break,
                },
            };

            if let Some(channel) = self.channels.remove(&victim) {
                victims.push((victim, channel));
            }
        }

        victims
    }
}

/// 通道池
///
/// 映射的查找、淘汰、插入都在同一把锁内完成；工厂调用与通道关闭
/// 都在锁外进行，关闭总是在簿记完成之后。
#[derive(Debug)]
pub struct ConnectionPool<C> {
    /// 通道池配置
    config: PoolConfig,
    /// 通道存储
    inner: Mutex<PoolInner<C>>,
    /// 累计指标
    metrics: PoolMetrics,
    /// 并发创建合并闸门
    inflight: InflightGates,
    /// 后台回收任务
    reaper: Mutex<Option<Reaper>>,
}

impl<C: Channel> ConnectionPool<C> {
    /// 创建新的通道池（不启动回收任务）
    ///
    /// 不校验配置，调用方应先调用 [`PoolConfig::validate`]。
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(PoolInner {
                channels: HashMap::new(),
                next_seq: 0,
            }),
            metrics: PoolMetrics::new(),
            inflight: InflightGates::new(),
            reaper: Mutex::new(None),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(PoolConfig::default())
    }

    /// 校验配置，创建通道池并启动空闲回收任务
    pub fn start(config: PoolConfig) -> Result<Arc<Self>> {
        config
            .validate()
            .map_err(|e| TenureError::config(e.to_string()))?;
        let pool = Arc::new(Self::new(config));
        pool.start_reaper()?;
        Ok(pool)
    }

    /// 通道池配置
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// 累计指标
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner<C>> {
        // 临界区内不会 panic，中毒的锁可以安全复用
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 获取名为 `name` 的通道并登记订阅者
    ///
    /// 通道已存在时登记订阅者、刷新最近使用时间并返回已有句柄，不调用工厂。
    /// 否则在容量已满时先淘汰一个通道，再调用一次 `factory` 创建并登记。
    /// 工厂的错误原样返回，失败时不登记任何内容。
    pub async fn acquire<F, Fut, E>(
        &self,
        name: &str,
        factory: F,
        subscriber: SubscriberId,
    ) -> std::result::Result<Arc<C>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<C, E>>,
    {
        if let Some(handle) = self.join_existing(name, subscriber) {
            return Ok(handle);
        }

        if !self.config.coalesce_acquires {
            return self.create(name, factory, subscriber).await;
        }

        let _permit = self.inflight.enter(name).await;

        // 排队期间前一个调用方可能已经建好通道
        if let Some(handle) = self.join_existing(name, subscriber) {
            return Ok(handle);
        }

        self.create(name, factory, subscriber).await
    }

    /// 订阅通道，返回在释放时自动 release 的守卫
    pub async fn subscribe<F, Fut, E>(
        self: &Arc<Self>,
        name: &str,
        factory: F,
        subscriber: SubscriberId,
    ) -> std::result::Result<Subscription<C>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<C, E>>,
    {
        let handle = self.acquire(name, factory, subscriber).await?;
        Ok(Subscription::new(self.clone(), name.to_string(), subscriber, handle))
    }

    fn join_existing(&self, name: &str, subscriber: SubscriberId) -> Option<Arc<C>> {
        let now = Instant::now();
        let mut inner = self.lock();
        let seq = inner.bump_seq();
        let channel = inner.channels.get_mut(name)?;
        channel.subscribers.insert(subscriber);
        channel.last_used = now;
        channel.seq = seq;
        self.metrics.record_reused();
        tracing::trace!(channel = name, %subscriber, "复用已有通道");
        Some(channel.handle.clone())
    }

    async fn create<F, Fut, E>(
        &self,
        name: &str,
        factory: F,
        subscriber: SubscriberId,
    ) -> std::result::Result<Arc<C>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<C, E>>,
    {
        let victims = {
            let mut inner = self.lock();
            inner.make_room(name, self.config.max_connections)
        };
        self.evict_all(victims).await;

        let handle = Arc::new(factory().await?);

        let (victims, displaced) = {
            let now = Instant::now();
            let mut inner = self.lock();
            // 工厂执行期间容量可能已被其他名称占用
            let victims = inner.make_room(name, self.config.max_connections);
            let seq = inner.bump_seq();
            let mut subscribers = HashSet::from([subscriber]);
            let displaced = inner.channels.remove(name);
            if let Some(old) = &displaced {
                subscribers.extend(old.subscribers.iter().copied());
            }
            inner.channels.insert(
                name.to_string(),
                PooledChannel {
                    handle: handle.clone(),
                    last_used: now,
                    subscribers,
                    seq,
                },
            );
            (victims, displaced)
        };

        self.metrics.record_created();
        tracing::debug!(channel = name, %subscriber, "创建通道");

        self.evict_all(victims).await;
        if let Some(old) = displaced {
            self.metrics.record_displaced();
            tracing::debug!(channel = name, "并发创建，替换先写入的通道");
            self.teardown(name, old.handle).await;
        }

        Ok(handle)
    }

    async fn evict_all(&self, victims: Vec<(String, PooledChannel<C>)>) {
        for (name, channel) in victims {
            self.metrics.record_evicted();
            tracing::debug!(
                channel = %name,
                subscribers = channel.subscribers.len(),
                "容量已满，淘汰通道"
            );
            self.teardown(&name, channel.handle).await;
        }
    }

    /// 关闭通道，吞掉关闭错误
    async fn teardown(&self, name: &str, handle: Arc<C>) {
        if let Err(e) = handle.close().await {
            self.metrics.record_teardown_failure();
            let e = e.with_context(("channel", name));
            tracing::warn!(error = %e, kind = ?e.kind(), "关闭通道失败，已忽略");
        }
    }

    /// 从通道的订阅者集合中移除 `subscriber`
    ///
    /// 订阅者集合变空时不会立即关闭通道，只有容量淘汰或空闲回收会关闭它。
    pub fn release(&self, name: &str, subscriber: SubscriberId) {
        let mut inner = self.lock();
        if let Some(channel) = inner.channels.get_mut(name) {
            if channel.subscribers.remove(&subscriber) {
                self.metrics.record_released();
                tracing::trace!(
                    channel = name,
                    %subscriber,
                    remaining = channel.subscribers.len(),
                    "释放订阅"
                );
            }
        }
    }

    /// 回收无订阅者且空闲超过宽限期的通道，返回回收数量
    pub async fn reap_idle(&self) -> usize {
        let now = Instant::now();
        let grace = self.config.idle_grace();

        let reaped: Vec<(String, PooledChannel<C>)> = {
            let mut inner = self.lock();
            let idle: Vec<String> = inner
                .channels
                .iter()
                .filter(|(_, ch)| {
                    ch.subscribers.is_empty() && now.saturating_duration_since(ch.last_used) > grace
                })
                .map(|(name, _)| name.clone())
                .collect();
            idle.into_iter()
                .filter_map(|name| inner.channels.remove(&name).map(|ch| (name, ch)))
                .collect()
        };

        let count = reaped.len();
        self.metrics.record_reaped(count as u64);
        for (name, channel) in reaped {
            tracing::debug!(channel = %name, "回收空闲通道");
            self.teardown(&name, channel.handle).await;
        }
        count
    }

    /// 查看通道句柄（不登记订阅者，不刷新使用时间）
    pub fn get(&self, name: &str) -> Option<Arc<C>> {
        self.lock().channels.get(name).map(|ch| ch.handle.clone())
    }

    /// 通道是否存在
    pub fn contains(&self, name: &str) -> bool {
        self.lock().channels.contains_key(name)
    }

    /// 通道的订阅者（按 ID 排序）
    pub fn subscribers(&self, name: &str) -> Option<Vec<SubscriberId>> {
        self.lock().channels.get(name).map(|ch| {
            let mut ids: Vec<SubscriberId> = ch.subscribers.iter().copied().collect();
            ids.sort();
            ids
        })
    }

    /// 活跃通道数
    pub fn len(&self) -> usize {
        self.lock().channels.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 统计快照
    pub fn stats(&self) -> PoolStats {
        let now = Instant::now();
        let inner = self.lock();

        let mut per_channel: Vec<ChannelStats> = inner
            .channels
            .iter()
            .map(|(name, ch)| ChannelStats {
                name: name.clone(),
                subscriber_count: ch.subscribers.len(),
                idle_ms: now.saturating_duration_since(ch.last_used).as_millis() as u64,
            })
            .collect();
        per_channel.sort_by(|a, b| a.name.cmp(&b.name));

        PoolStats {
            active_connections: inner.channels.len(),
            max_connections: self.config.max_connections,
            per_channel,
        }
    }

    /// 启动空闲回收任务（已在运行时不做任何事）
    ///
    /// 回收任务只持有通道池的弱引用，通道池被释放后任务自动结束。
    pub fn start_reaper(self: &Arc<Self>) -> Result<()> {
        let mut slot = self.reaper.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(Reaper::is_running) {
            return Ok(());
        }

        let weak = Arc::downgrade(self);
        let reaper = Reaper::spawn("connection-pool", self.config.sweep_interval(), move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(pool) => ControlFlow::Continue(pool.reap_idle().await),
                    None => ControlFlow::Break(()),
                }
            }
        })?;
        *slot = Some(reaper);
        Ok(())
    }

    /// 回收任务是否在运行
    pub fn is_reaper_running(&self) -> bool {
        self.reaper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(Reaper::is_running)
    }

    /// 停止空闲回收任务（幂等）
    pub fn stop(&self) {
        let reaper = self.reaper.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(reaper) = reaper {
            reaper.stop();
        }
    }

    /// 停止回收任务并关闭所有通道（幂等），返回关闭的通道数
    pub async fn shutdown(&self) -> usize {
        let reaper = self.reaper.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(reaper) = reaper {
            reaper.shutdown().await;
        }

        let drained: Vec<(String, PooledChannel<C>)> = {
            let mut inner = self.lock();
            inner.channels.drain().collect()
        };

        let count = drained.len();
        for (name, channel) in drained {
            self.teardown(&name, channel.handle).await;
        }
        if count > 0 {
            tracing::debug!(count, "通道池关闭");
        }
        count
    }
}

impl<C: Channel> Default for ConnectionPool<C> {
    fn default() -> Self {
        Self::with_defaults()
    }
}
