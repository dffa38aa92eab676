//! TTL 缓存
//!
//! 带过期时间的键值存储。容量满时按创建时间淘汰最旧的条目，
//! 读取时惰性删除过期条目，后台回收任务定期清理从未被读取的过期条目。

use crate::entry::CacheEntry;
use crate::metrics::CacheMetrics;
use crate::stats::{CacheEntryStats, CacheStats};
use std::collections::HashMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tenure_config::CacheConfig;
use tenure_core::{InflightGates, Reaper, Result, TenureError};
use tokio::time::Instant;

/// 缓存内部存储
#[derive(Debug)]
struct CacheInner<V> {
    /// 条目映射: key -> entry
    entries: HashMap<String, CacheEntry<V>>,
    /// 下一个写入序号
    next_seq: u64,
}

impl<V> CacheInner<V> {
    /// 淘汰创建时间最早的条目
    fn evict_oldest(&mut self) -> Option<String> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.created_at, entry.seq))
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&victim);
        Some(victim)
    }
}

/// TTL 缓存
///
/// 所有对映射的修改都在同一把锁内完成，查找、淘汰、插入彼此原子。
/// 锁从不跨越 `.await` 持有。
#[derive(Debug)]
pub struct TtlCache<V> {
    /// 缓存配置
    config: CacheConfig,
    /// 条目存储
    inner: Mutex<CacheInner<V>>,
    /// 累计指标
    metrics: CacheMetrics,
    /// 未命中合并闸门
    inflight: InflightGates,
    /// 后台回收任务
    reaper: Mutex<Option<Reaper>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// 创建新的缓存（不启动回收任务）
    ///
    /// 不校验配置，调用方应先调用 [`CacheConfig::validate`]。
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(config.max_entries.min(1024)),
                next_seq: 0,
            }),
            config,
            metrics: CacheMetrics::new(),
            inflight: InflightGates::new(),
            reaper: Mutex::new(None),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// 校验配置，创建缓存并启动后台回收任务
    pub fn start(config: CacheConfig) -> Result<Arc<Self>> {
        config
            .validate()
            .map_err(|e| TenureError::config(e.to_string()))?;
        let cache = Arc::new(Self::new(config));
        cache.start_reaper()?;
        Ok(cache)
    }

    /// 缓存配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 累计指标
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        // 临界区内不会 panic，中毒的锁可以安全复用
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 读取缓存值
    ///
    /// 有效条目计为命中并增加其命中次数；不存在或已过期计为未命中，
    /// 过期条目会被就地删除。
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.metrics.record_miss();
                return None;
            }
        };

        if expired {
            inner.entries.remove(key);
            self.metrics.record_expirations(1);
            self.metrics.record_miss();
            tracing::trace!(key, "读取时删除过期条目");
            return None;
        }

        let entry = inner.entries.get_mut(key)?;
        entry.hit_count += 1;
        self.metrics.record_hit();
        Some(entry.value.clone())
    }

    /// 写入缓存值
    ///
    /// 新键在容量已满时先淘汰创建时间最早的一个条目再插入；
    /// 覆盖已有键不占用额外容量，并重置其创建时间和 TTL。
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let mut inner = self.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.config.max_entries {
            if let Some(victim) = inner.evict_oldest() {
                self.metrics.record_eviction();
                tracing::debug!(victim = %victim, incoming = %key, "缓存已满，淘汰最旧条目");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(key, CacheEntry::new(value, ttl, now, seq));
        self.metrics.record_insert();
    }

    /// 使用配置的默认 TTL 写入
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.config.default_ttl());
    }

    /// 读取缓存值，未命中时调用 `compute` 计算并写入
    ///
    /// `compute` 的错误原样返回，失败时不写入任何内容。
    /// 开启 `coalesce_misses` 时，同一键上并发的未命中会排队等待，
    /// 前一个调用成功写入后，后续调用直接返回缓存值；前一个调用失败时，
    /// 下一个等待者会自行重新计算。
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
        ttl: Duration,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        if !self.config.coalesce_misses {
            return self.compute_and_store(key, compute, ttl).await;
        }

        let _permit = self.inflight.enter(key).await;

        // 排队期间可能已有其他调用方写入
        if let Some(value) = self.peek(key) {
            return Ok(value);
        }

        self.compute_and_store(key, compute, ttl).await
    }

    async fn compute_and_store<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
        ttl: Duration,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        self.metrics.record_compute();
        let value = compute().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// 读取有效值，不计入命中/未命中统计
    fn peek(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// 键是否存在且未过期（不影响统计）
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// 删除键（无论是否过期）
    pub fn delete(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// 删除所有以 `prefix` 开头的键，返回删除数量
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - inner.entries.len();
        if removed > 0 {
            tracing::debug!(prefix, removed, "按前缀删除缓存条目");
        }
        removed
    }

    /// 清空所有条目，累计指标保留
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        removed
    }

    /// 物理存储的条目数（可能包含尚未回收的过期条目）
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清理所有已过期的条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - inner.entries.len();
        self.metrics.record_expirations(removed as u64);
        removed
    }

    /// 统计快照
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let inner = self.lock();

        let mut entries: Vec<CacheEntryStats> = inner
            .entries
            .iter()
            .map(|(key, entry)| CacheEntryStats {
                key: key.clone(),
                age_ms: entry.age(now).as_millis() as u64,
                ttl_ms: entry.ttl.as_millis() as u64,
                hit_count: entry.hit_count,
                expired: entry.is_expired(now),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            size: inner.entries.len(),
            max_entries: self.config.max_entries,
            hits: self.metrics.hits(),
            misses: self.metrics.misses(),
            hit_rate: self.metrics.hit_rate(),
            entries,
        }
    }

    /// 启动后台回收任务（已在运行时不做任何事）
    ///
    /// 回收任务只持有缓存的弱引用，缓存被释放后任务自动结束。
    pub fn start_reaper(self: &Arc<Self>) -> Result<()> {
        let mut slot = self.reaper.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(Reaper::is_running) {
            return Ok(());
        }

        let weak = Arc::downgrade(self);
        let reaper = Reaper::spawn("ttl-cache", self.config.sweep_interval(), move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(cache) => ControlFlow::Continue(cache.purge_expired()),
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

    /// 停止后台回收任务（幂等）
    pub fn stop(&self) {
        let reaper = self.reaper.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(reaper) = reaper {
            reaper.stop();
        }
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::with_defaults()
    }
}
