//! TTL 缓存集成测试
//!
//! 覆盖后台回收任务和并发未命中的行为。

use futures_util::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tenure_cache::{CacheConfig, TtlCache, cache_key};

fn config(sweep_secs: u64, coalesce: bool) -> CacheConfig {
    CacheConfig {
        max_entries: 100,
        default_ttl_secs: 10,
        sweep_interval_secs: sweep_secs,
        coalesce_misses: coalesce,
    }
}

#[tokio::test(start_paused = true)]
async fn test_reaper_removes_write_only_keys() {
    let cache: Arc<TtlCache<String>> = TtlCache::start(config(60, true)).unwrap();
    assert!(cache.is_reaper_running());

    cache.set("short", "x".to_string(), Duration::from_secs(30));
    cache.set("long", "y".to_string(), Duration::from_secs(600));

    // 第一次清理在 60s，"short" 已过期
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(cache.len(), 1);
    assert!(cache.contains("long"));
    assert_eq!(cache.metrics().expirations(), 1);

    // 从未读取，不影响命中统计
    assert_eq!(cache.stats().misses, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_sweeping() {
    let cache: Arc<TtlCache<u32>> = TtlCache::start(config(60, true)).unwrap();
    cache.set("k", 1, Duration::from_secs(1));

    cache.stop();
    cache.stop();
    assert!(!cache.is_reaper_running());

    tokio::time::sleep(Duration::from_secs(180)).await;
    // 没有后台清理，条目仍物理存在，但读取时不可见
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("k"), None);
    assert_eq!(cache.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reaper_restart_after_stop() {
    let cache: Arc<TtlCache<u32>> = TtlCache::start(config(10, true)).unwrap();
    cache.stop();
    cache.start_reaper().unwrap();
    assert!(cache.is_reaper_running());

    cache.set("k", 1, Duration::from_secs(1));
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_coalesced_misses_compute_once() {
    let cache: Arc<TtlCache<u64>> = Arc::new(TtlCache::new(config(60, true)));
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks = (0..5).map(|_| {
        let cache = cache.clone();
        let calls = calls.clone();
        tokio::spawn(async move {
            let key = cache_key("profile", &["42"]);
            cache
                .get_or_compute(
                    &key,
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(42)
                    },
                    Duration::from_secs(10),
                )
                .await
        })
    });

    for result in join_all(tasks).await {
        assert_eq!(result.unwrap(), Ok(42));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_uncoalesced_misses_are_weakly_once() {
    let cache: Arc<TtlCache<u64>> = Arc::new(TtlCache::new(config(60, false)));
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks = (0..3).map(|i| {
        let cache = cache.clone();
        let calls = calls.clone();
        tokio::spawn(async move {
            cache
                .get_or_compute(
                    "feed:home",
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(i)
                    },
                    Duration::from_secs(10),
                )
                .await
        })
    });

    let results = join_all(tasks).await;
    assert_eq!(results.len(), 3);
    // 每个并发未命中都各自计算，最后写入者胜出
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(cache.contains("feed:home"));
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_compute_lets_waiter_retry() {
    let cache: Arc<TtlCache<u64>> = Arc::new(TtlCache::new(config(60, true)));
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks = (0..2).map(|_| {
        let cache = cache.clone();
        let calls = calls.clone();
        tokio::spawn(async move {
            cache
                .get_or_compute(
                    "flaky",
                    || async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        if n == 0 { Err("timeout".to_string()) } else { Ok(9) }
                    },
                    Duration::from_secs(10),
                )
                .await
        })
    });

    let mut results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();
    results.sort();
    assert_eq!(results, vec![Ok(9), Err("timeout".to_string())]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.contains("flaky"));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_cache_ends_reaper() {
    let cache: Arc<TtlCache<u32>> = TtlCache::start(config(1, true)).unwrap();
    let weak = Arc::downgrade(&cache);
    drop(cache);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(weak.upgrade().is_none());
}

#[tokio::test]
async fn test_start_rejects_invalid_config() {
    let no_capacity = CacheConfig {
        max_entries: 0,
        ..config(60, true)
    };
    assert!(TtlCache::<u32>::start(no_capacity).is_err());

    // 超长的清理间隔在启动时被拒绝，而不是让回收任务静默退出
    let endless = CacheConfig {
        sweep_interval_secs: u64::MAX,
        ..config(60, true)
    };
    let err = TtlCache::<u32>::start(endless).unwrap_err();
    assert_eq!(err.kind(), tenure_core::TenureErrorKind::Config);
}
