//! 运维面板示例
//!
//! 按配置构建缓存和通道池，模拟几个订阅与数据读取，然后周期打印资源快照。
//!
//! 运行: `RUST_LOG=debug cargo run --example dashboard`

use async_trait::async_trait;
use std::time::Duration;
use tenure::prelude::*;
use tracing_subscriber::EnvFilter;

/// 模拟的实时推送订阅
struct PushSubscription {
    topic: String,
}

#[async_trait]
impl Channel for PushSubscription {
    async fn close(&self) -> tenure::tenure_core::Result<()> {
        tracing::info!(topic = %self.topic, "关闭推送订阅");
        Ok(())
    }
}

async fn open_topic(topic: &str) -> StdResult<PushSubscription, TenureError> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(PushSubscription {
        topic: topic.to_string(),
    })
}

async fn fetch_profile(user: u64) -> StdResult<String, TenureError> {
    tokio::time::sleep(Duration::from_millis(30)).await;
    Ok(format!("user-{}", user))
}

#[tokio::main]
async fn main() -> tenure::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = TenureConfig::default().load_with_env_override()?;
    config.pool.max_connections = 2;
    config.reporter.interval_secs = 1;
    config.validate()?;
    println!("{}", config.summary());

    let cache: Arc<TtlCache<String>> = TtlCache::start(config.cache.clone())?;
    let pool: Arc<ConnectionPool<PushSubscription>> = ConnectionPool::start(config.pool.clone())?;
    let reporter = StatsReporter::new(cache.clone(), pool.clone());
    let mut snapshots = reporter.spawn(config.reporter.interval())?;

    let ids = SubscriberIdGenerator::new();
    let mut subscriptions = Vec::new();
    for topic in ["chat:general", "chat:general", "presence", "typing:7"] {
        let subscription = pool
            .subscribe(topic, || open_topic(topic), ids.next())
            .await?;
        subscriptions.push(subscription);
    }

    for user in [1, 2, 1, 3, 1] {
        let key = cache_key("profile", &[user.to_string()]);
        let profile = cache
            .get_or_compute(&key, || fetch_profile(user), config.cache.default_ttl())
            .await?;
        tracing::info!(%key, %profile, "读取资料");
    }

    // 卸载一半订阅
    subscriptions.truncate(2);

    for _ in 0..3 {
        if snapshots.changed().await.is_err() {
            break;
        }
        println!("{}", snapshots.borrow_and_update().summary());
    }

    reporter.stop();
    cache.stop();
    drop(subscriptions);
    let closed = pool.shutdown().await;
    tracing::info!(closed, "已关闭全部通道");
    Ok(())
}
