//! 周期回收任务
//!
//! 缓存与通道池共用的后台定时清理任务。任务归组件实例所有，
//! 可显式停止，停止操作是幂等的。

use crate::{Result, TenureError};
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// 周期回收任务句柄
///
/// 每个周期调用一次清理闭包。闭包返回 `ControlFlow::Continue(n)` 表示本轮
/// 回收了 `n` 个条目，返回 `ControlFlow::Break(())` 表示被清理的组件已经
/// 不存在，任务随即结束。
///
/// 一轮清理一旦开始就会完整执行，取消只在两轮之间生效。
#[derive(Debug)]
pub struct Reaper {
    /// 任务名称（用于日志）
    name: &'static str,
    /// 取消令牌
    token: CancellationToken,
    /// 后台任务句柄
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Reaper {
    /// 启动回收任务
    ///
    /// 第一次清理发生在启动后一个 `period` 处。必须在 Tokio 运行时内调用。
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut sweep: F) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<(), usize>> + Send + 'static,
    {
        if period.is_zero() {
            return Err(TenureError::validation(format!(
                "回收任务 {} 的周期不能为 0",
                name
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TenureError::config(format!("回收任务 {} 需要 Tokio 运行时: {}", name, e)))?;

        let first_tick = Instant::now().checked_add(period).ok_or_else(|| {
            TenureError::validation(format!("回收任务 {} 的周期过大: {:?}", name, period))
        })?;

        let token = CancellationToken::new();
        let child = token.clone();

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(reaper = name, period_ms = period.as_millis() as u64, "回收任务启动");

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => match sweep().await {
                        ControlFlow::Continue(0) => {}
                        ControlFlow::Continue(count) => {
                            tracing::debug!(reaper = name, count, "回收了过期条目");
                        }
                        ControlFlow::Break(()) => break,
                    },
                }
            }

            tracing::debug!(reaper = name, "回收任务结束");
        });

        Ok(Self {
            name,
            token,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// 任务名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 任务是否仍在运行
    pub fn is_running(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 停止任务（幂等）
    ///
    /// 先取消定时器，再释放任务句柄；正在进行的一轮清理会执行完毕。
    pub fn stop(&self) {
        self.token.cancel();
        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }

    /// 停止任务并等待其退出（幂等）
    pub async fn shutdown(&self) {
        self.token.cancel();
        let handle = {
            let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(reaper = self.name, error = %e, "回收任务异常退出");
            }
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_reaper(period: Duration) -> (Reaper, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let reaper = Reaper::spawn("test", period, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(0)
            }
        })
        .unwrap();
        (reaper, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_ticks_each_period() {
        let (reaper, ticks) = counting_reaper(Duration::from_secs(10));
        assert!(reaper.is_running());

        // 启动时不立即清理
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let (reaper, ticks) = counting_reaper(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        reaper.stop();
        reaper.stop();
        reaper.shutdown().await;
        assert!(!reaper.is_running());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_ends_task() {
        let reaper = Reaper::spawn("detached", Duration::from_secs(1), || async {
            ControlFlow::Break(())
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert!(!reaper.is_running());
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let result = Reaper::spawn("zero", Duration::ZERO, || async { ControlFlow::Continue(0) });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_overflowing_period_rejected() {
        let result = Reaper::spawn("forever", Duration::MAX, || async { ControlFlow::Continue(0) });
        assert!(matches!(result, Err(TenureError::Validation(_))));
    }

    #[test]
    fn test_spawn_outside_runtime_fails() {
        let result = Reaper::spawn("orphan", Duration::from_secs(1), || async {
            ControlFlow::Continue(0)
        });
        assert!(matches!(result, Err(TenureError::Config(_))));
    }
}
