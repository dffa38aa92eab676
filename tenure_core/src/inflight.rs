//! 按键合并的并发闸门
//!
//! 同一个键上同时只允许一个调用方执行昂贵的创建/计算，后到的调用方
//! 等待前一个完成后再检查结果。缓存的 get-or-compute 与通道池的 acquire
//! 共用此结构。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// 按键的并发闸门集合
#[derive(Debug, Default)]
pub struct InflightGates {
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InflightGates {
    /// 创建空的闸门集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入键对应的闸门，直到之前的持有者离开
    pub async fn enter(&self, key: &str) -> InflightPermit<'_> {
        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
            // 等待者在拿到闸门前被取消时，闸门只剩表内一份引用
            gates.retain(|_, g| Arc::strong_count(g) > 1);
            gates
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = gate.clone().lock_owned().await;
        InflightPermit {
            gates: self,
            key: key.to_string(),
            gate,
            guard: Some(guard),
        }
    }

    /// 当前登记的闸门数量
    pub fn len(&self) -> usize {
        self.gates.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 是否没有任何闸门
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &str, gate: &Arc<AsyncMutex<()>>) {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        // 闸门表与当前持有者各持一份引用时，说明没有等待者
        let idle = gates
            .get(key)
            .is_some_and(|g| Arc::ptr_eq(g, gate) && Arc::strong_count(gate) == 2);
        if idle {
            gates.remove(key);
        }
    }
}

/// 闸门通行证，释放时唤醒下一个等待者
#[derive(Debug)]
pub struct InflightPermit<'a> {
    gates: &'a InflightGates,
    key: String,
    gate: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InflightPermit<'_> {
    /// 闸门对应的键
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InflightPermit<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.gates.release(&self.key, &self.gate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_gate_removed_after_release() {
        let gates = InflightGates::new();
        {
            let permit = gates.enter("feed:home").await;
            assert_eq!(permit.key(), "feed:home");
            assert_eq!(gates.len(), 1);
        }
        assert!(gates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_is_serialized() {
        let gates = Arc::new(InflightGates::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let gates = gates.clone();
            let active = active.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = gates.enter("room:1").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(gates.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak_gate() {
        let gates = Arc::new(InflightGates::new());
        let holder = gates.enter("room:1").await;

        let waiter = {
            let gates = gates.clone();
            tokio::spawn(async move {
                let _permit = gates.enter("room:1").await;
            })
        };
        tokio::task::yield_now().await;

        // 持有者离开时仍有排队者，闸门保留；随后排队者在拿到闸门前被取消
        drop(holder);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(gates.len(), 1);

        let other = gates.enter("room:2").await;
        assert_eq!(gates.len(), 1);
        drop(other);
        assert!(gates.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let gates = InflightGates::new();
        let _a = gates.enter("a").await;
        let _b = gates.enter("b").await;
        assert_eq!(gates.len(), 2);
    }
}
