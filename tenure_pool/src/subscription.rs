//! 订阅守卫
//!
//! 挂载时 acquire、卸载时 release 的 RAII 封装。

use crate::channel::Channel;
use crate::pool::ConnectionPool;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tenure_core::SubscriberId;

/// 通道订阅守卫，释放时自动从通道的订阅者集合中移除自己
pub struct Subscription<C: Channel> {
    pool: Arc<ConnectionPool<C>>,
    name: String,
    subscriber: SubscriberId,
    handle: Arc<C>,
}

impl<C: Channel> Subscription<C> {
    pub(crate) fn new(
        pool: Arc<ConnectionPool<C>>,
        name: String,
        subscriber: SubscriberId,
        handle: Arc<C>,
    ) -> Self {
        Self {
            pool,
            name,
            subscriber,
            handle,
        }
    }

    /// 通道名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 订阅者 ID
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// 共享的通道句柄
    pub fn handle(&self) -> &Arc<C> {
        &self.handle
    }
}

impl<C: Channel> Deref for Subscription<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.handle
    }
}

impl<C: Channel> Drop for Subscription<C> {
    fn drop(&mut self) {
        self.pool.release(&self.name, self.subscriber);
    }
}

impl<C: Channel> fmt::Debug for Subscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("subscriber", &self.subscriber)
            .finish()
    }
}
