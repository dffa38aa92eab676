//! 通道抽象
//!
//! 池中共享的底层连接由调用方提供的工厂创建，池只关心如何关闭它。

use async_trait::async_trait;
use tenure_core::Result;

/// 可被池管理的长连接通道（如实时推送订阅）
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// 关闭底层连接
    ///
    /// 淘汰或回收时调用。返回的错误只会被记录，不会影响池的簿记。
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<T: Channel + ?Sized> Channel for Box<T> {
    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
