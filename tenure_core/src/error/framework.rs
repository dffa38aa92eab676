//! Tenure 核心错误类型
//!
//! 定义缓存、通道池与配置层共享的错误类型。

use super::context::ErrorContext;
use std::io;
use thiserror::Error;

/// Tenure 核心错误类型
#[derive(Error, Debug)]
pub enum TenureError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 通道错误（建立或关闭底层连接失败）
    #[error("通道错误: {0}")]
    Channel(String),

    /// 计算错误（取值函数失败）
    #[error("计算错误: {0}")]
    Compute(String),

    /// 验证错误
    #[error("验证失败: {0}")]
    Validation(String),

    /// 带上下文的错误
    #[error("{0} ({1})")]
    WithContext(#[source] Box<TenureError>, ErrorContext),
}

impl TenureError {
    /// 获取错误类型
    pub fn kind(&self) -> TenureErrorKind {
        match self {
            TenureError::Io(_) => TenureErrorKind::Io,
            TenureError::Config(_) => TenureErrorKind::Config,
            TenureError::Channel(_) => TenureErrorKind::Channel,
            TenureError::Compute(_) => TenureErrorKind::Compute,
            TenureError::Validation(_) => TenureErrorKind::Validation,
            TenureError::WithContext(inner, _) => inner.kind(),
        }
    }

    /// 添加上下文信息
    pub fn with_context<C>(self, context: C) -> Self
    where
        C: Into<ErrorContext>,
    {
        TenureError::WithContext(Box::new(self), context.into())
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        TenureError::Config(msg.into())
    }

    /// 创建通道错误
    pub fn channel(msg: impl Into<String>) -> Self {
        TenureError::Channel(msg.into())
    }

    /// 创建计算错误
    pub fn compute(msg: impl Into<String>) -> Self {
        TenureError::Compute(msg.into())
    }

    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        TenureError::Validation(msg.into())
    }
}

/// 错误类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenureErrorKind {
    /// IO 错误
    Io,
    /// 配置错误
    Config,
    /// 通道错误
    Channel,
    /// 计算错误
    Compute,
    /// 验证错误
    Validation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TenureError::channel("socket closed");
        assert!(matches!(err, TenureError::Channel(_)));
        assert_eq!(err.kind(), TenureErrorKind::Channel);
        assert_eq!(err.to_string(), "通道错误: socket closed");
    }

    #[test]
    fn test_context_keeps_inner_kind() {
        let err = TenureError::compute("upstream 503").with_context(("key", "feed:home"));
        assert!(matches!(err, TenureError::WithContext(_, _)));
        assert_eq!(err.kind(), TenureErrorKind::Compute);
        assert_eq!(err.to_string(), "计算错误: upstream 503 (key: feed:home)");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "管道已断开");
        let err: TenureError = io_err.into();
        assert_eq!(err.kind(), TenureErrorKind::Io);
    }
}
