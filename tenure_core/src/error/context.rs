//! 错误上下文
//!
//! 记录出错时涉及的资源，如通道名、缓存键或订阅者。

use std::fmt;

/// 错误涉及的资源字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// 字段名，如 `channel`、`key`
    pub field: &'static str,
    /// 字段值
    pub value: String,
}

impl ErrorContext {
    /// 创建上下文
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.value)
    }
}

impl<V: Into<String>> From<(&'static str, V)> for ErrorContext {
    fn from((field, value): (&'static str, V)) -> Self {
        Self::new(field, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_tuple() {
        let ctx: ErrorContext = ("channel", "room:42").into();
        assert_eq!(ctx, ErrorContext::new("channel", "room:42"));
        assert_eq!(ctx.to_string(), "channel: room:42");
    }

    #[test]
    fn test_context_from_owned_value() {
        let name = format!("typing:{}", 7);
        let ctx: ErrorContext = ("channel", name).into();
        assert_eq!(ctx.field, "channel");
        assert_eq!(ctx.to_string(), "channel: typing:7");
    }
}
