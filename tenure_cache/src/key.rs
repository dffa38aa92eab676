//! 缓存键构造
//!
//! 调用方按逻辑查询身份拼接确定性的键，`delete_by_prefix(scope)` 使用同一格式。

/// 键分段分隔符
pub const KEY_SEPARATOR: char = ':';

/// 构造 `scope:part1:part2` 形式的缓存键
pub fn cache_key<S: AsRef<str>>(scope: &str, parts: &[S]) -> String {
    let mut key = String::from(scope);
    for part in parts {
        key.push(KEY_SEPARATOR);
        key.push_str(part.as_ref());
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("profile", &["42"]), "profile:42");
        assert_eq!(cache_key("messages", &["room-7", "page-2"]), "messages:room-7:page-2");
        assert_eq!(cache_key::<&str>("trending", &[]), "trending");
    }
}
