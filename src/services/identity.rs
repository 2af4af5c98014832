//! 题目身份规范化 - 业务能力层
//!
//! (题干, 选项) → 稳定的缓存键。纯函数，没有失败路径。

use sha2::{Digest, Sha256};

use crate::models::question::{CacheKey, QuestionIdentity};

/// 缓存键命名空间前缀
pub const CACHE_NAMESPACE: &str = "fas_gemini_v2_cache_";

/// 去掉首尾空白、折叠内部空白并转小写
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 计算题目身份
///
/// 选项逐个规范化，保持原有顺序
pub fn identity_of(text: &str, options: &[String]) -> QuestionIdentity {
    QuestionIdentity {
        normalized_text: normalize_text(text),
        normalized_options: options.iter().map(|o| normalize_text(o)).collect(),
    }
}

impl QuestionIdentity {
    /// 由身份派生缓存键
    ///
    /// 每个字段以长度前缀写入摘要，字段内容无论包含什么字符都不会与分隔产生歧义
    pub fn cache_key(&self) -> CacheKey {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, &self.normalized_text);
        hasher.update((self.normalized_options.len() as u64).to_le_bytes());
        for option in &self.normalized_options {
            write_field(&mut hasher, option);
        }
        CacheKey::from_raw(format!("{}{}", CACHE_NAMESPACE, hex::encode(hasher.finalize())))
    }
}

fn write_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// 一步得到缓存键
pub fn normalize(text: &str, options: &[String]) -> CacheKey {
    identity_of(text, options).cache_key()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  What   is\n\t2+2? "), "what is 2+2?");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_key_ignores_case_and_whitespace() {
        assert_eq!(
            normalize("  Capital  of FRANCE? ", &opts(&[" Paris", "LYON  "])),
            normalize("capital of france?", &opts(&["paris", "lyon"]))
        );
        assert_eq!(
            normalize("  Q  ", &opts(&["A", "a"])),
            normalize("q", &opts(&["a", "A"]))
        );
    }

    #[test]
    fn test_key_depends_on_option_order() {
        assert_ne!(
            normalize("q", &opts(&["a", "b"])),
            normalize("q", &opts(&["b", "a"]))
        );
    }

    #[test]
    fn test_key_is_unambiguous_across_field_boundaries() {
        assert_ne!(
            normalize("a||b", &[]),
            normalize("a", &opts(&["b"]))
        );
        assert_ne!(
            normalize("q", &opts(&["a||b"])),
            normalize("q", &opts(&["a", "b"]))
        );
    }

    #[test]
    fn test_key_is_namespaced_and_stable() {
        let key = normalize("What is 2+2?", &[]);
        assert!(key.as_str().starts_with(CACHE_NAMESPACE));
        assert_eq!(key.as_str().len(), CACHE_NAMESPACE.len() + 64);
        assert_eq!(key, normalize("what is 2+2?", &[]));
        assert_ne!(key, normalize("What is 2+3?", &[]));
    }
}
