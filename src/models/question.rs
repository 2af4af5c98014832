use serde::{Deserialize, Serialize};
use std::fmt;

/// 题目容器标识
///
/// 对应页面上的一个题目容器元素，处理状态以此为键保存在处理器内部
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 从题目容器中提取出的原始题目
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedQuestion {
    /// 题干
    pub text: String,
    /// 选项（保持页面上的顺序，空选项已被过滤）
    pub options: Vec<String>,
}

impl ExtractedQuestion {
    pub fn new(text: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            text: text.into(),
            options: options
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    pub fn is_open_question(&self) -> bool {
        self.options.is_empty()
    }
}

/// 规范化后的题目身份
///
/// 两次检测当且仅当规范化结果相同时视为同一道题
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuestionIdentity {
    pub normalized_text: String,
    pub normalized_options: Vec<String>,
}

/// 答案缓存键（带命名空间前缀）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub(crate) fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一页表单（TOML 文件）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormPage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<FormQuestion>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

/// 表单中的一个题目容器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormQuestion {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
}
