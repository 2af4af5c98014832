//! 响应解码 - 业务能力层
//!
//! 服务的返回格式并不保证稳定，这里按以下顺序尝试：
//! 1. 结构化的 `candidates[0].content.parts[*].text`
//! 2. 结构化的 `error` 对象 → 失败（不可重试的内容错误）
//! 3. 纯文本（不是以 `<` 开头的 HTML 错误页）
//!
//! 返回 `None` 表示没有得到可用的答案，调用方按内容错误处理。

use serde_json::Value as JsonValue;
use tracing::debug;

/// 服务返回的原始负载
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Text(String),
    Structured(JsonValue),
}

impl From<&str> for RawPayload {
    fn from(text: &str) -> Self {
        RawPayload::Text(text.to_string())
    }
}

impl From<String> for RawPayload {
    fn from(text: String) -> Self {
        RawPayload::Text(text)
    }
}

impl From<JsonValue> for RawPayload {
    fn from(value: JsonValue) -> Self {
        RawPayload::Structured(value)
    }
}

/// 从原始负载中提取答案文本
pub fn decode(raw: impl Into<RawPayload>) -> Option<String> {
    let raw = raw.into();

    let parsed = match &raw {
        RawPayload::Text(text) => serde_json::from_str::<JsonValue>(text).ok(),
        RawPayload::Structured(value) => Some(value.clone()),
    };

    if let Some(json) = &parsed {
        if let Some(parts) = candidate_parts(json) {
            let text = parts
                .iter()
                .map(|p| p.get("text").and_then(JsonValue::as_str).unwrap_or(""))
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            return non_empty(text);
        }

        if let Some(error) = json.get("error") {
            debug!("服务返回 error 对象: {}", error);
            return None;
        }
    }

    match raw {
        RawPayload::Text(text) if !text.trim_start().starts_with('<') => {
            non_empty(text.trim().to_string())
        }
        _ => None,
    }
}

fn candidate_parts(json: &JsonValue) -> Option<&Vec<JsonValue>> {
    json.get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
