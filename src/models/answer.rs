//! 答案显示格式

use regex::Regex;
use std::sync::OnceLock;

const NOTE_MARKER: &str = "Note:";

fn suggestion_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^Suggestion:\s*").expect("valid regex"))
}

/// 拆分后的答案：主答案 + 可选的备注
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedAnswer {
    pub main: String,
    pub note: Option<String>,
}

impl FormattedAnswer {
    /// 解析模型返回的原始答案
    ///
    /// - 从第一个 `Note:` 起的内容作为备注
    /// - 去掉 `**` 加粗标记和开头的 `Suggestion:` 标签
    pub fn parse(raw: &str) -> Self {
        let (main, note) = match raw.find(NOTE_MARKER) {
            Some(idx) => (
                raw[..idx].trim(),
                Some(raw[idx..].trim().to_string()),
            ),
            None => (raw.trim(), None),
        };

        let main = main.replace("**", "");
        let main = suggestion_prefix().replace(&main, "").to_string();

        Self { main, note }
    }
}

impl std::fmt::Display for FormattedAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R: {}", self.main)?;
        if let Some(note) = &self.note {
            write!(f, "\n   {}", note)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_answer() {
        let answer = FormattedAnswer::parse("  Paris ");
        assert_eq!(answer.main, "Paris");
        assert_eq!(answer.note, None);
        assert_eq!(answer.to_string(), "R: Paris");
    }

    #[test]
    fn test_parse_splits_note() {
        let answer = FormattedAnswer::parse("**B. 42** Note: not fully sure");
        assert_eq!(answer.main, "B. 42");
        assert_eq!(answer.note.as_deref(), Some("Note: not fully sure"));
    }

    #[test]
    fn test_parse_strips_suggestion_label() {
        let answer = FormattedAnswer::parse("suggestion:   Lyon");
        assert_eq!(answer.main, "Lyon");
    }
}
