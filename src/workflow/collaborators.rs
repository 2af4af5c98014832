//! 外部协作者接口
//!
//! 页面抓取和答案展示都不属于核心，这里只定义接口和两个简单实现

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use tracing::info;

use crate::models::answer::FormattedAnswer;
use crate::models::question::{ContainerId, ExtractedQuestion, FormPage};

/// 题目来源
pub trait QuestionSource: Send + Sync {
    /// 当前可检测到的题目容器
    fn detect_candidates(&self) -> Vec<ContainerId>;

    /// 从容器中提取题干和选项
    fn extract(&self, container: &ContainerId) -> ExtractedQuestion;
}

/// 答案展示
pub trait AnswerDisplay: Send + Sync {
    /// 容器中是否已经显示了答案
    fn is_shown(&self, container: &ContainerId) -> bool;

    /// 显示答案；已显示时必须什么都不做
    fn show(&self, container: &ContainerId, answer: &str);
}

/// 基于 TOML 表单页的题目来源
pub struct TomlQuestionSource {
    order: Vec<ContainerId>,
    questions: BTreeMap<ContainerId, ExtractedQuestion>,
}

impl TomlQuestionSource {
    pub fn new(page: &FormPage) -> Self {
        let mut order = Vec::new();
        let mut questions = BTreeMap::new();
        for q in &page.questions {
            let id = ContainerId::new(q.id.clone());
            // 重复的 id 以第一次出现为准
            if let Entry::Vacant(slot) = questions.entry(id.clone()) {
                slot.insert(ExtractedQuestion::new(q.text.clone(), q.options.clone()));
                order.push(id);
            }
        }
        Self { order, questions }
    }
}

impl QuestionSource for TomlQuestionSource {
    fn detect_candidates(&self) -> Vec<ContainerId> {
        self.order.clone()
    }

    fn extract(&self, container: &ContainerId) -> ExtractedQuestion {
        self.questions.get(container).cloned().unwrap_or_default()
    }
}

/// 控制台展示：把答案打到日志里，并记住已展示的容器
#[derive(Default)]
pub struct ConsoleDisplay {
    shown: Mutex<HashSet<ContainerId>>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown_count(&self) -> usize {
        self.shown.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl AnswerDisplay for ConsoleDisplay {
    fn is_shown(&self, container: &ContainerId) -> bool {
        self.shown
            .lock()
            .map(|s| s.contains(container))
            .unwrap_or(false)
    }

    fn show(&self, container: &ContainerId, answer: &str) {
        let Ok(mut shown) = self.shown.lock() else {
            return;
        };
        if !shown.insert(container.clone()) {
            return;
        }
        let formatted = FormattedAnswer::parse(answer);
        info!("💡 [{}] R: {}", container, formatted.main);
        if let Some(note) = &formatted.note {
            info!("   [{}] {}", container, note);
        }
    }
}
