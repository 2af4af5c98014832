//! 提示词构建 - 业务能力层

use crate::config::Config;
use crate::models::question::ExtractedQuestion;
use crate::models::request::{GenerateRequest, GenerationConfig};

const SYSTEM_INSTRUCTION: &str = "You are a helpful quiz assistant. Answer succinctly. \
You MUST only respond with the answer text, no conversational text.";

const CHOICE_INSTRUCTION: &str = "INSTRUCTION: Select the best option from the list above. \
Return ONLY the exact text of the correct option. If multiple are correct, separate with commas. \
If uncertain, append a short 'Note:' at the end.";

const OPEN_INSTRUCTION: &str = "INSTRUCTION: This is an open question. \
Provide a short, factual answer. If uncertain, add a 'Note:' sentence.";

/// 构建完整提示词
///
/// 有选项时附带编号列表并要求原样返回选项文本，否则按开放题处理
pub fn build_prompt(question: &ExtractedQuestion) -> String {
    let user_prompt = if question.is_open_question() {
        format!("QUESTION:\n{}\n\n{}", question.text, OPEN_INSTRUCTION)
    } else {
        let options = question
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}. {}", i + 1, o))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "QUESTION:\n{}\n\nOPTIONS:\n{}\n\n{}",
            question.text, options, CHOICE_INSTRUCTION
        )
    };

    format!("{}\n\n{}", SYSTEM_INSTRUCTION, user_prompt)
}

/// 提示词 + 生成参数 → 请求体
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    generation_config: GenerationConfig,
}

impl PromptBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
        }
    }

    pub fn build_request(&self, question: &ExtractedQuestion) -> GenerateRequest {
        GenerateRequest::from_prompt(build_prompt(question), self.generation_config.clone())
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_question_prompt() {
        let prompt = build_prompt(&ExtractedQuestion::new("What is 2+2?", vec![]));
        assert!(prompt.starts_with(SYSTEM_INSTRUCTION));
        assert!(prompt.contains("QUESTION:\nWhat is 2+2?"));
        assert!(prompt.contains("This is an open question"));
        assert!(!prompt.contains("OPTIONS:"));
    }

    #[test]
    fn test_choice_prompt_enumerates_options_in_order() {
        let question = ExtractedQuestion::new(
            "Capital of France?",
            vec!["Lyon".to_string(), "Paris".to_string()],
        );
        let prompt = build_prompt(&question);
        assert!(prompt.contains("OPTIONS:\n1. Lyon\n2. Paris"));
        assert!(prompt.contains("Return ONLY the exact text of the correct option"));
        assert!(!prompt.contains("open question"));
    }

    #[test]
    fn test_build_request_uses_generation_config() {
        let request = PromptBuilder::default()
            .build_request(&ExtractedQuestion::new("What is 2+2?", vec![]));
        assert_eq!(request.generation_config.max_output_tokens, 160);
        assert!(request.prompt().unwrap().contains("What is 2+2?"));
    }
}
