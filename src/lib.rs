//! # Form Answer Assist
//!
//! 检测表单中的题目，向远程文本生成服务请求答案，缓存并显示
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 HTTP 客户端，只暴露"发送一次请求"的能力
//!
//! ### ② 业务能力层（Services）
//! - `identity` - 题目身份规范化 → 缓存键
//! - `answer_cache` - 命名空间答案缓存
//! - `response_decoder` - 容错的响应解码
//! - `prompt` - 提示词构建
//!
//! ### ③ 流程层（Workflow）
//! - `QuestionProcessor` - 单个题目容器的处理状态机
//! - `QuestionSource` / `AnswerDisplay` - 外部协作者接口
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/dispatcher` - 串行、限速、带重试的请求队列
//! - `orchestrator/app` - 多轮检测和统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, DispatchError};
pub use infrastructure::{GeminiTransport, RawResponse, Transport};
#[cfg(any(test, feature = "testing"))]
pub use infrastructure::ScriptedTransport;
pub use models::{CacheKey, ContainerId, ExtractedQuestion, QuestionIdentity};
pub use orchestrator::{App, RequestDispatcher, RunReport};
pub use services::{AnswerCache, JsonFileStore, MemoryStore};
pub use workflow::{ProcessResult, ProcessingState, QuestionProcessor};
