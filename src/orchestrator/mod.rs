//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `dispatcher` - 请求队列
//! - 全局唯一的单工作者队列，串行发送所有请求
//! - 请求间隔、瞬时故障重试与退避
//! - 每个请求的回调恰好调用一次
//!
//! ### `app` - 应用编排
//! - 组装缓存、传输、队列和题目处理器
//! - 多轮检测，输出全局统计
//!
//! ## 层次关系
//!
//! ```text
//! app (多轮检测)
//!     ↓
//! workflow::QuestionProcessor (处理单个题目容器)
//!     ↓                 ↘
//! services (缓存/规范化/解码/提示词)   dispatcher (请求队列)
//!                                         ↓
//!                               infrastructure (Transport)
//! ```

pub mod app;
pub mod dispatcher;

pub use app::{clear_cache, open_cache, App, RunReport};
pub use dispatcher::{DispatcherConfig, RequestDispatcher};
