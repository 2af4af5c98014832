//! 应用编排 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：加载表单、打开缓存、创建传输和请求队列
//! 2. **多轮检测**：首轮扫描后等待队列清空，再按配置补扫
//! 3. **全局统计**：汇总已作答、缓存命中和失败数量
//!
//! 补扫让失败后退回 untouched 的题目拿到新的重试预算。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{GeminiTransport, Transport};
use crate::models::load_toml_to_form_page;
use crate::orchestrator::dispatcher::{DispatcherConfig, RequestDispatcher};
use crate::services::{AnswerCache, JsonFileStore};
use crate::utils::logging;
use crate::workflow::{
    AnswerDisplay, ConsoleDisplay, QuestionProcessor, QuestionSource, TomlQuestionSource,
};

/// 运行结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// 最后一轮检测到的题目数（不含被放弃的装饰性元素）
    pub total: usize,
    pub answered: usize,
    pub cache_hits: usize,
    pub unanswered: usize,
    pub passes: usize,
}

/// 应用主结构
pub struct App {
    config: Config,
    processor: QuestionProcessor,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        logging::log_startup(&config);

        if !config.has_api_key() {
            warn!("⚠️ 未设置 GEMINI_API_KEY，请求很可能会被服务拒绝");
        }

        let page = load_toml_to_form_page(Path::new(&config.questions_file)).await?;
        let source = Arc::new(TomlQuestionSource::new(&page));
        let cache = open_cache(&config)?;
        let transport = Arc::new(GeminiTransport::new(&config)?);

        Ok(Self::with_components(
            config,
            source,
            Arc::new(ConsoleDisplay::new()),
            cache,
            transport,
        ))
    }

    /// 用给定的协作者组装应用（需要在 tokio 运行时内调用）
    pub fn with_components(
        config: Config,
        source: Arc<dyn QuestionSource>,
        display: Arc<dyn AnswerDisplay>,
        cache: AnswerCache,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let dispatcher = RequestDispatcher::spawn(transport, DispatcherConfig::new(&config));
        let processor = QuestionProcessor::new(&config, source, display, cache, dispatcher);
        Self { config, processor }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<RunReport> {
        let total_passes = 1 + self.config.rescan_passes;
        let mut report = RunReport::default();

        for pass in 1..=total_passes {
            if pass > 1 {
                sleep(Duration::from_millis(self.config.rescan_delay_ms)).await;
            }

            let summary = self.processor.scan();
            logging::log_pass_start(pass, total_passes, summary.detected);
            if summary.enqueued > 0 {
                info!("⏳ 等待 {} 个请求完成...", summary.enqueued);
            }
            self.processor.wait_idle().await;

            report.passes = pass;
            report.total = summary.detected - summary.rejected;

            if self.processor.done_count() >= report.total {
                break;
            }
        }

        let stats = self.processor.stats();
        report.answered = self.processor.done_count();
        report.cache_hits = stats.cache_hits;
        report.unanswered = report.total.saturating_sub(report.answered);

        logging::print_final_stats(
            report.answered,
            report.cache_hits,
            report.unanswered,
            report.total,
        );

        Ok(report)
    }

    pub fn processor(&self) -> &QuestionProcessor {
        &self.processor
    }
}

/// 打开配置中的答案缓存文件
pub fn open_cache(config: &Config) -> AppResult<AnswerCache> {
    let store = JsonFileStore::open(&config.cache_file)?;
    Ok(AnswerCache::new(Arc::new(store)))
}

/// 清空答案缓存，返回删除条数
pub fn clear_cache(config: &Config) -> AppResult<usize> {
    open_cache(config)?.clear_all()
}
