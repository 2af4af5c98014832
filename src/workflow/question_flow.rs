//! 题目处理流程 - 流程层
//!
//! 核心职责：定义"一个题目容器"的完整处理流程
//!
//! 流程顺序：
//! 1. 状态检查（处理中/已完成/已显示 → 跳过）
//! 2. 提取题目 → 过短则放弃
//! 3. 缓存命中 → 直接显示
//! 4. 缓存未命中 → 入队请求 → 写缓存 → 显示
//!
//! 任何失败都把容器退回 untouched，下一轮检测会重新开始

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DispatchError;
use crate::models::question::{CacheKey, ContainerId};
use crate::orchestrator::dispatcher::RequestDispatcher;
use crate::services::{identity_of, AnswerCache, PromptBuilder};
use crate::utils::logging::truncate_text;
use crate::workflow::collaborators::{AnswerDisplay, QuestionSource};
use crate::workflow::processing_record::{ProcessingRecords, ProcessingState};

/// 一次检测的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// 已在处理中或已完成
    Skipped(ProcessingState),
    /// 容器里已经有答案，只补上 done 标记
    AlreadyShown,
    /// 题干为空或过短
    Rejected,
    /// 命中缓存，已显示
    CacheHit,
    /// 已入队等待远程服务
    Enqueued,
}

/// 一轮检测的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub detected: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub cache_hits: usize,
    pub enqueued: usize,
}

impl ScanSummary {
    fn record(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Skipped(_) | ProcessResult::AlreadyShown => self.skipped += 1,
            ProcessResult::Rejected => self.rejected += 1,
            ProcessResult::CacheHit => self.cache_hits += 1,
            ProcessResult::Enqueued => self.enqueued += 1,
        }
    }
}

/// 累计统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub cache_hits: usize,
    pub answered: usize,
    pub failed: usize,
}

/// 回调里需要访问的共享状态
struct Shared {
    records: ProcessingRecords,
    cache: AnswerCache,
    display: Arc<dyn AnswerDisplay>,
    cache_hits: AtomicUsize,
    answered: AtomicUsize,
    failed: AtomicUsize,
}

impl Shared {
    /// 显示答案并标记完成
    fn apply(&self, container: &ContainerId, answer: &str) {
        self.display.show(container, answer);
        self.records.mark_done(container);
    }

    fn complete(&self, container: &ContainerId, key: &CacheKey, result: Result<String, DispatchError>) {
        match result {
            Ok(text) => {
                let answer = text.trim();
                if let Err(e) = self.cache.set(key, answer) {
                    // 缓存只是辅助，写失败不影响显示
                    warn!("[{}] ⚠️ 写入缓存失败: {}", container, e);
                }
                self.apply(container, answer);
                self.answered.fetch_add(1, Ordering::SeqCst);
                info!("[{}] ✓ 已显示答案", container);
            }
            Err(e) => {
                warn!("[{}] ⚠️ 获取答案失败，等待下一轮检测: {}", container, e);
                self.records.reset(container);
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

/// 题目处理器
///
/// - 编排单个容器的处理流程
/// - 持有每个容器的处理状态
/// - 不持有网络资源，只通过 RequestDispatcher 发请求
pub struct QuestionProcessor {
    source: Arc<dyn QuestionSource>,
    dispatcher: RequestDispatcher,
    prompt_builder: PromptBuilder,
    min_question_len: usize,
    shared: Arc<Shared>,
}

impl QuestionProcessor {
    pub fn new(
        config: &Config,
        source: Arc<dyn QuestionSource>,
        display: Arc<dyn AnswerDisplay>,
        cache: AnswerCache,
        dispatcher: RequestDispatcher,
    ) -> Self {
        Self {
            source,
            dispatcher,
            prompt_builder: PromptBuilder::new(config),
            min_question_len: config.min_question_len,
            shared: Arc::new(Shared {
                records: ProcessingRecords::new(),
                cache,
                display,
                cache_hits: AtomicUsize::new(0),
                answered: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
            }),
        }
    }

    /// 处理一次检测事件
    pub fn process(&self, container: &ContainerId) -> ProcessResult {
        let shared = &self.shared;

        match shared.records.state(container) {
            ProcessingState::Untouched => {}
            state => return ProcessResult::Skipped(state),
        }
        if shared.display.is_shown(container) {
            shared.records.mark_done(container);
            return ProcessResult::AlreadyShown;
        }
        if let Err(state) = shared.records.try_begin(container) {
            return ProcessResult::Skipped(state);
        }

        let question = self.source.extract(container);
        let text = question.text.trim();
        if text.chars().count() < self.min_question_len {
            debug!("[{}] 题干过短，跳过: {:?}", container, text);
            shared.records.reset(container);
            return ProcessResult::Rejected;
        }

        info!(
            "[{}] 检测到题目: {} (选项 {} 个)",
            container,
            truncate_text(text, 80),
            question.options.len()
        );

        let key = identity_of(text, &question.options).cache_key();
        if let Some(cached) = shared.cache.get(&key).filter(|a| !a.trim().is_empty()) {
            info!("[{}] 💾 命中缓存", container);
            shared.apply(container, &cached);
            shared.cache_hits.fetch_add(1, Ordering::SeqCst);
            return ProcessResult::CacheHit;
        }

        let prompt_builder = self.prompt_builder.clone();
        let build_payload = move || prompt_builder.build_request(&question);

        let on_complete = {
            let shared = shared.clone();
            let container = container.clone();
            let key = key.clone();
            move |result| shared.complete(&container, &key, result)
        };

        self.dispatcher.enqueue(key, build_payload, on_complete);
        ProcessResult::Enqueued
    }

    /// 拉取当前所有候选容器并逐个处理
    pub fn scan(&self) -> ScanSummary {
        let candidates = self.source.detect_candidates();
        let mut summary = ScanSummary {
            detected: candidates.len(),
            ..Default::default()
        };
        for container in &candidates {
            summary.record(self.process(container));
        }
        debug!("扫描结果: {:?}", summary);
        summary
    }

    /// 等待所有已入队的请求结束
    pub async fn wait_idle(&self) {
        self.dispatcher.wait_idle().await;
    }

    pub fn state(&self, container: &ContainerId) -> ProcessingState {
        self.shared.records.state(container)
    }

    pub fn done_count(&self) -> usize {
        self.shared.records.count(ProcessingState::Done)
    }

    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            cache_hits: self.shared.cache_hits.load(Ordering::SeqCst),
            answered: self.shared.answered.load(Ordering::SeqCst),
            failed: self.shared.failed.load(Ordering::SeqCst),
        }
    }
}
