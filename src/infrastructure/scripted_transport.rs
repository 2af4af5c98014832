//! 脚本化传输 - 基础设施层
//!
//! 不访问网络，按预先排好的顺序返回响应。仅在测试或启用 `testing` feature 时编译。

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::TransportError;
use crate::infrastructure::http_transport::{RawResponse, Transport};
use crate::models::request::GenerateRequest;

type Reply = Result<RawResponse, TransportError>;

/// 脚本化传输
///
/// 脚本用完后一直返回 `fallback`
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    latency: Duration,
    prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    /// 每次都返回同一个响应
    pub fn always(reply: Reply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: reply,
            latency: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// 每次都返回 `candidates` 格式的答案
    pub fn answering(answer: &str) -> Self {
        Self::always(Ok(RawResponse::new(200, candidates_body(answer))))
    }

    /// 先按顺序返回 `script`，之后返回 `fallback`
    pub fn with_script(mut self, script: Vec<Reply>) -> Self {
        self.script = Mutex::new(script.into());
        self
    }

    /// 每次发送前等待的时长
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 已发送的次数
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// 每次发送的提示词
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// 观察到的最大并发发送数
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Reply {
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a GenerateRequest) -> BoxFuture<'a, Reply> {
        async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(request.prompt().unwrap_or_default().to_string());
            }
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let reply = self.next_reply();

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            reply
        }
        .boxed()
    }
}

/// `candidates[0].content.parts[0].text` 格式的响应体
pub fn candidates_body(answer: &str) -> String {
    serde_json::json!({
        "candidates": [ { "content": { "parts": [ { "text": answer } ] } } ]
    })
    .to_string()
}
