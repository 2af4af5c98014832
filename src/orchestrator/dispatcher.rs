//! 请求队列 - 编排层
//!
//! 全局唯一的单工作者队列：
//!
//! ```text
//! queued → sending → succeeded
//!                  → failed
//!                  → retry-scheduled → sending ...
//! ```
//!
//! - 任何时刻最多只有一个请求处于 sending
//! - 一个请求（含全部重试）结束后才会取下一个
//! - 每个请求结束后固定等待 `throttle`，无论成败
//! - 每个入队请求的回调恰好被调用一次

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DispatchError, TransientCause};
use crate::infrastructure::Transport;
use crate::models::question::CacheKey;
use crate::models::request::GenerateRequest;
use crate::services::response_decoder;

/// 在真正发送前构建请求体，每次尝试都会重新调用
pub type PayloadBuilder = Box<dyn Fn() -> GenerateRequest + Send + Sync>;

/// 请求结束回调
pub type Completion = Box<dyn FnOnce(Result<String, DispatchError>) + Send>;

/// 可重试的 HTTP 状态码
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

pub fn is_transient_status(status: u16) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

/// 队列参数
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub throttle: Duration,
    pub max_retries: u32,
    pub status_backoff: Duration,
    pub network_backoff: Duration,
}

impl DispatcherConfig {
    pub fn new(config: &Config) -> Self {
        Self {
            throttle: Duration::from_millis(config.throttle_ms),
            max_retries: config.max_retries,
            status_backoff: Duration::from_millis(config.status_backoff_ms),
            network_backoff: Duration::from_millis(config.network_backoff_ms),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

struct QueueItem {
    key: CacheKey,
    build_payload: PayloadBuilder,
    on_complete: Completion,
    attempts: u32,
}

/// 请求队列句柄
///
/// 可以随意克隆，所有克隆共享同一个工作任务
#[derive(Clone)]
pub struct RequestDispatcher {
    tx: mpsc::UnboundedSender<QueueItem>,
    pending: Arc<watch::Sender<usize>>,
}

impl RequestDispatcher {
    /// 启动工作任务（需要在 tokio 运行时内调用）
    pub fn spawn(transport: Arc<dyn Transport>, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);

        tokio::spawn(run_worker(rx, transport, config, pending.clone()));

        Self { tx, pending }
    }

    /// 入队一个请求
    ///
    /// 没有返回值，结果只通过 `on_complete` 送达
    pub fn enqueue<B, C>(&self, key: CacheKey, build_payload: B, on_complete: C)
    where
        B: Fn() -> GenerateRequest + Send + Sync + 'static,
        C: FnOnce(Result<String, DispatchError>) + Send + 'static,
    {
        self.pending.send_modify(|n| *n += 1);
        debug!("队列: 入队 {} (待处理 {})", key, self.pending());

        let item = QueueItem {
            key,
            build_payload: Box::new(build_payload),
            on_complete: Box::new(on_complete),
            attempts: 0,
        };

        if let Err(mpsc::error::SendError(item)) = self.tx.send(item) {
            warn!("队列已关闭，丢弃请求 {}", item.key);
            (item.on_complete)(Err(DispatchError::Shutdown));
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
        }
    }

    /// 尚未送达结果的请求数
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// 等待所有已入队的请求送达结果
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<QueueItem>,
    transport: Arc<dyn Transport>,
    config: DispatcherConfig,
    pending: Arc<watch::Sender<usize>>,
) {
    while let Some(mut item) = rx.recv().await {
        let outcome = send_with_retry(transport.as_ref(), &config, &mut item).await;

        match &outcome {
            Ok(_) => info!("队列: ✓ {} 完成 (尝试 {} 次)", item.key, item.attempts),
            Err(e) => warn!("队列: ✗ {} 失败: {}", item.key, e),
        }

        let QueueItem { key, on_complete, .. } = item;
        // 回调 panic 不能带走工作任务，否则后续请求永远得不到结果
        if catch_unwind(AssertUnwindSafe(|| on_complete(outcome))).is_err() {
            warn!("队列: {} 的结果回调 panic，继续处理下一个请求", key);
        }
        pending.send_modify(|n| *n = n.saturating_sub(1));

        sleep(config.throttle).await;
    }
    debug!("队列工作任务退出");
}

/// 发送一个请求直到得到终止结果
async fn send_with_retry(
    transport: &dyn Transport,
    config: &DispatcherConfig,
    item: &mut QueueItem,
) -> Result<String, DispatchError> {
    loop {
        item.attempts += 1;
        let attempts = item.attempts;
        let request = (item.build_payload)();

        debug!("队列: 发送 (第 {} 次) {}", attempts, item.key);

        let cause = match transport.send(&request).await {
            Ok(response) if response.is_success() => {
                return response_decoder::decode(response.body)
                    .ok_or(DispatchError::Decode { attempts });
            }
            Ok(response) if is_transient_status(response.status) => {
                TransientCause::Status(response.status)
            }
            Ok(response) => {
                debug!("非 2xx 响应 {}: {}", response.status, response.body);
                return Err(DispatchError::Status {
                    status: response.status,
                    attempts,
                });
            }
            Err(e) => TransientCause::Transport(e),
        };

        // 首次发送也计入 attempts，所以总共最多发送 max_retries + 1 次
        if attempts > config.max_retries {
            return Err(DispatchError::Exhausted { attempts, cause });
        }

        let base = match cause {
            TransientCause::Status(_) => config.status_backoff,
            TransientCause::Transport(_) => config.network_backoff,
        };
        let backoff = base * attempts;
        warn!(
            "瞬时故障 ({}), {}ms 后重试 ({}/{})",
            cause,
            backoff.as_millis(),
            attempts,
            config.max_retries
        );
        sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::infrastructure::{candidates_body, RawResponse, ScriptedTransport};
    use crate::models::ExtractedQuestion;
    use crate::services::{normalize, PromptBuilder};
    use proptest::prelude::*;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn payload() -> GenerateRequest {
        PromptBuilder::default().build_request(&ExtractedQuestion::new("What is 2+2?", vec![]))
    }

    fn dispatcher(transport: Arc<ScriptedTransport>) -> RequestDispatcher {
        RequestDispatcher::spawn(transport, DispatcherConfig::default())
    }

    async fn run_one(
        dispatcher: &RequestDispatcher,
        text: &str,
    ) -> Result<String, DispatchError> {
        let (tx, rx) = oneshot::channel();
        dispatcher.enqueue(normalize(text, &[]), payload, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_delivers_decoded_text() {
        let transport = Arc::new(ScriptedTransport::answering("4"));
        let dispatcher = dispatcher(transport.clone());

        assert_eq!(run_one(&dispatcher, "What is 2+2?").await, Ok("4".to_string()));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_status_retries_until_exhausted() {
        let transport = Arc::new(ScriptedTransport::always(Ok(RawResponse::new(503, "busy"))));
        let dispatcher = dispatcher(transport.clone());

        let result = run_one(&dispatcher, "q?").await;

        let max_retries = DispatcherConfig::default().max_retries;
        assert_eq!(transport.calls(), (max_retries + 1) as usize);
        assert_eq!(
            result,
            Err(DispatchError::Exhausted {
                attempts: max_retries + 1,
                cause: TransientCause::Status(503),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_status_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::always(Ok(RawResponse::new(404, "nope"))));
        let dispatcher = dispatcher(transport.clone());

        let result = run_one(&dispatcher, "q?").await;

        assert_eq!(transport.calls(), 1);
        assert_eq!(result, Err(DispatchError::Status { status: 404, attempts: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_failure_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::always(Ok(RawResponse::new(
            200,
            r#"{"error":{"message":"blocked"}}"#,
        ))));
        let dispatcher = dispatcher(transport.clone());

        assert_eq!(
            run_one(&dispatcher, "q?").await,
            Err(DispatchError::Decode { attempts: 1 })
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_then_success() {
        let transport = Arc::new(
            ScriptedTransport::answering("Paris").with_script(vec![
                Err(TransportError::Timeout),
                Err(TransportError::Network("reset".to_string())),
            ]),
        );
        let dispatcher = dispatcher(transport.clone());

        assert_eq!(run_one(&dispatcher, "q?").await, Ok("Paris".to_string()));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_scales_with_attempts() {
        let transport = Arc::new(ScriptedTransport::always(Ok(RawResponse::new(429, ""))));
        let dispatcher = RequestDispatcher::spawn(
            transport.clone(),
            DispatcherConfig {
                throttle: Duration::from_millis(700),
                max_retries: 2,
                status_backoff: Duration::from_millis(1500),
                network_backoff: Duration::from_millis(2000),
            },
        );

        let start = tokio::time::Instant::now();
        let _ = run_one(&dispatcher, "q?").await;
        // 1500 × 1 + 1500 × 2
        assert_eq!(start.elapsed(), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_separates_items() {
        let transport = Arc::new(ScriptedTransport::answering("x"));
        let dispatcher = dispatcher(transport.clone());

        let start = tokio::time::Instant::now();
        run_one(&dispatcher, "a?").await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        run_one(&dispatcher, "b?").await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_block_next_item_and_order_is_fifo() {
        let transport = Arc::new(
            ScriptedTransport::answering("ok")
                .with_script(vec![Ok(RawResponse::new(500, "")), Ok(RawResponse::new(200, candidates_body("first")))]),
        );
        let dispatcher = dispatcher(transport.clone());
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = order.clone();
            dispatcher.enqueue(normalize(name, &[]), payload, move |result| {
                order.lock().unwrap().push((name, result.unwrap()));
            });
        }
        dispatcher.wait_idle().await;

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                ("first", "first".to_string()),
                ("second", "ok".to_string()),
                ("third", "ok".to_string()),
            ]
        );
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_payload_is_built_per_attempt() {
        let transport = Arc::new(
            ScriptedTransport::answering("ok").with_script(vec![Ok(RawResponse::new(502, ""))]),
        );
        let dispatcher = dispatcher(transport.clone());
        let builds = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let counter = builds.clone();
        let (tx, rx) = oneshot::channel();
        dispatcher.enqueue(
            normalize("q?", &[]),
            move || {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                payload()
            },
            move |r| {
                let _ = tx.send(r);
            },
        );

        assert!(rx.await.unwrap().is_ok());
        assert_eq!(builds.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_callback_does_not_stop_queue() {
        let transport = Arc::new(ScriptedTransport::answering("ok"));
        let dispatcher = dispatcher(transport.clone());

        dispatcher.enqueue(normalize("first", &[]), payload, |_| {
            panic!("display failed");
        });
        let (tx, rx) = oneshot::channel();
        dispatcher.enqueue(normalize("second", &[]), payload, move |result| {
            let _ = tx.send(result);
        });

        let idle = tokio::time::timeout(Duration::from_secs(60), dispatcher.wait_idle()).await;
        assert!(idle.is_ok());
        assert_eq!(rx.await.unwrap(), Ok("ok".to_string()));
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(transport.calls(), 2);
    }

    fn scripted_reply(code: u16) -> Result<RawResponse, TransportError> {
        match code {
            0 => Err(TransportError::Timeout),
            1 => Err(TransportError::Network("reset".to_string())),
            200 => Ok(RawResponse::new(200, candidates_body("y"))),
            status => Ok(RawResponse::new(status, "")),
        }
    }

    /// 运行一组随机入队时机和响应脚本，返回 (最大并发, 每项回调次数, 剩余待处理数)
    fn run_schedule(delays: Vec<u64>, codes: Vec<u16>) -> (usize, Vec<usize>, usize) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        runtime.block_on(async move {
            let transport = Arc::new(
                ScriptedTransport::answering("x")
                    .with_latency(Duration::from_millis(250))
                    .with_script(codes.into_iter().map(scripted_reply).collect()),
            );
            let dispatcher = dispatcher(transport.clone());
            let completions = Arc::new(Mutex::new(vec![0usize; delays.len()]));

            let mut handles = Vec::new();
            for (i, delay) in delays.into_iter().enumerate() {
                let dispatcher = dispatcher.clone();
                let completions = completions.clone();
                handles.push(tokio::spawn(async move {
                    sleep(Duration::from_millis(delay)).await;
                    dispatcher.enqueue(normalize(&format!("q{}?", i), &[]), payload, move |_| {
                        completions.lock().unwrap()[i] += 1;
                    });
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
            dispatcher.wait_idle().await;

            let counts = completions.lock().unwrap().clone();
            (transport.max_in_flight(), counts, dispatcher.pending())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_never_more_than_one_in_flight(
            delays in prop::collection::vec(0u64..1500, 1..16),
            codes in prop::collection::vec(
                prop_oneof![
                    Just(200u16),
                    Just(429u16),
                    Just(500u16),
                    Just(503u16),
                    Just(400u16),
                    Just(404u16),
                    Just(0u16),
                    Just(1u16),
                ],
                0..40,
            ),
        ) {
            let items = delays.len();
            let (max_in_flight, counts, pending) = run_schedule(delays, codes);

            prop_assert_eq!(max_in_flight, 1);
            prop_assert_eq!(counts, vec![1usize; items]);
            prop_assert_eq!(pending, 0);
        }
    }
}
