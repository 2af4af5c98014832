//! HTTP 传输 - 基础设施层
//!
//! 持有 HTTP 客户端，只暴露"发送一次请求"的能力

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppResult, ConfigError, TransportError};
use crate::models::request::GenerateRequest;

/// 一次请求的原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 远程服务传输
///
/// 职责：
/// - 每次调用只发送一次 POST
/// - 不重试、不解码，只区分"拿到了响应"和"网络/超时失败"
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a GenerateRequest,
    ) -> BoxFuture<'a, Result<RawResponse, TransportError>>;
}

/// `generateContent` HTTP 传输
pub struct GeminiTransport {
    client: reqwest::Client,
    api_base_url: String,
    model_name: String,
    api_key: String,
}

impl GeminiTransport {
    /// 创建新的传输
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// 请求地址（不含密钥）
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base_url, self.model_name
        )
    }

    async fn post(&self, request: &GenerateRequest) -> Result<RawResponse, TransportError> {
        let endpoint = self.endpoint();
        debug!("POST {}", endpoint);

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        debug!("响应状态: {}, 长度: {} 字节", status, body.len());

        Ok(RawResponse { status, body })
    }
}

impl Transport for GeminiTransport {
    fn send<'a>(
        &'a self,
        request: &'a GenerateRequest,
    ) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        self.post(request).boxed()
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        // 去掉 URL，避免把密钥写进日志
        TransportError::Network(err.without_url().to_string())
    }
}
