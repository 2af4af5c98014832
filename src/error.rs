use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求队列的终止错误
    #[error("请求错误: {0}")]
    Dispatch(#[from] DispatchError),
    /// 答案缓存错误
    #[error("缓存错误: {0}")]
    Cache(#[from] CacheError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 题目来源错误
    #[error("题目来源错误: {0}")]
    Source(#[from] SourceError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 传输层错误
///
/// 两种情况都视为可重试的瞬时故障
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 网络请求失败
    #[error("网络请求失败: {0}")]
    Network(String),
    /// 请求超时
    #[error("请求超时")]
    Timeout,
}

/// 队列项的终止错误
///
/// 每个入队请求最多收到一次
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// 2xx 响应但无法解码出答案（或服务返回了 error 对象）
    #[error("无法解析服务响应 (尝试 {attempts} 次)")]
    Decode { attempts: u32 },
    /// 不可重试的 HTTP 状态码
    #[error("服务返回错误状态 {status} (尝试 {attempts} 次)")]
    Status { status: u16, attempts: u32 },
    /// 瞬时故障重试次数耗尽
    #[error("重试 {attempts} 次后仍失败: {cause}")]
    Exhausted { attempts: u32, cause: TransientCause },
    /// 队列工作任务已退出，请求未发送
    #[error("请求队列已关闭")]
    Shutdown,
}

impl DispatchError {
    /// 本次请求实际发送的次数
    pub fn attempts(&self) -> u32 {
        match self {
            DispatchError::Decode { attempts }
            | DispatchError::Status { attempts, .. }
            | DispatchError::Exhausted { attempts, .. } => *attempts,
            DispatchError::Shutdown => 0,
        }
    }
}

/// 最后一次瞬时故障的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransientCause {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(TransportError),
}

/// 答案缓存错误
#[derive(Debug, Error)]
pub enum CacheError {
    /// 读取缓存文件失败
    #[error("读取缓存文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入缓存文件失败
    #[error("写入缓存文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 缓存文件内容损坏
    #[error("缓存文件格式错误 ({path}): {source}")]
    Corrupted {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端初始化失败: {0}")]
    HttpClient(String),
}

/// 题目来源错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 读取题目文件失败
    #[error("无法读取题目文件 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("无法解析题目文件 {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建缓存写入错误
    pub fn cache_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Cache(CacheError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
