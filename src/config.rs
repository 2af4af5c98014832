use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 远程服务配置 ---
    /// 服务密钥，以查询参数形式附在请求 URL 上
    pub api_key: String,
    pub api_base_url: String,
    pub model_name: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
    // --- 请求队列配置 ---
    /// 每个请求结束后的固定间隔（毫秒）
    pub throttle_ms: u64,
    /// 瞬时故障的最大重试次数（总发送次数为 max_retries + 1）
    pub max_retries: u32,
    /// HTTP 429/5xx 的退避基数（毫秒），乘以已尝试次数
    pub status_backoff_ms: u64,
    /// 网络错误/超时的退避基数（毫秒），乘以已尝试次数
    pub network_backoff_ms: u64,
    // --- 题目处理配置 ---
    /// 题干最短长度，低于此值视为装饰性元素
    pub min_question_len: usize,
    /// 答案缓存文件
    pub cache_file: String,
    /// 题目文件（TOML）
    pub questions_file: String,
    /// 首轮扫描后的补扫轮数
    pub rescan_passes: usize,
    /// 补扫前的防抖等待（毫秒）
    pub rescan_delay_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model_name: "gemini-2.0-flash".to_string(),
            request_timeout_secs: 20,
            temperature: 0.1,
            max_output_tokens: 160,
            throttle_ms: 700,
            max_retries: 2,
            status_backoff_ms: 1500,
            network_backoff_ms: 2000,
            min_question_len: 3,
            cache_file: "fas_cache.json".to_string(),
            questions_file: "questions.toml".to_string(),
            rescan_passes: 1,
            rescan_delay_ms: 500,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or(default.api_key),
            api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(default.api_base_url),
            model_name: std::env::var("GEMINI_MODEL").unwrap_or(default.model_name),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS").unwrap_or(default.request_timeout_secs),
            temperature: parse_env("TEMPERATURE").unwrap_or(default.temperature),
            max_output_tokens: parse_env("MAX_OUTPUT_TOKENS").unwrap_or(default.max_output_tokens),
            throttle_ms: parse_env("THROTTLE_MS").unwrap_or(default.throttle_ms),
            max_retries: parse_env("MAX_RETRIES").unwrap_or(default.max_retries),
            status_backoff_ms: parse_env("STATUS_BACKOFF_MS").unwrap_or(default.status_backoff_ms),
            network_backoff_ms: parse_env("NETWORK_BACKOFF_MS").unwrap_or(default.network_backoff_ms),
            min_question_len: parse_env("MIN_QUESTION_LEN").unwrap_or(default.min_question_len),
            cache_file: std::env::var("CACHE_FILE").unwrap_or(default.cache_file),
            questions_file: std::env::var("QUESTIONS_FILE").unwrap_or(default.questions_file),
            rescan_passes: parse_env("RESCAN_PASSES").unwrap_or(default.rescan_passes),
            rescan_delay_ms: parse_env("RESCAN_DELAY_MS").unwrap_or(default.rescan_delay_ms),
            verbose_logging: parse_env("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_service_contract() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_output_tokens, 160);
        assert!((config.temperature - 0.1).abs() < f32::EPSILON);
        assert!(!config.has_api_key());
    }
}
