/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则默认 `info`，详细模式下为 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 表单答题助手");
    info!("🤖 模型: {}", config.model_name);
    info!(
        "⏱️ 请求间隔: {}ms, 最大重试: {}",
        config.throttle_ms, config.max_retries
    );
    info!("{}", "=".repeat(60));
}

/// 记录一轮扫描的开始
///
/// # 参数
/// - `pass`: 当前轮次（从 1 开始）
/// - `total_passes`: 总轮次
/// - `candidates`: 检测到的题目容器数量
pub fn log_pass_start(pass: usize, total_passes: usize, candidates: usize) {
    info!("\n{}", "─".repeat(60));
    info!("🔍 第 {}/{} 轮扫描: 检测到 {} 个题目", pass, total_passes, candidates);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `answered`: 已显示答案的题目数
/// - `cache_hits`: 命中缓存的次数
/// - `failed`: 仍未获得答案的题目数
/// - `total`: 题目总数
pub fn print_final_stats(answered: usize, cache_hits: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已作答: {}/{}", answered, total);
    info!("💾 缓存命中: {}", cache_hits);
    info!("❌ 未作答: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("中国的首都是哪里", 4), "中国的首...");
    }
}
