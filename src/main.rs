use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use form_answer_assist::orchestrator::clear_cache;
use form_answer_assist::utils::logging;
use form_answer_assist::{App, Config};

#[derive(Parser, Debug)]
#[command(name = "form-answer-assist", version, about = "表单答题助手")]
struct Cli {
    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 检测题目并获取答案（默认）
    Run {
        /// 题目文件（TOML），覆盖 QUESTIONS_FILE
        #[arg(short, long)]
        questions: Option<String>,
    },
    /// 清空答案缓存
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::from_env();
    config.verbose_logging |= cli.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    match cli.command.unwrap_or(Command::Run { questions: None }) {
        Command::Run { questions } => {
            if let Some(path) = questions {
                config.questions_file = path;
            }
            App::initialize(config).await?.run().await?;
        }
        Command::ClearCache => {
            let removed = clear_cache(&config)?;
            info!("已删除 {} 条缓存答案", removed);
        }
    }

    Ok(())
}
