use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use eroll_fetch::utils::logging;
use eroll_fetch::{App, Config};
use std::path::PathBuf;

/// 选民名册 PDF 下载工具
#[derive(Parser, Debug)]
#[command(name = "eroll-fetch", version, about)]
struct Cli {
    /// TOML 配置文件
    #[arg(long, global = true, env = "EROLL_CONFIG")]
    config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 下载所有分区的 PDF
    DownloadPdfs(DownloadArgs),
    /// 显示各邦下载覆盖率
    ShowInsights {
        /// 只统计指定的邦代码（可重复）
        #[arg(short, long = "state")]
        states: Vec<String>,
    },
    /// 生成统计报告（JSON 文件）
    GenerateInsights {
        /// 只统计指定的邦代码（可重复）
        #[arg(short, long = "state")]
        states: Vec<String>,

        /// 报告输出目录
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// 只下载指定的邦代码（可重复）
    #[arg(short, long = "state")]
    states: Vec<String>,

    /// 同时处理的分组数量
    #[arg(long)]
    concurrency: Option<usize>,

    /// 每个分组的分区数量
    #[arg(long)]
    group_size: Option<usize>,

    /// 每个分区请求的验证码数量
    #[arg(long)]
    captcha_batch_size: Option<usize>,

    /// 失败台账输出文件
    #[arg(long)]
    ledger: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置：默认值 → 配置文件 → 环境变量 → 命令行
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides(|name| std::env::var(name).ok());
    config.verbose_logging |= cli.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    match cli.command {
        Command::DownloadPdfs(args) => {
            if let Some(n) = args.concurrency {
                config.concurrency = n;
            }
            if let Some(n) = args.group_size {
                config.group_size = n;
            }
            if let Some(n) = args.captcha_batch_size {
                config.captcha_batch_size = n;
            }
            if let Some(path) = args.ledger {
                config.ledger_file = path;
            }

            App::initialize(config)?.download_pdfs(&args.states).await?;
        }
        Command::ShowInsights { states } => {
            App::initialize(config)?.show_insights(&states).await?;
        }
        Command::GenerateInsights { states, output } => {
            if let Some(dir) = output {
                config.insights_dir = dir;
            }
            App::initialize(config)?.generate_insights(&states).await?;
        }
    }

    Ok(())
}
