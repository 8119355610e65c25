/// 日志工具模块
///
/// 提供日志初始化和运行横幅输出
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 info，详细模式下为 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 选民名册 PDF 下载");
    info!("📊 最大并发分组数: {}", config.concurrency);
    info!("📋 每组分区数: {}", config.group_size);
    info!("🔑 每个分区验证码数: {}", config.captcha_batch_size);
    info!("🌐 语言优先级: {}", config.preferred_languages.join(" > "));
    info!("{}", "=".repeat(60));
}

/// 记录分区加载信息
pub fn log_items_loaded(states: usize, total: usize, group_size: usize) {
    let groups = total.div_ceil(group_size.max(1));
    info!("✓ 共 {} 个邦, {} 个待下载分区", states, total);
    info!("📋 将分为 {} 组处理\n", groups);
}

/// 打印最终统计信息
pub fn print_final_stats(
    succeeded: usize,
    failed: usize,
    total: usize,
    elapsed: Duration,
    ledger_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("总耗时: {:.1} 秒", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", succeeded, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n失败台账已保存至: {}", ledger_path);
}
