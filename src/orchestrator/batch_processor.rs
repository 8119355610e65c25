//! 批量下载入口 - 编排层
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、创建 HTTP 客户端和各项能力
//! 2. **加载元数据**：读取所有邦的 state.json，写出 parts.json
//! 3. **调度下载**：委托 Scheduler 分组并发处理
//! 4. **输出台账**：运行结束后一次性写出失败台账并打印统计
//! 5. **统计报告**：覆盖率表（show-insights）和 JSON 报告（generate-insights）
//!
//! 只有元数据目录不可读、state.json 格式错误、台账无法写出才是致命错误；
//! 单个分区的失败都在台账里。

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::clients::{build_http_client, CaptchaClient, CaptchaSource, DocumentFetcher, EciClient, LanguageSource};
use crate::config::Config;
use crate::models::{flatten_states, load_all_states, write_parts_index};
use crate::orchestrator::scheduler::{RunReport, Scheduler};
use crate::services::{collect_state_insight, insights, ArtifactWriter, Metrics, StateInsight};
use crate::utils::logging;
use crate::workflow::{PartFlow, RetryCoordinator};

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<PartFlow>,
}

impl App {
    /// 使用真实的 HTTP 客户端初始化
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        let http = build_http_client(&config)?;
        let captcha: Arc<dyn CaptchaSource> =
            Arc::new(CaptchaClient::new(http.clone(), config.captcha_url.clone()));
        let eci = Arc::new(EciClient::new(http, &config));

        Ok(Self::with_sources(config, captcha, eci.clone(), eci))
    }

    /// 使用自定义能力实现构建（测试中替换为内存实现）
    pub fn with_sources(
        config: Config,
        captcha: Arc<dyn CaptchaSource>,
        languages: Arc<dyn LanguageSource>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Self {
        let coordinator = RetryCoordinator::new(
            captcha,
            languages,
            fetcher,
            config.preferred_languages.clone(),
            config.captcha_batch_size,
        );
        let writer = ArtifactWriter::new(config.output_root.clone());
        let flow = Arc::new(PartFlow::new(coordinator, writer));

        Self { config, flow }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 下载所有（或指定邦的）分区 PDF
    pub async fn download_pdfs(&self, state_filter: &[String]) -> Result<RunReport> {
        let started = Instant::now();
        logging::log_startup(&self.config);

        info!("\n📁 正在扫描元数据: {}", self.config.metadata_dir.display());
        let states = load_all_states(&self.config.metadata_dir, state_filter).await?;
        if states.is_empty() {
            warn!("⚠️ 没有找到可处理的 state.json，程序结束");
        }

        for state in &states {
            let path = write_parts_index(state).await?;
            info!("📝 {} 分区列表已写入: {}", state.metadata.display_name(), path.display());
        }

        let items = flatten_states(states.iter().map(|s| &s.metadata));
        logging::log_items_loaded(states.len(), items.len(), self.config.group_size);

        let scheduler = Scheduler::new(
            self.flow.clone(),
            self.config.concurrency,
            self.config.group_size,
        );
        let report = scheduler.run(items).await;

        report.ledger.flush(&self.config.ledger_file)?;
        for (kind, count) in report.ledger.count_by_kind() {
            info!("  {}: {}", kind, count);
        }

        logging::print_final_stats(
            report.succeeded,
            report.failed(),
            report.total,
            started.elapsed(),
            &self.config.ledger_file.display().to_string(),
        );

        Ok(report)
    }

    /// 统计各邦下载覆盖率
    pub async fn show_insights(&self, state_filter: &[String]) -> Result<Vec<StateInsight>> {
        let states = load_all_states(&self.config.metadata_dir, state_filter).await?;

        let mut result = Vec::with_capacity(states.len());
        for state in &states {
            result.push(collect_state_insight(state, &self.config.output_root).await?);
        }

        insights::log_insights(&result);
        Ok(result)
    }

    /// 生成统计报告（metrics.json、逐区报告、missing_data.json）
    pub async fn generate_insights(&self, state_filter: &[String]) -> Result<Metrics> {
        let states = load_all_states(&self.config.metadata_dir, state_filter).await?;
        let metrics = insights::generate_insights(&states, &self.config.insights_dir).await?;

        info!(
            "📊 {} 个邦, 共 {} 个分区",
            metrics.state_names.len(),
            metrics.total_parts
        );
        Ok(metrics)
    }
}
