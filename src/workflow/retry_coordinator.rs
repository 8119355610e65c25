//! 验证码重试协调器 - 流程层
//!
//! 核心职责：定义"一个分区"的下载尝试流程
//!
//! 状态流转：
//! ```text
//! Pending → Attempting(token_1) → Succeeded
//!                 ↓ 失败
//!           Attempting(token_2) → ... → Exhausted
//! ```
//! 语言解析或验证码批次请求失败时直接结束。每个分区只请求一批验证码，
//! 整批用完后不再补充。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::{CaptchaSource, DocumentFetcher, LanguageSource};
use crate::error::FetchError;
use crate::models::{FetchOutcome, WorkItem};
use crate::services::LanguageResolver;

/// 验证码重试协调器
///
/// - 不持有任何文件资源
/// - 每个令牌只使用一次
/// - 第一次成功后立即返回，不再尝试剩余令牌
pub struct RetryCoordinator {
    captcha: Arc<dyn CaptchaSource>,
    languages: LanguageResolver,
    fetcher: Arc<dyn DocumentFetcher>,
    batch_size: usize,
}

impl RetryCoordinator {
    pub fn new(
        captcha: Arc<dyn CaptchaSource>,
        language_source: Arc<dyn LanguageSource>,
        fetcher: Arc<dyn DocumentFetcher>,
        preferred_languages: Vec<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            captcha,
            languages: LanguageResolver::new(language_source, preferred_languages),
            fetcher,
            batch_size,
        }
    }

    /// 下载一个分区
    pub async fn resolve(&self, item: &WorkItem) -> FetchOutcome {
        // 1. 语言
        let language = match self.languages.resolve(item).await {
            Ok(code) => code,
            Err(e) => {
                warn!("{} ⚠️ 语言解析失败: {}", item, e);
                return FetchOutcome::Failure(FetchError::LanguageResolutionFailed(Box::new(e)));
            }
        };

        // 2. 验证码批次
        let batch = match self.captcha.request_batch(self.batch_size).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("{} ⚠️ 获取验证码失败: {}", item, e);
                return FetchOutcome::Failure(match e {
                    FetchError::SolverUnavailable(_) => e,
                    other => FetchError::SolverUnavailable(other.to_string()),
                });
            }
        };

        let total = batch.remaining();
        debug!("{} 语言 {}, 获得 {} 个验证码", item, language, total);

        // 3. 按顺序逐个尝试
        let mut attempts = 0;
        let mut last_error = None;
        for token in batch {
            attempts += 1;
            info!(
                "{} 🔑 尝试验证码 {}/{} ({})",
                item, attempts, total, token.value
            );

            match self.fetcher.fetch(item, &language, &token).await {
                FetchOutcome::Success(bytes) => {
                    info!("{} ✓ 第 {} 个验证码下载成功", item, attempts);
                    return FetchOutcome::Success(bytes);
                }
                FetchOutcome::Failure(e) => {
                    warn!(
                        "{} 验证码 {} 失败: {}，尝试下一个",
                        item, token.value, e
                    );
                    last_error = Some(Box::new(e));
                }
            }
        }

        // 4. 整批用完
        FetchOutcome::Failure(FetchError::AllCaptchasExhausted {
            attempts,
            last: last_error,
        })
    }
}
