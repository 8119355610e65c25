//! 语言解析服务 - 业务能力层
//!
//! 查询选区可用语言，按配置的优先级挑选一个

use std::sync::Arc;

use tracing::debug;

use crate::clients::LanguageSource;
use crate::error::{FetchError, FetchResult};
use crate::models::WorkItem;

/// 语言解析服务
///
/// 优先级：配置中的首选语言（按顺序）→ 接口返回的第一个语言
pub struct LanguageResolver {
    source: Arc<dyn LanguageSource>,
    preferred: Vec<String>,
}

impl LanguageResolver {
    pub fn new(source: Arc<dyn LanguageSource>, preferred: Vec<String>) -> Self {
        Self { source, preferred }
    }

    /// 解析分区使用的语言代码
    ///
    /// 元数据已带语言时直接使用，不再请求接口
    pub async fn resolve(&self, item: &WorkItem) -> FetchResult<String> {
        if let Some(code) = &item.language {
            return Ok(code.clone());
        }

        let available = self.source.available_languages(item).await?;
        debug!("{} 可用语言: {:?}", item, available);

        pick_language(&available, &self.preferred)
    }
}

/// 从可用语言中挑选，忽略大小写匹配首选语言
pub fn pick_language(available: &[String], preferred: &[String]) -> FetchResult<String> {
    if available.is_empty() {
        return Err(FetchError::NoLanguagesAvailable);
    }

    let chosen = preferred
        .iter()
        .find_map(|want| available.iter().find(|code| code.eq_ignore_ascii_case(want)))
        .unwrap_or(&available[0]);

    Ok(chosen.clone())
}
