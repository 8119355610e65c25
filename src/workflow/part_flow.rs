//! 分区处理流程 - 流程层
//!
//! 下载（RetryCoordinator）→ 落盘（ArtifactWriter），任何错误都以 FetchError 返回

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::FetchResult;
use crate::models::WorkItem;
use crate::services::ArtifactWriter;
use crate::workflow::retry_coordinator::RetryCoordinator;

/// 单个分区的完整处理流程
pub struct PartFlow {
    coordinator: RetryCoordinator,
    writer: ArtifactWriter,
}

impl PartFlow {
    pub fn new(coordinator: RetryCoordinator, writer: ArtifactWriter) -> Self {
        Self { coordinator, writer }
    }

    /// 处理一个分区，返回落盘路径
    pub async fn run(&self, item: &WorkItem) -> FetchResult<PathBuf> {
        let started = Instant::now();
        info!("{} 开始处理", item);

        let payload = self.coordinator.resolve(item).await.into_result()?;

        let path = match self.writer.store(&payload, item).await {
            Ok(path) => path,
            Err(e) => {
                warn!("{} ⚠️ 保存失败: {}", item, e);
                return Err(e);
            }
        };

        info!(
            "{} ✅ PDF 已保存: {} (耗时 {} ms)",
            item,
            path.file_name().unwrap_or_default().to_string_lossy(),
            started.elapsed().as_millis()
        );
        Ok(path)
    }
}
