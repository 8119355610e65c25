//! 单个分组处理器 - 编排层
//!
//! 组内分区严格按顺序逐个处理；任何分区失败只记录到本组的本地台账，
//! 不影响后续分区。单个分区内部 panic 也只记录该分区（`WorkerAborted`）。

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{error, info};

use crate::error::FetchError;
use crate::models::{FailureRecord, WorkItem};
use crate::workflow::PartFlow;

/// 分组处理结果
#[derive(Debug, Default)]
pub struct GroupReport {
    pub succeeded: usize,
    /// 本组的本地失败记录，由调度器在结束后合并
    pub failures: Vec<FailureRecord>,
}

/// 处理一个分组
pub async fn process_group(
    flow: &PartFlow,
    items: &[WorkItem],
    group_index: usize,
    total_groups: usize,
) -> GroupReport {
    log_group_start(group_index, total_groups, items.len());

    let mut report = GroupReport::default();
    for item in items {
        let result = match AssertUnwindSafe(flow.run(item)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(FetchError::WorkerAborted(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(_) => report.succeeded += 1,
            Err(e) => {
                error!("{} ❌ 下载失败: {}", item, e);
                report.failures.push(FailureRecord::new(item.clone(), &e));
            }
        }
    }

    log_group_complete(group_index, &report, items.len());
    report
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}

// ========== 日志辅助函数 ==========

fn log_group_start(group_index: usize, total_groups: usize, size: usize) {
    info!(
        "📦 [分组 {}/{}] 开始处理 {} 个分区",
        group_index, total_groups, size
    );
}

fn log_group_complete(group_index: usize, report: &GroupReport, total: usize) {
    info!(
        "✓ [分组 {}] 完成: 成功 {}/{}, 失败 {}",
        group_index,
        report.succeeded,
        total,
        report.failures.len()
    );
}
