//! 分组调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **分组**：把展开后的分区按 `group_size` 切成连续的分组
//! 2. **并发控制**：使用 Semaphore 限制同时运行的分组数量
//! 3. **失败隔离**：每个分组维护本地失败记录，全部完成后合并到 FailureLedger
//!
//! 组内顺序执行，组间并行；不同分组之间的完成顺序不做保证。

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::error;

use crate::error::FetchError;
use crate::models::{FailureRecord, WorkItem};
use crate::orchestrator::group_processor::{self, GroupReport};
use crate::services::FailureLedger;
use crate::workflow::PartFlow;

/// 一次运行的汇总
#[derive(Debug)]
pub struct RunReport {
    pub total: usize,
    pub succeeded: usize,
    pub ledger: FailureLedger,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.ledger.len()
    }
}

/// 分组调度器
pub struct Scheduler {
    flow: Arc<PartFlow>,
    concurrency: usize,
    group_size: usize,
}

impl Scheduler {
    /// `concurrency` 和 `group_size` 为 0 时按 1 处理
    pub fn new(flow: Arc<PartFlow>, concurrency: usize, group_size: usize) -> Self {
        Self {
            flow,
            concurrency: concurrency.max(1),
            group_size: group_size.max(1),
        }
    }

    /// 处理所有分区，返回汇总（含失败台账）
    pub async fn run(&self, items: Vec<WorkItem>) -> RunReport {
        let total = items.len();
        let groups = partition(items, self.group_size);
        let total_groups = groups.len();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total_groups);

        for (idx, group) in groups.into_iter().enumerate() {
            let group_index = idx + 1;
            // 信号量不会被关闭
            let permit = semaphore.clone().acquire_owned().await.ok();
            let flow = self.flow.clone();
            let members = group.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                group_processor::process_group(&flow, &group, group_index, total_groups).await
            });
            handles.push((group_index, members, handle));
        }

        let results = join_all(handles.iter_mut().map(|(_, _, handle)| handle)).await;

        let ledger = FailureLedger::new();
        let mut succeeded = 0;
        for ((group_index, members, _), result) in handles.into_iter().zip(results) {
            match result {
                Ok(GroupReport {
                    succeeded: ok,
                    failures,
                }) => {
                    succeeded += ok;
                    ledger.extend(failures);
                }
                // 分区级 panic 已在组内捕获；这里只剩任务被取消等情况，
                // 无法得知哪些分区已完成，整组记为 WorkerAborted
                Err(e) => {
                    error!("[分组 {}] 任务执行失败: {}", group_index, e);
                    let reason = FetchError::WorkerAborted(e.to_string());
                    ledger.extend(
                        members
                            .into_iter()
                            .map(|item| FailureRecord::new(item, &reason)),
                    );
                }
            }
        }

        RunReport {
            total,
            succeeded,
            ledger,
        }
    }
}

/// 切分为连续的分组，最后一组可能不满
pub fn partition(items: Vec<WorkItem>, group_size: usize) -> Vec<Vec<WorkItem>> {
    let size = group_size.max(1);
    let mut groups = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        groups.push(iter.by_ref().take(size).collect());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: u32) -> Vec<WorkItem> {
        (1..=n).map(|p| WorkItem::new("S07", "S0702", 4, p)).collect()
    }

    #[test]
    fn test_partition_contiguous() {
        let groups = partition(items(5), 2);
        let parts: Vec<Vec<u32>> = groups
            .iter()
            .map(|g| g.iter().map(|i| i.part_number).collect())
            .collect();
        assert_eq!(parts, vec![vec![1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn test_partition_edge_cases() {
        assert!(partition(Vec::new(), 3).is_empty());
        assert_eq!(partition(items(3), 0).len(), 3);
        assert_eq!(partition(items(3), 10).len(), 1);
    }
}
