//! 失败台账 - 业务能力层
//!
//! 汇总整个运行过程中所有分区的失败记录，运行结束时一次性写出

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::error::FetchError;
use crate::models::{FailureRecord, WorkItem};

/// 失败台账
///
/// 只追加；内部互斥锁只在追加/读取时持有，不跨越任何 await
#[derive(Debug, Default)]
pub struct FailureLedger {
    records: Mutex<Vec<FailureRecord>>,
}

/// 写出的台账文件结构
#[derive(Serialize)]
struct LedgerFile<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    total: usize,
    by_kind: BTreeMap<String, usize>,
    failures: &'a [FailureRecord],
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个分区的失败
    pub fn record(&self, item: WorkItem, error: &FetchError) {
        self.push(FailureRecord::new(item, error));
    }

    pub fn push(&self, record: FailureRecord) {
        self.lock().push(record);
    }

    /// 合并其他分组的本地记录
    pub fn extend(&self, records: impl IntoIterator<Item = FailureRecord>) {
        self.lock().extend(records);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 当前所有记录的快照
    pub fn records(&self) -> Vec<FailureRecord> {
        self.lock().clone()
    }

    pub fn into_records(self) -> Vec<FailureRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 按错误类别统计
    pub fn count_by_kind(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.lock().iter() {
            *counts.entry(record.kind.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// 把台账写成 JSON 文件（覆盖旧文件）
    pub fn flush(&self, path: &Path) -> Result<()> {
        let records = self.records();
        let file = LedgerFile {
            generated_at: chrono::Utc::now(),
            total: records.len(),
            by_kind: self.count_by_kind(),
            failures: &records,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建目录: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, content)
            .with_context(|| format!("无法写入失败台账: {}", path.display()))?;

        debug!("失败台账已写入: {} ({} 条)", path.display(), records.len());
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FailureRecord>> {
        // 台账只做追加，中毒后数据依然可用
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
