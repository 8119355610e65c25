//! 下载结果与失败记录

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::work_item::WorkItem;
use crate::error::FetchError;

/// 单次（或整体）下载尝试的结果
#[derive(Debug)]
pub enum FetchOutcome {
    /// 下载成功，内容为接口返回的原始文件字段（base64 文本）
    Success(Vec<u8>),
    /// 下载失败
    Failure(FetchError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<Vec<u8>, FetchError> {
        match self {
            FetchOutcome::Success(bytes) => Ok(bytes),
            FetchOutcome::Failure(e) => Err(e),
        }
    }
}

impl From<Result<Vec<u8>, FetchError>> for FetchOutcome {
    fn from(result: Result<Vec<u8>, FetchError>) -> Self {
        match result {
            Ok(bytes) => FetchOutcome::Success(bytes),
            Err(e) => FetchOutcome::Failure(e),
        }
    }
}

/// 失败台账中的一条记录，创建后不再修改
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub item: WorkItem,
    /// 错误类别（FetchError 变体名）
    pub kind: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(item: WorkItem, error: &FetchError) -> Self {
        Self {
            item,
            kind: error.kind().to_string(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_conversions() {
        let ok: FetchOutcome = Ok(b"abc".to_vec()).into();
        assert!(ok.is_success());
        assert_eq!(ok.into_result().unwrap(), b"abc");

        let failed: FetchOutcome = Err(FetchError::EmptyPayload).into();
        assert!(!failed.is_success());
        assert!(matches!(failed.into_result(), Err(FetchError::EmptyPayload)));
    }

    #[test]
    fn test_failure_record_serializes_item_and_kind() {
        let record = FailureRecord::new(
            WorkItem::new("S07", "S0702", 4, 12),
            &FetchError::SolverUnavailable("connection refused".to_string()),
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["kind"], "SolverUnavailable");
        assert_eq!(json["item"]["stateCd"], "S07");
        assert_eq!(json["item"]["partNumber"], 12);
        assert!(json["reason"].as_str().unwrap().contains("connection refused"));
    }
}
