//! 分区任务（WorkItem）
//!
//! 一个 WorkItem 对应一个需要下载的选民名册分区（邦 / 区 / 选区 / 分区）

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// state.json 中的单个分区记录
///
/// 只解析下载所需的字段，其余字段忽略
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartRecord {
    pub state_cd: String,
    pub district_cd: String,
    pub ac_number: u32,
    pub part_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_supplement: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_cd: Option<String>,
}

/// 单个分区下载任务
///
/// 创建后不可变，由层级元数据展开得到
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub state_cd: String,
    pub district_cd: String,
    pub ac_number: u32,
    pub part_number: u32,
    pub is_supplement: bool,
    /// 元数据中已确定的语言代码；为空时由语言解析器查询
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl WorkItem {
    pub fn new(
        state_cd: impl Into<String>,
        district_cd: impl Into<String>,
        ac_number: u32,
        part_number: u32,
    ) -> Self {
        Self {
            state_cd: state_cd.into(),
            district_cd: district_cd.into(),
            ac_number,
            part_number,
            is_supplement: false,
            language: None,
        }
    }

    pub fn supplement(mut self) -> Self {
        self.is_supplement = true;
        self
    }

    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.language = Some(code.into());
        self
    }
}

impl From<&PartRecord> for WorkItem {
    fn from(part: &PartRecord) -> Self {
        Self {
            state_cd: part.state_cd.clone(),
            district_cd: part.district_cd.clone(),
            ac_number: part.ac_number,
            part_number: part.part_number,
            is_supplement: part.is_supplement.unwrap_or(false),
            language: part.lang_cd.clone().filter(|c| !c.trim().is_empty()),
        }
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}/AC{}/P{}{}]",
            self.state_cd,
            self.district_cd,
            self.ac_number,
            self.part_number,
            if self.is_supplement { "/补充" } else { "" }
        )
    }
}
