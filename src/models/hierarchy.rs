//! 邦 → 区 → 选区 → 分区 层级元数据

use serde::{Deserialize, Serialize};

use super::work_item::{PartRecord, WorkItem};

/// 单个邦的元数据（state.json）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMetadata {
    pub state_cd: String,
    #[serde(default)]
    pub state_name: String,
    #[serde(default)]
    pub districts: Vec<DistrictMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictMetadata {
    #[serde(default)]
    pub district_cd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_value: Option<String>,
    #[serde(default)]
    pub acs: Vec<ConstituencyMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstituencyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asmbly_no: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asmbly_name: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartRecord>,
}

impl StateMetadata {
    /// 展开为所有分区记录（保持元数据中的顺序）
    pub fn all_parts(&self) -> Vec<&PartRecord> {
        self.districts
            .iter()
            .flat_map(|d| d.acs.iter())
            .flat_map(|ac| ac.parts.iter())
            .collect()
    }

    /// 展开为下载任务
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.all_parts().into_iter().map(WorkItem::from).collect()
    }

    pub fn constituency_count(&self) -> usize {
        self.districts.iter().map(|d| d.acs.len()).sum()
    }

    /// 日志显示用名称
    pub fn display_name(&self) -> &str {
        if self.state_name.is_empty() {
            &self.state_cd
        } else {
            &self.state_name
        }
    }
}

/// 展开多个邦的所有任务
pub fn flatten_states<'a>(states: impl IntoIterator<Item = &'a StateMetadata>) -> Vec<WorkItem> {
    states.into_iter().flat_map(|s| s.work_items()).collect()
}
