//! 元数据统计 - 业务能力层
//!
//! - 覆盖率：对比每个邦的分区总数和已落盘的 PDF 数量
//! - 报告：把各邦的分区/选区统计写成 JSON 文件（metrics.json、逐区文件、missing_data.json）

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::models::loaders::state_loader::PARTS_FILE;
use crate::models::{ConstituencyMetadata, DistrictMetadata, LoadedState, PartRecord};
use crate::services::artifact_writer::PDF_DIR;
use crate::utils::paths::is_plain_segment;

/// 汇总指标文件
pub const METRICS_FILE: &str = "metrics.json";
/// 归属不一致的分区记录
pub const MISSING_DATA_FILE: &str = "missing_data.json";
/// 逐区报告所在子目录
pub const STATES_DIR: &str = "states";

/// 单个邦的统计
#[derive(Debug, Clone, PartialEq)]
pub struct StateInsight {
    pub state_cd: String,
    pub state_name: String,
    pub constituencies: usize,
    pub parts: usize,
    pub pdfs: usize,
}

impl StateInsight {
    /// 覆盖率（百分比）
    pub fn coverage(&self) -> f64 {
        if self.parts == 0 {
            0.0
        } else {
            self.pdfs as f64 * 100.0 / self.parts as f64
        }
    }
}

/// metrics.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_parts: usize,
    pub parts_per_state: BTreeMap<String, usize>,
    pub constituencies_per_state: BTreeMap<String, usize>,
    pub state_names: Vec<String>,
}

/// 单个区的报告：选区 → 分区号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictReport {
    pub name: String,
    pub constituencies: Vec<ConstituencyReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituencyReport {
    pub name: String,
    pub parts: Vec<u32>,
}

/// 挂在某个选区下、但区代码或选区号与之不符的分区
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingEntry {
    pub district: String,
    pub constituency: String,
    pub invalid_parts: Vec<PartRecord>,
}

/// 读取邦的分区列表
///
/// 优先取 parts.json，不存在时展开 state.json
pub async fn load_parts(state: &LoadedState) -> Result<Vec<PartRecord>> {
    let parts_file = state.dir.join(PARTS_FILE);
    if !parts_file.exists() {
        return Ok(state.metadata.all_parts().into_iter().cloned().collect());
    }

    let content = fs::read_to_string(&parts_file)
        .await
        .with_context(|| format!("无法读取分区列表: {}", parts_file.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("无法解析分区列表: {}", parts_file.display()))
}

/// 统计单个邦的下载覆盖率
pub async fn collect_state_insight(state: &LoadedState, output_root: &Path) -> Result<StateInsight> {
    let metadata = &state.metadata;
    let parts = load_parts(state).await?.len();

    let pdfs = if is_plain_segment(&metadata.state_cd) {
        count_pdfs(&output_root.join(&metadata.state_cd).join(PDF_DIR)).await?
    } else {
        warn!("邦代码不是合法的目录名，跳过 PDF 统计: {:?}", metadata.state_cd);
        0
    };

    Ok(StateInsight {
        state_cd: metadata.state_cd.clone(),
        state_name: metadata.display_name().to_string(),
        constituencies: metadata.constituency_count(),
        parts,
        pdfs,
    })
}

async fn count_pdfs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("无法读取目录: {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && entry.file_type().await?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// 生成统计报告并写入 `insights_dir`
///
/// - `metrics.json`：分区总数、各邦分区数和选区数、邦名列表
/// - `states/<邦目录>/<区代码>.json`：每个区的选区与分区号
/// - `missing_data.json`：归属不一致的分区记录，按邦名分组
pub async fn generate_insights(states: &[LoadedState], insights_dir: &Path) -> Result<Metrics> {
    fs::create_dir_all(insights_dir)
        .await
        .with_context(|| format!("无法创建统计目录: {}", insights_dir.display()))?;

    let mut metrics = Metrics::default();
    let mut missing: BTreeMap<String, Vec<MissingEntry>> = BTreeMap::new();

    for state in states {
        let name = state.metadata.display_name().to_string();
        let parts = load_parts(state).await?;

        metrics.total_parts += parts.len();
        metrics.parts_per_state.insert(name.clone(), parts.len());
        metrics
            .constituencies_per_state
            .insert(name.clone(), state.metadata.constituency_count());
        metrics.state_names.push(name.clone());

        let state_missing = missing.entry(name.clone()).or_default();
        for district in &state.metadata.districts {
            state_missing.extend(find_mismatched_parts(district));
        }

        let written = write_district_reports(state, &insights_dir.join(STATES_DIR)).await?;
        info!("📝 {} 已写入 {} 个区的报告", name, written);
    }

    write_json(&insights_dir.join(METRICS_FILE), &metrics).await?;
    write_json(&insights_dir.join(MISSING_DATA_FILE), &missing).await?;

    info!("✅ 统计报告已写入: {}", insights_dir.display());
    Ok(metrics)
}

/// 逐区写出报告，文件目录使用加载时的邦目录名
async fn write_district_reports(state: &LoadedState, states_root: &Path) -> Result<usize> {
    let Some(folder) = state.dir.file_name() else {
        anyhow::bail!("无法确定邦目录名: {}", state.dir.display());
    };
    let dir = states_root.join(folder);
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("无法创建目录: {}", dir.display()))?;

    let mut written = 0;
    for district in &state.metadata.districts {
        if !is_plain_segment(&district.district_cd) {
            warn!("区代码不是合法的文件名，跳过: {:?}", district.district_cd);
            continue;
        }
        let path = dir.join(format!("{}.json", district.district_cd));
        write_json(&path, &district_report(district)).await?;
        written += 1;
    }
    Ok(written)
}

pub fn district_report(district: &DistrictMetadata) -> DistrictReport {
    DistrictReport {
        name: district_name(district),
        constituencies: district
            .acs
            .iter()
            .map(|ac| ConstituencyReport {
                name: constituency_name(ac),
                parts: ac.parts.iter().map(|p| p.part_number).collect(),
            })
            .collect(),
    }
}

/// 找出区代码或选区号与所在位置不一致的分区
pub fn find_mismatched_parts(district: &DistrictMetadata) -> Vec<MissingEntry> {
    district
        .acs
        .iter()
        .filter_map(|ac| {
            let invalid_parts: Vec<PartRecord> = ac
                .parts
                .iter()
                .filter(|p| {
                    p.district_cd != district.district_cd
                        || ac.asmbly_no.is_some_and(|no| no != p.ac_number)
                })
                .cloned()
                .collect();

            (!invalid_parts.is_empty()).then(|| MissingEntry {
                district: district_name(district),
                constituency: constituency_name(ac),
                invalid_parts,
            })
        })
        .collect()
}

fn district_name(district: &DistrictMetadata) -> String {
    district
        .district_value
        .clone()
        .unwrap_or_else(|| district.district_cd.clone())
}

fn constituency_name(ac: &ConstituencyMetadata) -> String {
    match (&ac.asmbly_name, ac.asmbly_no) {
        (Some(name), _) => name.clone(),
        (None, Some(no)) => no.to_string(),
        (None, None) => String::new(),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)
        .await
        .with_context(|| format!("无法写入文件: {}", path.display()))
}

/// 输出统计表
pub fn log_insights(insights: &[StateInsight]) {
    info!("{}", "=".repeat(60));
    info!("📊 下载覆盖率");
    info!("{}", "=".repeat(60));
    for s in insights {
        info!(
            "{} ({}): 选区 {}, 分区 {}, 已下载 {} ({:.1}%)",
            s.state_name,
            s.state_cd,
            s.constituencies,
            s.parts,
            s.pdfs,
            s.coverage()
        );
    }
    let parts: usize = insights.iter().map(|s| s.parts).sum();
    let pdfs: usize = insights.iter().map(|s| s.pdfs).sum();
    info!("{}", "─".repeat(60));
    info!("合计: 分区 {}, 已下载 {}", parts, pdfs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StateMetadata;

    const STATE_JSON: &str = r#"{
        "stateCd": "S07",
        "stateName": "Haryana",
        "districts": [
            { "districtCd": "S0702", "districtValue": "Sirsa", "acs": [
                { "asmblyNo": 4, "asmblyName": "Kalanwali", "parts": [
                    { "stateCd": "S07", "districtCd": "S0702", "acNumber": 4, "partNumber": 1 },
                    { "stateCd": "S07", "districtCd": "S0702", "acNumber": 4, "partNumber": 2 },
                    { "stateCd": "S07", "districtCd": "S0702", "acNumber": 9, "partNumber": 3 }
                ]},
                { "asmblyNo": 5, "parts": [
                    { "stateCd": "S07", "districtCd": "S0702", "acNumber": 5, "partNumber": 4 }
                ]}
            ]},
            { "districtCd": "../escape", "acs": [] }
        ]
    }"#;

    fn loaded(dir: &Path) -> LoadedState {
        let metadata: StateMetadata = serde_json::from_str(STATE_JSON).unwrap();
        LoadedState {
            dir: dir.to_path_buf(),
            metadata,
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
        serde_json::from_str(&fs::read_to_string(path).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_insight_counts_pdfs_only() {
        let root = tempfile::tempdir().unwrap();
        let pdf_dir = root.path().join("S07").join(PDF_DIR);
        fs::create_dir_all(&pdf_dir).await.unwrap();
        fs::write(pdf_dir.join("a.pdf"), b"x").await.unwrap();
        fs::write(pdf_dir.join("b.PDF"), b"x").await.unwrap();
        fs::write(pdf_dir.join("notes.txt"), b"x").await.unwrap();

        let state = loaded(&root.path().join("S07"));
        let insight = collect_state_insight(&state, root.path()).await.unwrap();

        assert_eq!(insight.parts, 4);
        assert_eq!(insight.pdfs, 2);
        assert_eq!(insight.constituencies, 2);
        assert!((insight.coverage() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_insight_without_output() {
        let root = tempfile::tempdir().unwrap();
        let state = loaded(&root.path().join("S07"));
        let insight = collect_state_insight(&state, root.path()).await.unwrap();
        assert_eq!(insight.pdfs, 0);
        assert_eq!(insight.coverage(), 0.0);
    }

    #[tokio::test]
    async fn test_insight_prefers_parts_index() {
        let root = tempfile::tempdir().unwrap();
        let state_dir = root.path().join("S07");
        fs::create_dir_all(&state_dir).await.unwrap();
        let state = loaded(&state_dir);
        let first: Vec<&PartRecord> = state.metadata.all_parts().into_iter().take(1).collect();
        fs::write(state_dir.join(PARTS_FILE), serde_json::to_string(&first).unwrap())
            .await
            .unwrap();

        let insight = collect_state_insight(&state, root.path()).await.unwrap();
        assert_eq!(insight.parts, 1);
    }

    #[tokio::test]
    async fn test_generate_insights_writes_reports() {
        let root = tempfile::tempdir().unwrap();
        let insights_dir = root.path().join("insights");
        let state = loaded(&root.path().join("states").join("S07"));

        let metrics = generate_insights(std::slice::from_ref(&state), &insights_dir)
            .await
            .unwrap();

        assert_eq!(metrics.total_parts, 4);
        let written: Metrics = read_json(&insights_dir.join(METRICS_FILE)).await;
        assert_eq!(written, metrics);
        assert_eq!(written.parts_per_state["Haryana"], 4);
        assert_eq!(written.constituencies_per_state["Haryana"], 2);
        assert_eq!(written.state_names, vec!["Haryana"]);

        let raw: serde_json::Value = read_json(&insights_dir.join(METRICS_FILE)).await;
        assert_eq!(raw["totalParts"], 4);

        let district: DistrictReport =
            read_json(&insights_dir.join(STATES_DIR).join("S07").join("S0702.json")).await;
        assert_eq!(district.name, "Sirsa");
        assert_eq!(district.constituencies[0].name, "Kalanwali");
        assert_eq!(district.constituencies[0].parts, vec![1, 2, 3]);
        assert_eq!(district.constituencies[1].name, "5");

        // 非法区代码不会生成文件
        assert!(!insights_dir.join(STATES_DIR).join("escape.json").exists());
        assert!(!root.path().join("escape.json").exists());

        let missing: BTreeMap<String, Vec<MissingEntry>> =
            read_json(&insights_dir.join(MISSING_DATA_FILE)).await;
        let entries = &missing["Haryana"];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].constituency, "Kalanwali");
        assert_eq!(entries[0].invalid_parts[0].part_number, 3);
    }

    #[tokio::test]
    async fn test_generate_insights_with_no_states() {
        let root = tempfile::tempdir().unwrap();
        let metrics = generate_insights(&[], root.path()).await.unwrap();

        assert_eq!(metrics, Metrics::default());
        assert!(root.path().join(METRICS_FILE).exists());
        assert!(root.path().join(MISSING_DATA_FILE).exists());
    }
}
