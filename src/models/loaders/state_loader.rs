use crate::models::hierarchy::StateMetadata;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 每个邦目录下的元数据文件
pub const STATE_FILE: &str = "state.json";
/// 展开后的分区列表文件
pub const PARTS_FILE: &str = "parts.json";

/// 已加载的邦元数据及其所在目录
///
/// 派生文件（parts.json）只写回 `dir`，不使用 state.json 里的 `stateCd` 拼路径
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub dir: PathBuf,
    pub metadata: StateMetadata,
}

/// 从 state.json 加载单个邦的元数据
pub async fn load_state_metadata(state_file: &Path) -> Result<StateMetadata> {
    let content = fs::read_to_string(state_file)
        .await
        .with_context(|| format!("无法读取元数据文件: {}", state_file.display()))?;

    let state: StateMetadata = serde_json::from_str(&content)
        .with_context(|| format!("无法解析元数据文件: {}", state_file.display()))?;

    Ok(state)
}

/// 加载目录下所有邦的元数据
///
/// - 目录按名称排序遍历，隐藏文件和普通文件跳过
/// - 没有 state.json 的目录跳过
/// - `filter` 非空时只加载指定的邦代码
///
/// 目录不可读或 state.json 格式错误视为致命错误
pub async fn load_all_states(states_dir: &Path, filter: &[String]) -> Result<Vec<LoadedState>> {
    if !states_dir.exists() {
        anyhow::bail!("元数据目录不存在: {}", states_dir.display());
    }

    let mut state_dirs: Vec<PathBuf> = Vec::new();
    let mut entries = fs::read_dir(states_dir)
        .await
        .with_context(|| format!("无法读取元数据目录: {}", states_dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || !entry.file_type().await?.is_dir() {
            continue;
        }
        if !filter.is_empty() && !filter.iter().any(|code| code.eq_ignore_ascii_case(&name)) {
            continue;
        }
        state_dirs.push(entry.path());
    }
    state_dirs.sort();

    let mut states = Vec::new();
    for dir in state_dirs {
        let state_file = dir.join(STATE_FILE);
        if !state_file.exists() {
            tracing::warn!("跳过没有 {} 的目录: {}", STATE_FILE, dir.display());
            continue;
        }

        let metadata = load_state_metadata(&state_file).await?;
        tracing::info!(
            "成功加载 {}: {} 个选区, {} 个分区",
            metadata.display_name(),
            metadata.constituency_count(),
            metadata.all_parts().len()
        );
        states.push(LoadedState { dir, metadata });
    }

    Ok(states)
}

/// 将邦内所有分区展开写入该邦目录下的 parts.json
pub async fn write_parts_index(state: &LoadedState) -> Result<PathBuf> {
    let path = state.dir.join(PARTS_FILE);
    let content = serde_json::to_string_pretty(&state.metadata.all_parts())?;
    fs::write(&path, content)
        .await
        .with_context(|| format!("无法写入分区列表: {}", path.display()))?;

    Ok(path)
}
