//! PDF 写入服务 - 业务能力层
//!
//! 只负责"把下载内容安全落盘"能力：校验、解码、生成文件名、写入

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::models::WorkItem;
use crate::utils::paths::is_plain_segment;

/// 邦目录下存放 PDF 的子目录
pub const PDF_DIR: &str = "pdfs";

/// PDF 写入服务
///
/// 保证：
/// - 最终路径一定位于输出根目录之内
/// - 不覆盖已存在的文件
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 以当前时间为采集时间写入
    pub async fn store(&self, payload: &[u8], item: &WorkItem) -> FetchResult<PathBuf> {
        self.store_at(payload, item, Utc::now()).await
    }

    /// 解码 base64 内容并写入 `<root>/<stateCd>/pdfs/<文件名>`
    pub async fn store_at(
        &self,
        payload: &[u8],
        item: &WorkItem,
        captured_at: DateTime<Utc>,
    ) -> FetchResult<PathBuf> {
        let encoded = payload.trim_ascii();
        if encoded.is_empty() {
            return Err(FetchError::EmptyPayload);
        }

        let bytes = STANDARD.decode(encoded)?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyPayload);
        }

        let file_name = sanitize_file_name(&artifact_file_name(item, captured_at))?;
        let dir = self.prepare_state_dir(&item.state_cd).await?;
        let path = dir.join(file_name);

        write_new_file(&path, &bytes).await?;
        debug!("{} 已写入 {} 字节: {}", item, bytes.len(), path.display());

        Ok(path)
    }

    /// 创建并校验邦的 PDF 目录
    ///
    /// 邦代码必须是单个普通路径段；逐级创建目录，每一级都先用规范化路径
    /// 确认仍在根目录之内，再创建下一级
    async fn prepare_state_dir(&self, state_cd: &str) -> FetchResult<PathBuf> {
        if !is_plain_segment(state_cd) {
            return Err(FetchError::InvalidDestinationPath(format!(
                "邦代码不是合法的目录名: {:?}",
                state_cd
            )));
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| FetchError::io(&self.root, e))?;
        let root = fs::canonicalize(&self.root)
            .await
            .map_err(|e| FetchError::io(&self.root, e))?;

        let mut dir = root.clone();
        for segment in [state_cd, PDF_DIR] {
            let next = dir.join(segment);
            // 已存在（包括并发创建）时继续校验
            match fs::create_dir(&next).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(FetchError::io(&next, e)),
            }

            let resolved = fs::canonicalize(&next)
                .await
                .map_err(|e| FetchError::io(&next, e))?;
            if !resolved.starts_with(&root) {
                return Err(FetchError::InvalidDestinationPath(format!(
                    "{} 不在输出目录 {} 之内",
                    resolved.display(),
                    root.display()
                )));
            }
            dir = resolved;
        }

        Ok(dir)
    }
}

/// 根据分区字段和采集时间生成文件名
///
/// 例：`S07_districtS0702_ac4_part12_supplement_1718000000000.pdf`
pub fn artifact_file_name(item: &WorkItem, captured_at: DateTime<Utc>) -> String {
    format!(
        "{}_district{}_ac{}_part{}{}_{}.pdf",
        item.state_cd,
        item.district_cd,
        item.ac_number,
        item.part_number,
        if item.is_supplement { "_supplement" } else { "" },
        captured_at.timestamp_millis()
    )
}

/// 去掉文件名中的目录部分，只保留最后一段
pub fn sanitize_file_name(name: &str) -> FetchResult<PathBuf> {
    let normalized = name.replace('\\', "/");
    match Path::new(&normalized).file_name() {
        Some(base) if !base.is_empty() => Ok(PathBuf::from(base)),
        _ => Err(FetchError::InvalidDestinationPath(format!(
            "无法从 {:?} 得到文件名",
            name
        ))),
    }
}

async fn write_new_file(path: &Path, bytes: &[u8]) -> FetchResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => FetchError::ArtifactAlreadyExists(path.to_path_buf()),
            _ => FetchError::io(path, e),
        })?;

    file.write_all(bytes)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    file.sync_all().await.map_err(|e| FetchError::io(path, e))?;

    Ok(())
}
