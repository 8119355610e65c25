use std::path::PathBuf;

use thiserror::Error;

/// 单个分区（WorkItem）处理过程中可能出现的错误
///
/// 这些错误都在 WorkItem 边界被捕获并写入失败台账，不会中断其他分组。
/// 整体运行级别的致命错误（元数据目录不可读等）使用 `anyhow::Result`。
#[derive(Debug, Error)]
pub enum FetchError {
    /// 验证码求解服务不可达，或返回了空的/格式错误的验证码列表
    #[error("验证码求解服务不可用: {0}")]
    SolverUnavailable(String),

    /// 语言接口返回的语言列表为空
    #[error("该选区没有可用的语言")]
    NoLanguagesAvailable,

    /// 语言解析失败（包装底层原因）
    #[error("语言解析失败: {0}")]
    LanguageResolutionFailed(#[source] Box<FetchError>),

    /// 响应成功但缺少文件内容
    #[error("响应中没有文件内容")]
    EmptyPayload,

    /// base64 文件内容解码失败
    #[error("文件内容解码失败: {0}")]
    DecodeError(#[from] base64::DecodeError),

    /// 目标路径不合法（会逃逸出输出根目录）
    #[error("非法的目标路径: {0}")]
    InvalidDestinationPath(String),

    /// 目标文件已存在，拒绝覆盖
    #[error("文件已存在: {}", .0.display())]
    ArtifactAlreadyExists(PathBuf),

    /// 整批验证码全部尝试失败
    #[error("{attempts} 个验证码全部失败{}", last_reason(.last))]
    AllCaptchasExhausted {
        attempts: usize,
        last: Option<Box<FetchError>>,
    },

    /// 网络请求失败或响应体无法解析
    #[error("请求失败 ({endpoint}): {message}")]
    TransportError { endpoint: String, message: String },

    /// 接口返回非 2xx 状态码
    #[error("接口返回异常状态 ({endpoint}): HTTP {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 分组任务异常退出
    #[error("分组任务异常退出: {0}")]
    WorkerAborted(String),
}

fn last_reason(last: &Option<Box<FetchError>>) -> String {
    match last {
        Some(e) => format!(" (最后一次: {})", e),
        None => String::new(),
    }
}

impl FetchError {
    /// 稳定的错误类别名，写入失败台账
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::SolverUnavailable(_) => "SolverUnavailable",
            FetchError::NoLanguagesAvailable => "NoLanguagesAvailable",
            FetchError::LanguageResolutionFailed(_) => "LanguageResolutionFailed",
            FetchError::EmptyPayload => "EmptyPayload",
            FetchError::DecodeError(_) => "DecodeError",
            FetchError::InvalidDestinationPath(_) => "InvalidDestinationPath",
            FetchError::ArtifactAlreadyExists(_) => "ArtifactAlreadyExists",
            FetchError::AllCaptchasExhausted { .. } => "AllCaptchasExhausted",
            FetchError::TransportError { .. } => "TransportError",
            FetchError::UnexpectedStatus { .. } => "UnexpectedStatus",
            FetchError::Io { .. } => "Io",
            FetchError::WorkerAborted(_) => "WorkerAborted",
        }
    }

    /// 创建网络请求失败错误
    pub fn transport(endpoint: impl Into<String>, source: impl std::fmt::Display) -> Self {
        FetchError::TransportError {
            endpoint: endpoint.into(),
            message: source.to_string(),
        }
    }

    /// 创建文件写入错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// 单个分区处理结果类型
pub type FetchResult<T> = Result<T, FetchError>;
