//! # eroll_fetch
//!
//! 选民名册 PDF 批量下载工具：遍历已落盘的 邦 → 区 → 选区 → 分区 元数据，
//! 为每个分区获取一批已求解的验证码，逐个尝试受保护的下载接口，直到成功或整批用完。
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 与外部 HTTP 服务交互，只暴露能力 trait
//! - `CaptchaClient` - 验证码求解服务
//! - `EciClient` - 语言列表 / PDF 下载接口
//!
//! ### ② 业务能力层（Services）
//! - `LanguageResolver` - 按优先级选择语言
//! - `ArtifactWriter` - 解码并安全落盘
//! - `FailureLedger` - 失败台账
//!
//! ### ③ 流程层（Workflow）
//! - `RetryCoordinator` - 单个分区的验证码重试状态机
//! - `PartFlow` - 下载 → 落盘
//!
//! ### ④ 编排层（Orchestration）
//! - `Scheduler` - 分组 + 并发控制
//! - `App` - 一次运行的完整生命周期

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{FetchError, FetchResult};
pub use models::{CaptchaBatch, CaptchaToken, FailureRecord, FetchOutcome, WorkItem};
pub use orchestrator::{App, RunReport, Scheduler};
pub use services::{ArtifactWriter, FailureLedger};
pub use workflow::{PartFlow, RetryCoordinator};
