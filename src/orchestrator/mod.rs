//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 运行入口
//! - 管理一次运行的生命周期（加载元数据、调度、写台账、统计）
//!
//! ### `scheduler` - 分组调度
//! - 切分分组，使用 Semaphore 控制并发分组数
//! - 合并各分组的失败记录
//!
//! ### `group_processor` - 单个分组
//! - 组内按顺序处理分区
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<StateMetadata>)
//!     ↓
//! scheduler (处理 Vec<Vec<WorkItem>>)
//!     ↓
//! group_processor (处理 Vec<WorkItem>)
//!     ↓
//! workflow::PartFlow (处理单个 WorkItem)
//!     ↓
//! services / clients
//! ```

pub mod batch_processor;
pub mod group_processor;
pub mod scheduler;

pub use batch_processor::App;
pub use group_processor::{process_group, GroupReport};
pub use scheduler::{partition, RunReport, Scheduler};
