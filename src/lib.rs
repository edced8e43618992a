//! OpenBid Core 公共库
//!
//! 提供竞价请求生命周期中的 Hook 执行引擎：
//! - Hook 标识、执行组、执行计划等模型定义
//! - 执行组（GroupExecutor）与阶段（StageExecutor）调度
//! - 请求级模块上下文存储与执行结果日志
//! - 统一的错误类型与日志初始化

pub mod config;
pub mod error;
pub mod hooks;
pub mod telemetry;

pub use config::LoggingConfig;
pub use error::*;
pub use hooks::*;
