//! # OpenBid Hook Engine
//!
//! Hook引擎在 `openbid-core` 的执行组调度之上，提供面向服务的配置管理、阶段调度和监控统计能力。
//!
//! ## 核心职责
//!
//! - **配置管理**：从 TOML/JSON 配置文件或配置目录加载宿主执行计划与模块开关，并进行校验
//! - **阶段调度**：合并宿主与账户执行计划，按阶段调用 `StageExecutor`
//! - **监控统计**：收集Hook执行指标与执行记录，提供告警能力
//!
//! ## 架构设计
//!
//! - **domain层**：配置模型、执行记录与统计模型
//! - **infrastructure层**：配置加载、监控统计
//! - **service层**：阶段执行门面

pub mod domain;
pub mod infrastructure;
pub mod service;

pub use domain::models::{
    AccountHooksConfig, HookEngineConfig, HookExecutionRecord, HookStatistics, HooksConfig,
};
pub use infrastructure::config::{
    ConfigLoader, ConfigLoaderItem, ConfigMerger, ConfigValidator, DirectoryConfigLoader,
    FileConfigLoader,
};
pub use infrastructure::monitoring::{AlertTrigger, ExecutionRecorder, MetricsCollector};
pub use service::HookStageExecutor;
