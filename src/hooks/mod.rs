//! 竞价 Hook 执行模块
//!
//! - 定义 Hook 标识、执行组、执行计划与执行记录
//! - `GroupExecutor` 按顺序执行执行组内的 Hook，负责超时、拒绝与故障隔离
//! - `StageExecutor` 串联同一阶段的多个执行组
//! - `HookExecutionContext` 持有请求级模块上下文与执行日志

mod context;
mod group;
mod plan;
mod provider;
mod registry;
mod stage;
mod timeout;
mod types;

pub use context::{HookExecutionContext, ModuleContext};
pub use group::{GroupExecutor, GroupResult};
pub use plan::{EndpointExecutionPlan, ExecutionPlan, Stage, StageExecutionPlan};
pub use provider::{
    EndpointContextProvider, FnHook, Hook, HookCallResult, HookProvider, InvocationContext,
    InvocationContextProvider,
};
pub use registry::HookCatalog;
pub use stage::{StageExecutor, StageResult};
pub use types::{
    ExecutionAction, ExecutionGroup, ExecutionStatus, GroupExecutionOutcome, HookExecutionOutcome,
    HookId, HookMessages, InvocationResult, InvocationStatus, StageExecutionOutcome,
};
