//! # Hook引擎服务层
//!
//! 阶段执行门面：绑定执行计划、Hook目录、模块开关与监控

pub mod executor;

pub use executor::HookStageExecutor;
