//! OpenBid Core 错误类型
//!
//! - `EngineError`：引擎级错误（Hook 解析、调度、配置）
//! - `HookError`：Hook 实现返回的调用错误，由执行组转换为执行记录

use thiserror::Error;

use crate::hooks::HookId;

/// 引擎级错误
#[derive(Debug, Error)]
pub enum EngineError {
    /// 目录中不存在对应的 Hook
    #[error("hook not found: {hook_id}")]
    HookNotFound { hook_id: HookId },

    /// Hook 解析失败（提供者内部错误）
    #[error("failed to resolve hook {hook_id}: {message}")]
    Resolution { hook_id: HookId, message: String },

    /// 调度失败（无法创建任务或定时器），整个执行组失败
    #[error("scheduling failure: {0}")]
    Scheduling(String),

    /// 配置错误
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        path: Option<String>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 配置格式错误
    #[error("failed to parse {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

impl EngineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: None,
        }
    }

    pub fn configuration_at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn resolution(hook_id: &HookId, message: impl Into<String>) -> Self {
        Self::Resolution {
            hook_id: hook_id.clone(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            format: "json",
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse {
            format: "toml",
            message: err.to_string(),
        }
    }
}

/// Hook 调用错误
#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
