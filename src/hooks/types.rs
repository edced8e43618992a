use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::context::ModuleContext;

/// Hook 标识（模块编码 + Hook 实现编码），在执行组内唯一
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HookId {
    pub module_code: String,
    pub hook_impl_code: String,
}

impl HookId {
    pub fn new<M: Into<String>, H: Into<String>>(module_code: M, hook_impl_code: H) -> Self {
        Self {
            module_code: module_code.into(),
            hook_impl_code: hook_impl_code.into(),
        }
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module_code, self.hook_impl_code)
    }
}

/// 执行组：按声明顺序串行执行的 Hook 序列
///
/// `timeout_ms` 对组内每个 Hook 单独生效，不随已消耗时间递减。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionGroup {
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub hook_sequence: Vec<HookId>,
}

impl ExecutionGroup {
    pub fn new(timeout_ms: u64, hook_sequence: Vec<HookId>) -> Self {
        Self {
            timeout_ms,
            hook_sequence,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_empty(&self) -> bool {
        self.hook_sequence.is_empty()
    }
}

/// Hook 自身报告的调用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Success,
    Failure,
}

/// Hook 输出的消息（调试、告警、错误）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookMessages {
    pub message: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub debug_messages: Vec<String>,
}

/// 单次 Hook 调用结果
#[derive(Debug, Clone)]
pub struct InvocationResult<P> {
    pub status: InvocationStatus,
    /// 替换后的载荷，`None` 表示不修改
    pub payload: Option<P>,
    /// 是否拒绝（是否生效取决于当前阶段是否允许拒绝）
    pub reject: bool,
    /// 写回模块上下文存储的新状态，`None` 会清除该模块已有状态
    pub module_context: Option<ModuleContext>,
    pub messages: HookMessages,
}

impl<P> InvocationResult<P> {
    pub fn succeeded() -> Self {
        Self {
            status: InvocationStatus::Success,
            payload: None,
            reject: false,
            module_context: None,
            messages: HookMessages::default(),
        }
    }

    pub fn failed<T: Into<String>>(message: T) -> Self {
        Self {
            status: InvocationStatus::Failure,
            ..Self::succeeded()
        }
        .with_message(message)
    }

    pub fn rejected<T: Into<String>>(message: T) -> Self {
        Self {
            reject: true,
            ..Self::succeeded()
        }
        .with_message(message)
    }

    pub fn with_payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_module_context(mut self, module_context: ModuleContext) -> Self {
        self.module_context = Some(module_context);
        self
    }

    pub fn with_message<T: Into<String>>(mut self, message: T) -> Self {
        self.messages.message = Some(message.into());
        self
    }

    pub fn with_error<T: Into<String>>(mut self, error: T) -> Self {
        self.messages.errors.push(error.into());
        self
    }

    pub fn with_warning<T: Into<String>>(mut self, warning: T) -> Self {
        self.messages.warnings.push(warning.into());
        self
    }

    pub fn with_debug_message<T: Into<String>>(mut self, message: T) -> Self {
        self.messages.debug_messages.push(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }

    /// 结果对应的执行动作（仅对成功调用有意义）
    pub fn action(&self) -> ExecutionAction {
        if self.reject {
            ExecutionAction::Reject
        } else if self.payload.is_some() {
            ExecutionAction::Update
        } else {
            ExecutionAction::NoAction
        }
    }
}

/// 执行记录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    Success,
    /// Hook 返回了失败状态
    Failure,
    Timeout,
    /// Hook 返回错误或 panic
    InvocationFault,
    /// Hook 完成但没有返回结果
    NullResult,
    ProviderResolutionFailure,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failure => "failure",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::InvocationFault => "invocation-fault",
            ExecutionStatus::NullResult => "null-result",
            ExecutionStatus::ProviderResolutionFailure => "provider-resolution-failure",
        };
        f.write_str(label)
    }
}

/// 执行记录动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionAction {
    NoAction,
    Update,
    Reject,
}

/// 单个 Hook 的执行记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookExecutionOutcome {
    pub hook_id: HookId,
    pub status: ExecutionStatus,
    /// 仅成功完成的调用才有动作
    pub action: Option<ExecutionAction>,
    pub execution_time_ms: u64,
    #[serde(flatten)]
    pub messages: HookMessages,
}

/// 执行组的执行记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupExecutionOutcome {
    pub hooks: Vec<HookExecutionOutcome>,
}

/// 阶段的执行记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageExecutionOutcome {
    /// 执行实体（如 `auction-request` 或某个 bidder 名称）
    pub entity: String,
    pub groups: Vec<GroupExecutionOutcome>,
}

impl StageExecutionOutcome {
    pub fn new<T: Into<String>>(entity: T) -> Self {
        Self {
            entity: entity.into(),
            groups: Vec::new(),
        }
    }

    pub fn hook_outcomes(&self) -> impl Iterator<Item = &HookExecutionOutcome> {
        self.groups.iter().flat_map(|group| group.hooks.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_group_deserialize() {
        let json = r#"{
            "timeout": 50,
            "hook-sequence": [
                {"module-code": "ortb2-blocking", "hook-impl-code": "bidder-request"},
                {"module-code": "richmedia-filter", "hook-impl-code": "processed-bidder-response"}
            ]
        }"#;

        let group: ExecutionGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.timeout(), Duration::from_millis(50));
        assert_eq!(group.hook_sequence.len(), 2);
        assert_eq!(
            group.hook_sequence[1],
            HookId::new("richmedia-filter", "processed-bidder-response")
        );
    }

    #[test]
    fn test_invocation_result_action() {
        let result = InvocationResult::<String>::succeeded();
        assert_eq!(result.action(), ExecutionAction::NoAction);

        let result = InvocationResult::succeeded().with_payload("updated".to_string());
        assert_eq!(result.action(), ExecutionAction::Update);

        // 同时修改载荷并拒绝时，动作为拒绝
        let result = InvocationResult::rejected("blocked").with_payload("updated".to_string());
        assert_eq!(result.action(), ExecutionAction::Reject);
        assert!(result.is_success());

        let result = InvocationResult::<String>::failed("bad input").with_error("missing imp");
        assert!(!result.is_success());
        assert_eq!(result.messages.message.as_deref(), Some("bad input"));
        assert_eq!(result.messages.errors, vec!["missing imp".to_string()]);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = HookExecutionOutcome {
            hook_id: HookId::new("module", "hook"),
            status: ExecutionStatus::ProviderResolutionFailure,
            action: None,
            execution_time_ms: 3,
            messages: HookMessages {
                message: Some("not found".to_string()),
                ..Default::default()
            },
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "provider-resolution-failure");
        assert_eq!(value["hook_id"]["module-code"], "module");
        assert_eq!(value["message"], "not found");
        assert_eq!(ExecutionStatus::InvocationFault.to_string(), "invocation-fault");
    }
}
