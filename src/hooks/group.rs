use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::Result;

use super::context::HookExecutionContext;
use super::provider::{HookProvider, InvocationContextProvider};
use super::timeout::{RaceOutcome, execute_with_timeout};
use super::types::{
    ExecutionAction, ExecutionGroup, ExecutionStatus, GroupExecutionOutcome, HookExecutionOutcome,
    HookId, HookMessages, InvocationResult, InvocationStatus,
};

const REJECT_NOT_ALLOWED: &str = "rejection is not supported during this stage";

/// 耗时毫秒数，超出 `u64` 时饱和
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// 执行组的执行结果
///
/// 载荷只沿 Hook 声明顺序演进；一旦被拒绝，`rejected_by` 不会再被改写。
#[derive(Debug, Clone)]
pub struct GroupResult<P> {
    payload: P,
    reject_allowed: bool,
    rejected_by: Option<HookId>,
    outcomes: Vec<HookExecutionOutcome>,
}

impl<P> GroupResult<P> {
    pub fn new(payload: P, reject_allowed: bool) -> Self {
        Self {
            payload,
            reject_allowed,
            rejected_by: None,
            outcomes: Vec::new(),
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected_by.is_some()
    }

    pub fn rejected_by(&self) -> Option<&HookId> {
        self.rejected_by.as_ref()
    }

    pub fn reject_allowed(&self) -> bool {
        self.reject_allowed
    }

    /// 按执行顺序排列的 Hook 执行记录
    pub fn outcomes(&self) -> &[HookExecutionOutcome] {
        &self.outcomes
    }

    pub fn outcome_for(&self, hook_id: &HookId) -> Option<&HookExecutionOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| &outcome.hook_id == hook_id)
    }

    pub fn to_group_outcome(&self) -> GroupExecutionOutcome {
        GroupExecutionOutcome {
            hooks: self.outcomes.clone(),
        }
    }

    pub fn into_parts(self) -> (P, Option<HookId>, GroupExecutionOutcome) {
        (
            self.payload,
            self.rejected_by,
            GroupExecutionOutcome {
                hooks: self.outcomes,
            },
        )
    }

    /// 合并一次已完成调用的结果
    ///
    /// Hook 报告失败时忽略其载荷与拒绝标记；成功时先应用载荷再处理拒绝。
    pub(crate) fn apply_invocation_result(
        &mut self,
        hook_id: HookId,
        result: InvocationResult<P>,
        elapsed: Duration,
    ) {
        let action = result.action();
        let InvocationResult {
            status,
            payload,
            reject,
            mut messages,
            ..
        } = result;

        if status == InvocationStatus::Failure {
            self.push_outcome(hook_id, ExecutionStatus::Failure, None, elapsed, messages);
            return;
        }

        if let Some(payload) = payload {
            self.payload = payload;
        }

        if reject {
            if self.reject_allowed {
                if self.rejected_by.is_none() {
                    self.rejected_by = Some(hook_id.clone());
                }
            } else {
                warn!(hook = %hook_id, "hook requested rejection in a stage that does not allow it");
                messages.warnings.push(REJECT_NOT_ALLOWED.to_string());
            }
        }

        self.push_outcome(hook_id, ExecutionStatus::Success, Some(action), elapsed, messages);
    }

    /// 记录未产生结果的调用（解析失败、超时、调用异常、空结果）
    pub(crate) fn apply_failure(
        &mut self,
        hook_id: HookId,
        status: ExecutionStatus,
        message: String,
        elapsed: Duration,
    ) {
        let messages = HookMessages {
            message: Some(message),
            ..Default::default()
        };
        self.push_outcome(hook_id, status, None, elapsed, messages);
    }

    pub(crate) fn propagate_rejection(&self) -> ControlFlow<HookId> {
        match &self.rejected_by {
            Some(hook_id) => ControlFlow::Break(hook_id.clone()),
            None => ControlFlow::Continue(()),
        }
    }

    fn push_outcome(
        &mut self,
        hook_id: HookId,
        status: ExecutionStatus,
        action: Option<ExecutionAction>,
        elapsed: Duration,
        messages: HookMessages,
    ) {
        self.outcomes.push(HookExecutionOutcome {
            hook_id,
            status,
            action,
            execution_time_ms: elapsed_ms(elapsed),
            messages,
        });
    }
}

/// 执行组执行器
///
/// 按声明顺序逐个调用 Hook：每个 Hook 在独立任务中执行并受组超时约束，
/// 载荷在 Hook 之间传递，模块上下文在每次调用完成后立即写回。
/// 任意 Hook 的失败都只记录为执行记录，不影响后续 Hook；
/// 只有运行时无法调度任务时才返回错误。
pub struct GroupExecutor<'a, P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    pub group: &'a ExecutionGroup,
    pub hook_provider: &'a dyn HookProvider<P, C>,
    pub context_provider: &'a dyn InvocationContextProvider<C>,
    /// 模块启用开关，未出现的模块视为启用
    pub modules_execution: &'a HashMap<String, bool>,
    pub reject_allowed: bool,
}

impl<'a, P, C> GroupExecutor<'a, P, C>
where
    P: Clone + Send + 'static,
    C: Send + 'static,
{
    pub async fn execute(
        &self,
        initial_payload: P,
        context: &mut HookExecutionContext,
    ) -> Result<GroupResult<P>> {
        let mut result = GroupResult::new(initial_payload, self.reject_allowed);
        let timeout = self.group.timeout();

        for hook_id in &self.group.hook_sequence {
            if !self.is_module_enabled(&hook_id.module_code) {
                debug!(hook = %hook_id, "module disabled, hook skipped");
                continue;
            }

            if let ControlFlow::Break(rejected_by) = self
                .execute_hook(hook_id, timeout, &mut result, context)
                .await?
            {
                debug!(hook = %rejected_by, "group rejected, remaining hooks skipped");
                break;
            }
        }

        Ok(result)
    }

    fn is_module_enabled(&self, module_code: &str) -> bool {
        self.modules_execution
            .get(module_code)
            .copied()
            .unwrap_or(true)
    }

    async fn execute_hook(
        &self,
        hook_id: &HookId,
        timeout: Duration,
        result: &mut GroupResult<P>,
        context: &mut HookExecutionContext,
    ) -> Result<ControlFlow<HookId>> {
        let started = Instant::now();

        let hook = match self.hook_provider.resolve(hook_id) {
            Ok(hook) => hook,
            Err(err) => {
                warn!(hook = %hook_id, error = %err, "failed to resolve hook");
                result.apply_failure(
                    hook_id.clone(),
                    ExecutionStatus::ProviderResolutionFailure,
                    err.to_string(),
                    started.elapsed(),
                );
                return Ok(ControlFlow::Continue(()));
            }
        };

        let invocation_context = self.context_provider.build(
            timeout,
            hook_id,
            context.module_context(&hook_id.module_code),
        );
        let payload = result.payload().clone();

        let outcome = execute_with_timeout(
            async move { hook.call(payload, invocation_context).await },
            timeout,
        )
        .await?;
        let elapsed = started.elapsed();

        match outcome {
            RaceOutcome::Completed(Ok(Some(mut invocation))) => {
                context.put_module_context(&hook_id.module_code, invocation.module_context.take());
                debug!(
                    hook = %hook_id,
                    elapsed_ms = elapsed_ms(elapsed),
                    action = ?invocation.action(),
                    success = invocation.is_success(),
                    "hook completed"
                );
                result.apply_invocation_result(hook_id.clone(), invocation, elapsed);
            }
            RaceOutcome::Completed(Ok(None)) => {
                warn!(hook = %hook_id, "hook completed without a result");
                result.apply_failure(
                    hook_id.clone(),
                    ExecutionStatus::NullResult,
                    "hook returned no result".to_string(),
                    elapsed,
                );
            }
            RaceOutcome::Completed(Err(err)) => {
                warn!(hook = %hook_id, error = %err, "hook invocation failed");
                result.apply_failure(
                    hook_id.clone(),
                    ExecutionStatus::InvocationFault,
                    err.to_string(),
                    elapsed,
                );
            }
            RaceOutcome::Faulted(message) => {
                warn!(hook = %hook_id, error = %message, "hook task aborted");
                result.apply_failure(
                    hook_id.clone(),
                    ExecutionStatus::InvocationFault,
                    message,
                    elapsed,
                );
            }
            RaceOutcome::TimedOut => {
                warn!(
                    hook = %hook_id,
                    timeout_ms = self.group.timeout_ms,
                    "hook timed out"
                );
                result.apply_failure(
                    hook_id.clone(),
                    ExecutionStatus::Timeout,
                    format!("timed out after {}ms", self.group.timeout_ms),
                    elapsed,
                );
            }
        }

        Ok(result.propagate_rejection())
    }
}
