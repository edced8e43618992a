use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::Result;

use super::context::HookExecutionContext;
use super::group::GroupExecutor;
use super::plan::Stage;
use super::provider::{HookProvider, InvocationContextProvider};
use super::types::{ExecutionGroup, HookId, StageExecutionOutcome};

/// 阶段执行结果
#[derive(Debug, Clone)]
pub struct StageResult<P> {
    pub payload: P,
    pub rejected_by: Option<HookId>,
    pub outcome: StageExecutionOutcome,
}

impl<P> StageResult<P> {
    pub fn is_rejected(&self) -> bool {
        self.rejected_by.is_some()
    }
}

/// 阶段执行器：依次执行阶段内的执行组，载荷在组之间传递
///
/// 某个执行组被拒绝后，后续执行组不再执行。是否允许拒绝由阶段决定。
pub struct StageExecutor<'a, P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    pub stage: Stage,
    /// 执行实体（如 `auction-request` 或 bidder 名称）
    pub entity: &'a str,
    pub groups: &'a [ExecutionGroup],
    pub hook_provider: &'a dyn HookProvider<P, C>,
    pub context_provider: &'a dyn InvocationContextProvider<C>,
    pub modules_execution: &'a HashMap<String, bool>,
}

impl<'a, P, C> StageExecutor<'a, P, C>
where
    P: Clone + Send + 'static,
    C: Send + 'static,
{
    pub async fn execute(
        &self,
        payload: P,
        context: &mut HookExecutionContext,
    ) -> Result<StageResult<P>> {
        let mut outcome = StageExecutionOutcome::new(self.entity);
        let mut payload = payload;
        let mut rejected_by = None;

        for group in self.groups {
            let executor = GroupExecutor {
                group,
                hook_provider: self.hook_provider,
                context_provider: self.context_provider,
                modules_execution: self.modules_execution,
                reject_allowed: self.stage.reject_allowed(),
            };

            let (next_payload, group_rejected_by, group_outcome) =
                executor.execute(payload, context).await?.into_parts();
            payload = next_payload;
            outcome.groups.push(group_outcome);

            if let Some(hook_id) = group_rejected_by {
                info!(
                    stage = %self.stage,
                    entity = self.entity,
                    hook = %hook_id,
                    "stage rejected by hook"
                );
                rejected_by = Some(hook_id);
                break;
            }
        }

        debug!(
            stage = %self.stage,
            entity = self.entity,
            groups = outcome.groups.len(),
            "stage executed"
        );
        context.record_stage_outcome(self.stage, outcome.clone());

        Ok(StageResult {
            payload,
            rejected_by,
            outcome,
        })
    }
}
