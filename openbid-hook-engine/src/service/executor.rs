//! # Hook阶段执行门面
//!
//! 为单个请求的某个阶段确定执行计划与模块开关，调用 `StageExecutor` 并记录执行指标。

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use openbid_core::{
    ExecutionPlan, HookCatalog, HookExecutionContext, InvocationContextProvider, Stage,
    StageExecutor, StageResult,
};
use tracing::debug;

use crate::domain::models::{AccountHooksConfig, HooksConfig};
use crate::infrastructure::monitoring::{ExecutionRecorder, MetricsCollector};

/// Hook阶段执行器
///
/// 宿主执行计划的执行组先于账户执行计划执行；账户模块开关覆盖宿主模块开关。
pub struct HookStageExecutor<P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    host_plan: ExecutionPlan,
    host_modules: HashMap<String, bool>,
    catalog: Arc<HookCatalog<P, C>>,
    metrics: Arc<MetricsCollector>,
    recorder: Option<Arc<ExecutionRecorder>>,
}

impl<P, C> HookStageExecutor<P, C>
where
    P: Clone + Send + 'static,
    C: Send + 'static,
{
    pub fn new(config: &HooksConfig, catalog: Arc<HookCatalog<P, C>>) -> Self {
        Self {
            host_plan: config.host_execution_plan.clone(),
            host_modules: config.modules.clone(),
            catalog,
            metrics: Arc::new(MetricsCollector::new()),
            recorder: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<ExecutionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn recorder(&self) -> Option<&Arc<ExecutionRecorder>> {
        self.recorder.as_ref()
    }

    /// 宿主执行计划与账户执行计划合并后的计划
    pub fn plan_for<'a>(&'a self, account: Option<&AccountHooksConfig>) -> Cow<'a, ExecutionPlan> {
        match account.and_then(|account| account.execution_plan.as_ref()) {
            Some(account_plan) => Cow::Owned(self.host_plan.merged_with(account_plan)),
            None => Cow::Borrowed(&self.host_plan),
        }
    }

    /// 宿主模块开关叠加账户模块开关
    pub fn modules_for<'a>(&'a self, account: Option<&AccountHooksConfig>) -> Cow<'a, HashMap<String, bool>> {
        match account {
            Some(account) if !account.modules.is_empty() => {
                let mut modules = self.host_modules.clone();
                modules.extend(
                    account
                        .modules
                        .iter()
                        .map(|(module_code, enabled)| (module_code.clone(), *enabled)),
                );
                Cow::Owned(modules)
            }
            _ => Cow::Borrowed(&self.host_modules),
        }
    }

    /// 执行请求端点在指定阶段的全部执行组
    ///
    /// 是否允许拒绝由阶段决定；阶段内全部Hook的执行记录计入指标。
    pub async fn execute_stage(
        &self,
        stage: Stage,
        entity: &str,
        payload: P,
        account: Option<&AccountHooksConfig>,
        context_provider: &dyn InvocationContextProvider<C>,
        context: &mut HookExecutionContext,
    ) -> openbid_core::Result<StageResult<P>> {
        let plan = self.plan_for(account);
        let modules_execution = self.modules_for(account);
        let groups = plan.groups_for(context.endpoint(), stage);

        if groups.is_empty() {
            debug!(
                endpoint = context.endpoint(),
                stage = %stage,
                "No execution groups configured for stage"
            );
        }

        let executor = StageExecutor {
            stage,
            entity,
            groups,
            hook_provider: self.catalog.as_ref(),
            context_provider,
            modules_execution: modules_execution.as_ref(),
        };
        let result = executor.execute(payload, context).await?;

        self.metrics.record_stage(stage, &result.outcome).await;
        if let Some(recorder) = &self.recorder {
            recorder.record_stage(stage, &result.outcome).await;
        }

        Ok(result)
    }
}
