use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::plan::Stage;
use super::types::StageExecutionOutcome;

/// 模块上下文：模块在同一请求内跨 Hook 调用保存的不透明状态
#[derive(Clone)]
pub struct ModuleContext(Arc<dyn Any + Send + Sync>);

impl ModuleContext {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &ModuleContext) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModuleContext(..)")
    }
}

/// 请求级 Hook 执行上下文
///
/// 每个请求创建一个实例，持有模块上下文存储以及各阶段的执行记录，
/// 请求结束后交给日志/分析组件消费并随请求一起销毁。
#[derive(Debug)]
pub struct HookExecutionContext {
    request_id: Uuid,
    endpoint: String,
    created_at: DateTime<Utc>,
    module_contexts: HashMap<String, ModuleContext>,
    stage_outcomes: HashMap<Stage, Vec<StageExecutionOutcome>>,
}

impl HookExecutionContext {
    pub fn new<T: Into<String>>(endpoint: T) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            created_at: Utc::now(),
            module_contexts: HashMap::new(),
            stage_outcomes: HashMap::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn module_context(&self, module_code: &str) -> Option<ModuleContext> {
        self.module_contexts.get(module_code).cloned()
    }

    /// 写回模块上下文；`None` 清除该模块已有状态
    pub fn put_module_context(&mut self, module_code: &str, module_context: Option<ModuleContext>) {
        match module_context {
            Some(module_context) => {
                self.module_contexts
                    .insert(module_code.to_string(), module_context);
            }
            None => {
                self.module_contexts.remove(module_code);
            }
        }
    }

    pub fn record_stage_outcome(&mut self, stage: Stage, outcome: StageExecutionOutcome) {
        self.stage_outcomes.entry(stage).or_default().push(outcome);
    }

    pub fn stage_outcomes(&self, stage: Stage) -> &[StageExecutionOutcome] {
        self.stage_outcomes
            .get(&stage)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 按阶段顺序遍历全部执行记录
    pub fn outcomes(&self) -> impl Iterator<Item = (Stage, &StageExecutionOutcome)> {
        Stage::ALL.into_iter().flat_map(move |stage| {
            self.stage_outcomes(stage)
                .iter()
                .map(move |outcome| (stage, outcome))
        })
    }
}
