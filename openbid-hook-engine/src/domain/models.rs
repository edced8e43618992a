//! # Hook引擎领域模型
//!
//! 定义Hook引擎配置、账户Hook配置、执行记录与统计信息

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use openbid_core::{
    ExecutionAction, ExecutionPlan, ExecutionStatus, HookExecutionOutcome, HookId, LoggingConfig,
    Stage,
};
use serde::{Deserialize, Serialize};

/// Hook引擎配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookEngineConfig {
    /// 日志配置，未配置时使用默认值
    pub logging: Option<LoggingConfig>,
    pub hooks: HooksConfig,
}

/// 宿主级Hook配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// 模块启用开关，未出现的模块视为启用
    pub modules: HashMap<String, bool>,
    pub host_execution_plan: ExecutionPlan,
}

impl HooksConfig {
    /// 被显式关闭的模块
    pub fn disabled_modules(&self) -> BTreeSet<&str> {
        self.modules
            .iter()
            .filter(|(_, enabled)| !**enabled)
            .map(|(module_code, _)| module_code.as_str())
            .collect()
    }
}

/// 账户级Hook配置（由调用方随请求提供）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountHooksConfig {
    pub execution_plan: Option<ExecutionPlan>,
    /// 覆盖宿主模块开关
    pub modules: HashMap<String, bool>,
}

/// 单个Hook的一次执行记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookExecutionRecord {
    pub hook_id: HookId,
    pub stage: Stage,
    pub status: ExecutionStatus,
    pub action: Option<ExecutionAction>,
    pub latency_ms: u64,
    pub executed_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl HookExecutionRecord {
    pub fn from_outcome(stage: Stage, outcome: &HookExecutionOutcome) -> Self {
        Self {
            hook_id: outcome.hook_id.clone(),
            stage,
            status: outcome.status,
            action: outcome.action,
            latency_ms: outcome.execution_time_ms,
            executed_at: Utc::now(),
            message: outcome.messages.message.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Hook统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookStatistics {
    pub total_count: u64,
    pub success_count: u64,
    /// 全部非成功执行，包含超时
    pub failure_count: u64,
    pub timeout_count: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
    pub min_latency_ms: u64,
}

impl HookStatistics {
    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 1.0;
        }
        self.success_count as f64 / self.total_count as f64
    }

    pub fn update(&mut self, record: &HookExecutionRecord) {
        self.total_count += 1;
        if record.is_success() {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        if record.status == ExecutionStatus::Timeout {
            self.timeout_count += 1;
        }

        if self.total_count == 1 {
            self.avg_latency_ms = record.latency_ms as f64;
            self.max_latency_ms = record.latency_ms;
            self.min_latency_ms = record.latency_ms;
        } else {
            self.avg_latency_ms = (self.avg_latency_ms * (self.total_count - 1) as f64
                + record.latency_ms as f64)
                / self.total_count as f64;
            self.max_latency_ms = self.max_latency_ms.max(record.latency_ms);
            self.min_latency_ms = self.min_latency_ms.min(record.latency_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: ExecutionStatus, latency_ms: u64) -> HookExecutionRecord {
        HookExecutionRecord {
            hook_id: HookId::new("ortb2-blocking", "bidder-request"),
            stage: Stage::BidderRequest,
            status,
            action: None,
            latency_ms,
            executed_at: Utc::now(),
            message: None,
        }
    }

    #[test]
    fn test_hook_statistics_update() {
        let mut stats = HookStatistics::default();
        assert_eq!(stats.success_rate(), 1.0);

        stats.update(&record(ExecutionStatus::Success, 100));
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.avg_latency_ms, 100.0);

        stats.update(&record(ExecutionStatus::Timeout, 200));
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.timeout_count, 1);
        assert_eq!(stats.avg_latency_ms, 150.0);
        assert_eq!(stats.success_rate(), 0.5);
        assert_eq!(stats.max_latency_ms, 200);
        assert_eq!(stats.min_latency_ms, 100);
    }

    #[test]
    fn test_engine_config_from_toml() {
        let config: HookEngineConfig = toml::from_str(
            r#"
            [logging]
            level = "debug"

            [hooks.modules]
            "ortb2-blocking" = true
            "pb-richmedia-filter" = false

            [hooks.host_execution_plan.endpoints."/openrtb2/auction".stages.entrypoint]
            groups = [{ timeout = 50, hook-sequence = [{ module-code = "ortb2-blocking", hook-impl-code = "entrypoint" }] }]
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.unwrap().level, "debug");
        assert_eq!(
            config.hooks.disabled_modules().into_iter().collect::<Vec<_>>(),
            vec!["pb-richmedia-filter"]
        );
        let groups = config
            .hooks
            .host_execution_plan
            .groups_for("/openrtb2/auction", Stage::Entrypoint);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].timeout_ms, 50);
    }

    #[test]
    fn test_record_from_outcome() {
        let outcome = HookExecutionOutcome {
            hook_id: HookId::new("m", "h"),
            status: ExecutionStatus::InvocationFault,
            action: None,
            execution_time_ms: 12,
            messages: openbid_core::HookMessages {
                message: Some("boom".to_string()),
                ..Default::default()
            },
        };

        let record = HookExecutionRecord::from_outcome(Stage::Exitpoint, &outcome);
        assert_eq!(record.latency_ms, 12);
        assert_eq!(record.message.as_deref(), Some("boom"));
        assert!(!record.is_success());
    }
}
