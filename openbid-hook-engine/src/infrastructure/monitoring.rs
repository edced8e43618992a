//! # Hook监控统计层
//!
//! 提供Hook执行指标收集、执行记录和告警触发能力。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use openbid_core::{HookId, Stage, StageExecutionOutcome};
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::models::{HookExecutionRecord, HookStatistics};

const DEFAULT_MAX_RECORDS: usize = 10_000;

/// 指标收集器
pub struct MetricsCollector {
    statistics: Arc<RwLock<HashMap<HookId, HookStatistics>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            statistics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 记录Hook执行结果
    pub async fn record(&self, record: &HookExecutionRecord) {
        let mut stats = self.statistics.write().await;
        stats
            .entry(record.hook_id.clone())
            .or_default()
            .update(record);
    }

    /// 记录一个阶段内全部Hook的执行结果
    pub async fn record_stage(&self, stage: Stage, outcome: &StageExecutionOutcome) {
        let mut stats = self.statistics.write().await;
        for hook_outcome in outcome.hook_outcomes() {
            let record = HookExecutionRecord::from_outcome(stage, hook_outcome);
            stats
                .entry(record.hook_id.clone())
                .or_default()
                .update(&record);
        }
    }

    /// 获取Hook统计信息
    pub async fn get_statistics(&self, hook_id: &HookId) -> Option<HookStatistics> {
        let stats = self.statistics.read().await;
        stats.get(hook_id).cloned()
    }

    /// 获取所有Hook统计信息
    pub async fn get_all_statistics(&self) -> HashMap<HookId, HookStatistics> {
        self.statistics.read().await.clone()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// 执行记录器
///
/// 只保留最近的 `max_records` 条记录。
pub struct ExecutionRecorder {
    records: Arc<RwLock<VecDeque<HookExecutionRecord>>>,
    max_records: usize,
}

impl ExecutionRecorder {
    pub fn new() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }

    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(VecDeque::new())),
            max_records,
        }
    }

    /// 记录Hook执行结果
    pub async fn record(&self, record: HookExecutionRecord) {
        let mut records = self.records.write().await;
        records.push_back(record);
        while records.len() > self.max_records {
            records.pop_front();
        }
    }

    pub async fn record_stage(&self, stage: Stage, outcome: &StageExecutionOutcome) {
        for hook_outcome in outcome.hook_outcomes() {
            self.record(HookExecutionRecord::from_outcome(stage, hook_outcome))
                .await;
        }
    }

    /// 查询执行记录，最新的记录在前
    pub async fn query(&self, hook_id: Option<&HookId>, limit: usize) -> Vec<HookExecutionRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .rev()
            .filter(|record| hook_id.is_none_or(|hook_id| &record.hook_id == hook_id))
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for ExecutionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// 告警触发器
pub struct AlertTrigger {
    failure_rate_threshold: f64,
    latency_threshold_ms: u64,
}

impl AlertTrigger {
    pub fn new(failure_rate_threshold: f64, latency_threshold_ms: u64) -> Self {
        Self {
            failure_rate_threshold,
            latency_threshold_ms,
        }
    }

    /// 检查是否需要告警，返回触发告警的Hook
    pub async fn check(&self, collector: &MetricsCollector) -> Vec<HookId> {
        let stats = collector.get_all_statistics().await;
        let mut alerting = Vec::new();

        for (hook_id, hook_stats) in stats {
            let mut alert = false;

            let failure_rate = 1.0 - hook_stats.success_rate();
            if failure_rate > self.failure_rate_threshold {
                warn!(
                    hook = %hook_id,
                    failure_rate = %failure_rate,
                    threshold = %self.failure_rate_threshold,
                    timeouts = hook_stats.timeout_count,
                    "Hook failure rate exceeds threshold"
                );
                alert = true;
            }

            if hook_stats.avg_latency_ms > self.latency_threshold_ms as f64 {
                warn!(
                    hook = %hook_id,
                    avg_latency_ms = hook_stats.avg_latency_ms,
                    threshold_ms = self.latency_threshold_ms,
                    "Hook average latency exceeds threshold"
                );
                alert = true;
            }

            if alert {
                alerting.push(hook_id);
            }
        }

        alerting.sort();
        alerting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use openbid_core::{ExecutionStatus, GroupExecutionOutcome, HookExecutionOutcome, HookMessages};

    fn create_test_record(hook: &str, status: ExecutionStatus, latency_ms: u64) -> HookExecutionRecord {
        HookExecutionRecord {
            hook_id: HookId::new("test-module", hook),
            stage: Stage::ProcessedAuctionRequest,
            status,
            action: None,
            latency_ms,
            executed_at: Utc::now(),
            message: None,
        }
    }

    #[tokio::test]
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new();
        let hook_id = HookId::new("test-module", "test-hook");

        collector
            .record(&create_test_record("test-hook", ExecutionStatus::Success, 100))
            .await;
        let stats = collector.get_statistics(&hook_id).await.unwrap();
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.success_rate(), 1.0);

        collector
            .record(&create_test_record("test-hook", ExecutionStatus::Timeout, 200))
            .await;
        let stats = collector.get_statistics(&hook_id).await.unwrap();
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.timeout_count, 1);
        assert_eq!(stats.avg_latency_ms, 150.0);

        assert!(
            collector
                .get_statistics(&HookId::new("test-module", "non-existent"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_record_stage() {
        let outcome = |hook: &str, status| HookExecutionOutcome {
            hook_id: HookId::new("m", hook),
            status,
            action: None,
            execution_time_ms: 5,
            messages: HookMessages::default(),
        };
        let stage_outcome = StageExecutionOutcome {
            entity: "auction-request".to_string(),
            groups: vec![
                GroupExecutionOutcome {
                    hooks: vec![
                        outcome("a", ExecutionStatus::Success),
                        outcome("b", ExecutionStatus::NullResult),
                    ],
                },
                GroupExecutionOutcome {
                    hooks: vec![outcome("a", ExecutionStatus::Success)],
                },
            ],
        };

        let collector = MetricsCollector::new();
        collector
            .record_stage(Stage::ProcessedAuctionRequest, &stage_outcome)
            .await;

        let all_stats = collector.get_all_statistics().await;
        assert_eq!(all_stats.len(), 2);
        assert_eq!(all_stats[&HookId::new("m", "a")].total_count, 2);
        assert_eq!(all_stats[&HookId::new("m", "b")].failure_count, 1);
    }

    #[tokio::test]
    async fn test_execution_recorder() {
        let recorder = ExecutionRecorder::new();
        recorder
            .record(create_test_record("test-hook", ExecutionStatus::Success, 100))
            .await;
        recorder
            .record(create_test_record("test-hook", ExecutionStatus::Failure, 200))
            .await;
        recorder
            .record(create_test_record("other-hook", ExecutionStatus::Success, 150))
            .await;

        let all_records = recorder.query(None, 10).await;
        assert_eq!(all_records.len(), 3);
        assert_eq!(all_records[0].hook_id.hook_impl_code, "other-hook");

        let hook_id = HookId::new("test-module", "test-hook");
        let hook_records = recorder.query(Some(&hook_id), 10).await;
        assert_eq!(hook_records.len(), 2);
        assert_eq!(hook_records[0].latency_ms, 200);

        assert_eq!(recorder.query(None, 2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_execution_recorder_max_records() {
        let recorder = ExecutionRecorder::with_max_records(100);
        for i in 0..150 {
            recorder
                .record(create_test_record("test-hook", ExecutionStatus::Success, i))
                .await;
        }

        assert_eq!(recorder.len().await, 100);
        let newest = recorder.query(None, 1).await;
        assert_eq!(newest[0].latency_ms, 149);
    }

    #[tokio::test]
    async fn test_alert_trigger() {
        let collector = MetricsCollector::new();
        for _ in 0..10 {
            collector
                .record(&create_test_record("flaky-hook", ExecutionStatus::Success, 100))
                .await;
        }
        for _ in 0..11 {
            collector
                .record(&create_test_record("flaky-hook", ExecutionStatus::Timeout, 200))
                .await;
        }
        for _ in 0..10 {
            collector
                .record(&create_test_record("good-hook", ExecutionStatus::Success, 50))
                .await;
        }
        collector
            .record(&create_test_record("slow-hook", ExecutionStatus::Success, 2_000))
            .await;

        let trigger = AlertTrigger::new(0.5, 1000);
        let alerting = trigger.check(&collector).await;
        assert_eq!(
            alerting,
            vec![
                HookId::new("test-module", "flaky-hook"),
                HookId::new("test-module", "slow-hook"),
            ]
        );
    }
}
