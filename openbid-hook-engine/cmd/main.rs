//! # OpenBid Hook Engine 入口
//!
//! 加载并校验Hook引擎配置，输出执行计划摘要。配置无效时以非零状态退出。

use anyhow::{Context, Result};
use openbid_core::telemetry::init_tracing_from_config;
use openbid_hook_engine::{ConfigLoaderItem, ConfigValidator, HookEngineConfig};
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/hooks.toml";

fn config_path() -> String {
    std::env::var("OPENBID_HOOKS_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

fn log_summary(config: &HookEngineConfig) {
    let plan = &config.hooks.host_execution_plan;
    for (endpoint, endpoint_plan) in &plan.endpoints {
        for (stage, stage_plan) in &endpoint_plan.stages {
            let hooks: usize = stage_plan
                .groups
                .iter()
                .map(|group| group.hook_sequence.len())
                .sum();
            info!(
                endpoint = %endpoint,
                stage = %stage,
                groups = stage_plan.groups.len(),
                hooks,
                "Execution plan stage"
            );
        }
    }

    info!(
        endpoints = plan.endpoints.len(),
        modules = ?plan.module_codes(),
        disabled_modules = ?config.hooks.disabled_modules(),
        "Hook engine config loaded"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let config = ConfigLoaderItem::for_path(&path)
        .load()
        .await
        .with_context(|| format!("Failed to load hook engine config from {path}"))?;

    init_tracing_from_config(config.logging.as_ref());
    info!(path = %path, "Starting OpenBid Hook Engine");

    if let Err(err) = ConfigValidator::validate(&config) {
        error!(path = %path, error = %format!("{err:#}"), "Invalid hook engine config");
        return Err(err);
    }

    log_summary(&config);
    Ok(())
}
