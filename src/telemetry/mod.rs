//! # 日志初始化模块
//!
//! 为 Hook 引擎及其宿主服务提供统一的 `tracing` 日志初始化。

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// 从配置初始化日志系统
///
/// 优先使用环境变量 `RUST_LOG`，否则使用配置中的日志级别。
/// 重复调用是安全的：只有第一次调用生效。
///
/// # 示例
/// ```rust,ignore
/// use openbid_core::{LoggingConfig, telemetry::init_tracing_from_config};
///
/// init_tracing_from_config(None);
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     with_line_number: true,
///     ..Default::default()
/// };
/// init_tracing_from_config(Some(&config));
/// ```
pub fn init_tracing_from_config(logging_config: Option<&LoggingConfig>) {
    TRACING_INIT.get_or_init(|| {
        let default_config = LoggingConfig::default();
        let config = logging_config.unwrap_or(&default_config);

        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new(config.level.as_str()),
        };

        let builder = fmt::Subscriber::builder()
            .with_target(config.with_target)
            .with_thread_ids(config.with_thread_ids)
            .with_file(config.with_file)
            .with_line_number(config.with_line_number)
            .with_env_filter(env_filter);

        let installed = if config.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        // 宿主进程可能已安装全局 subscriber
        if let Err(err) = installed {
            tracing::debug!(error = %err, "global tracing subscriber already installed");
        }
    });
}
