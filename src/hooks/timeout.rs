use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::EngineError;

/// 任务与定时器竞争的结果
#[derive(Debug)]
pub(crate) enum RaceOutcome<T> {
    Completed(T),
    /// 任务 panic 或被运行时取消
    Faulted(String),
    TimedOut,
}

/// 在独立任务中执行 `action`，并与超时定时器竞争
///
/// 先完成的一方决定结果，`select!` 保证只有一个分支落定。超时后只是不再等待，
/// 任务本身继续在运行时中执行直至结束。任务先完成时定时器随即被丢弃。
///
/// 定时器先于任务创建：运行时缺失或未启用时间驱动时返回 `Scheduling`，Hook 不会被调度。
pub(crate) async fn execute_with_timeout<F, T>(
    action: F,
    timeout: Duration,
) -> Result<RaceOutcome<T>, EngineError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let runtime = Handle::try_current().map_err(|err| EngineError::Scheduling(err.to_string()))?;
    let timer = panic::catch_unwind(AssertUnwindSafe(|| tokio::time::sleep(timeout)))
        .map_err(|panic| EngineError::Scheduling(panic_message("timer unavailable", panic)))?;
    let mut task = runtime.spawn(action);

    let outcome = tokio::select! {
        biased;
        joined = &mut task => match joined {
            Ok(value) => RaceOutcome::Completed(value),
            Err(err) if err.is_panic() => {
                RaceOutcome::Faulted(panic_message("hook panicked", err.into_panic()))
            }
            Err(err) => RaceOutcome::Faulted(err.to_string()),
        },
        _ = timer => RaceOutcome::TimedOut,
    };

    Ok(outcome)
}

fn panic_message(prefix: &str, panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("{prefix}: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("{prefix}: {message}")
    } else {
        prefix.to_string()
    }
}
