use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{EngineError, HookError};

use super::context::ModuleContext;
use super::types::{HookId, InvocationResult};

/// Hook 调用的返回值：`Ok(None)` 表示 Hook 完成但没有给出结果
pub type HookCallResult<P> = Result<Option<InvocationResult<P>>, HookError>;

/// Hook Trait
///
/// 调用不保证幂等，引擎对每个 Hook 在一次执行组执行中最多调用一次。
#[async_trait]
pub trait Hook<P, C>: Send + Sync
where
    P: Send + 'static,
    C: Send + 'static,
{
    /// Hook 实现编码
    fn code(&self) -> &str;

    async fn call(&self, payload: P, context: C) -> HookCallResult<P>;
}

/// Hook 提供者：根据 HookId 解析出可调用的 Hook
pub trait HookProvider<P, C>: Send + Sync
where
    P: Send + 'static,
    C: Send + 'static,
{
    fn resolve(&self, hook_id: &HookId) -> Result<Arc<dyn Hook<P, C>>, EngineError>;
}

impl<P, C, F> HookProvider<P, C> for F
where
    P: Send + 'static,
    C: Send + 'static,
    F: Fn(&HookId) -> Result<Arc<dyn Hook<P, C>>, EngineError> + Send + Sync,
{
    fn resolve(&self, hook_id: &HookId) -> Result<Arc<dyn Hook<P, C>>, EngineError> {
        self(hook_id)
    }
}

/// 调用上下文提供者
pub trait InvocationContextProvider<C>: Send + Sync {
    /// `timeout` 为执行组的完整超时预算，`module_context` 为该模块上一次写回的状态
    fn build(
        &self,
        timeout: Duration,
        hook_id: &HookId,
        module_context: Option<ModuleContext>,
    ) -> C;
}

impl<C, F> InvocationContextProvider<C> for F
where
    F: Fn(Duration, &HookId, Option<ModuleContext>) -> C + Send + Sync,
{
    fn build(
        &self,
        timeout: Duration,
        hook_id: &HookId,
        module_context: Option<ModuleContext>,
    ) -> C {
        self(timeout, hook_id, module_context)
    }
}

/// 默认的 Hook 调用上下文
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub timeout: Duration,
    pub hook_id: HookId,
    pub endpoint: String,
    pub module_context: Option<ModuleContext>,
}

impl InvocationContext {
    pub fn module_context_as<T: std::any::Any>(&self) -> Option<&T> {
        self.module_context
            .as_ref()
            .and_then(|context| context.downcast_ref::<T>())
    }
}

/// 为指定端点构建 [`InvocationContext`]
#[derive(Debug, Clone)]
pub struct EndpointContextProvider {
    endpoint: String,
}

impl EndpointContextProvider {
    pub fn new<T: Into<String>>(endpoint: T) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl InvocationContextProvider<InvocationContext> for EndpointContextProvider {
    fn build(
        &self,
        timeout: Duration,
        hook_id: &HookId,
        module_context: Option<ModuleContext>,
    ) -> InvocationContext {
        InvocationContext {
            timeout,
            hook_id: hook_id.clone(),
            endpoint: self.endpoint.clone(),
            module_context,
        }
    }
}

type HookHandler<P, C> = Box<dyn Fn(P, C) -> BoxFuture<'static, HookCallResult<P>> + Send + Sync>;

/// 基于异步闭包的 Hook 实现
pub struct FnHook<P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    code: String,
    handler: HookHandler<P, C>,
}

impl<P, C> FnHook<P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    pub fn new<T, F, Fut>(code: T, handler: F) -> Self
    where
        T: Into<String>,
        F: Fn(P, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookCallResult<P>> + Send + 'static,
    {
        Self {
            code: code.into(),
            handler: Box::new(move |payload, context| -> BoxFuture<'static, HookCallResult<P>> {
                Box::pin(handler(payload, context))
            }),
        }
    }
}

#[async_trait]
impl<P, C> Hook<P, C> for FnHook<P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    fn code(&self) -> &str {
        &self.code
    }

    async fn call(&self, payload: P, context: C) -> HookCallResult<P> {
        (self.handler)(payload, context).await
    }
}
