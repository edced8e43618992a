use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::EngineError;

use super::provider::{Hook, HookProvider};
use super::types::HookId;

/// Hook 目录：按 (模块编码, Hook 实现编码) 注册 Hook
pub struct HookCatalog<P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    hooks: HashMap<HookId, Arc<dyn Hook<P, C>>>,
}

impl<P, C> Default for HookCatalog<P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    fn default() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }
}

impl<P, C> HookCatalog<P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Hook，Hook 实现编码取自 `hook.code()`；同名 Hook 会被替换
    pub fn register<T: Into<String>>(&mut self, module_code: T, hook: Arc<dyn Hook<P, C>>) -> &mut Self {
        let hook_id = HookId::new(module_code, hook.code());
        if self.hooks.insert(hook_id.clone(), hook).is_some() {
            tracing::warn!(hook = %hook_id, "hook registered twice, previous registration replaced");
        }
        self
    }

    pub fn contains(&self, hook_id: &HookId) -> bool {
        self.hooks.contains_key(hook_id)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn module_codes(&self) -> BTreeSet<&str> {
        self.hooks
            .keys()
            .map(|hook_id| hook_id.module_code.as_str())
            .collect()
    }
}

impl<P, C> HookProvider<P, C> for HookCatalog<P, C>
where
    P: Send + 'static,
    C: Send + 'static,
{
    fn resolve(&self, hook_id: &HookId) -> Result<Arc<dyn Hook<P, C>>, EngineError> {
        self.hooks
            .get(hook_id)
            .cloned()
            .ok_or_else(|| EngineError::HookNotFound {
                hook_id: hook_id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{FnHook, InvocationResult};

    fn noop(code: &str) -> Arc<dyn Hook<String, ()>> {
        Arc::new(FnHook::new(code, |_: String, _: ()| async {
            Ok(Some(InvocationResult::succeeded()))
        }))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut catalog = HookCatalog::new();
        catalog
            .register("ortb2-blocking", noop("bidder-request"))
            .register("ortb2-blocking", noop("raw-bidder-response"))
            .register("richmedia-filter", noop("processed-bidder-response"));

        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.module_codes().into_iter().collect::<Vec<_>>(),
            vec!["ortb2-blocking", "richmedia-filter"]
        );

        let hook_id = HookId::new("ortb2-blocking", "raw-bidder-response");
        let hook = catalog.resolve(&hook_id).unwrap();
        assert_eq!(hook.code(), "raw-bidder-response");
    }

    #[test]
    fn test_resolve_unknown_hook() {
        let catalog: HookCatalog<String, ()> = HookCatalog::new();
        let hook_id = HookId::new("unknown", "hook");
        match catalog.resolve(&hook_id) {
            Err(EngineError::HookNotFound { hook_id: missing }) => assert_eq!(missing, hook_id),
            _ => panic!("expected HookNotFound"),
        }
    }

    #[test]
    fn test_register_replaces_duplicate() {
        let mut catalog = HookCatalog::new();
        catalog.register("module", noop("hook"));
        catalog.register("module", noop("hook"));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(&HookId::new("module", "hook")));
    }
}
