//! Shared router state
//!
//! The single serialized owner of the registry, interceptor chain, module
//! manager and current-navigation handle. Every read and mutation passes
//! through one lock in a short critical section; anything that needs to be
//! awaited (interceptors, collaborators, retry delays) works on snapshots
//! cloned out of the lock, never with the lock held.

use crate::config::RouterConfig;
use crate::destination::SpecHandle;
use crate::error::Result;
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::module::{Module, ModuleManager, ModuleState};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use waypoint_router::{CacheStats, Registry, Resolved};

/// Handle to one in-flight navigation
///
/// At most one handle is current at a time; superseding cancels the
/// previous one cooperatively.
pub(crate) struct NavigationHandle {
    seq: u64,
    token: CancellationToken,
}

impl NavigationHandle {
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

struct RouterInner {
    registry: Registry<SpecHandle>,
    chain: InterceptorChain,
    modules: ModuleManager,
    current: Option<Arc<NavigationHandle>>,
    location: Option<String>,
    next_nav_seq: u64,
}

/// The serialized access point all components go through
pub(crate) struct RouterState {
    inner: Mutex<RouterInner>,
    config: RouterConfig,
}

impl RouterState {
    pub(crate) fn new(config: RouterConfig) -> Self {
        let registry = Registry::with_policy(config.registration, config.cache_capacity);
        Self {
            inner: Mutex::new(RouterInner {
                registry,
                chain: InterceptorChain::new(),
                modules: ModuleManager::new(),
                current: None,
                location: None,
                next_nav_seq: 0,
            }),
            config,
        }
    }

    pub(crate) fn config(&self) -> &RouterConfig {
        &self.config
    }

    // --- registry ---

    pub(crate) fn register(
        &self,
        pattern: &str,
        module: &str,
        destination: SpecHandle,
    ) -> Result<()> {
        self.inner
            .lock()
            .registry
            .register(pattern, module, destination)?;
        Ok(())
    }

    /// Resolve a path and mark the owning module as recently used
    pub(crate) fn resolve_route(&self, path: &str) -> Option<Resolved<SpecHandle>> {
        let mut inner = self.inner.lock();
        let resolved = inner.registry.resolve(path)?;
        inner.modules.touch(&resolved.module);
        Some(resolved)
    }

    pub(crate) fn route_count(&self) -> usize {
        self.inner.lock().registry.len()
    }

    /// Every live (pattern, module) pair, in registration order
    pub(crate) fn routes(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .registry
            .entries()
            .iter()
            .map(|e| (e.pattern.raw().to_string(), e.module.clone()))
            .collect()
    }

    /// Patterns owned by one module
    pub(crate) fn routes_for_module(&self, module: &str) -> Vec<String> {
        self.inner
            .lock()
            .registry
            .entries_for_module(module)
            .iter()
            .map(|e| e.pattern.raw().to_string())
            .collect()
    }

    pub(crate) fn cache_stats(&self) -> CacheStats {
        self.inner.lock().registry.cache_stats()
    }

    // --- interceptors ---

    pub(crate) fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.inner.lock().chain.add(interceptor);
    }

    pub(crate) fn remove_interceptor(&self, name: &str) -> bool {
        self.inner.lock().chain.remove(name)
    }

    /// Ordered interceptor snapshot for one chain run
    pub(crate) fn interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        self.inner.lock().chain.snapshot()
    }

    // --- modules ---

    pub(crate) fn install_module(&self, module: Arc<dyn Module>) -> Result<()> {
        self.inner.lock().modules.install(module)
    }

    pub(crate) fn load_module(&self, name: &str) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.modules.load(name, &mut inner.registry)
    }

    pub(crate) fn unload_module(&self, name: &str, cascade: bool) -> Result<Vec<String>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.modules.unload(name, cascade, &mut inner.registry)
    }

    pub(crate) fn suspend_module(&self, name: &str) -> Result<()> {
        self.inner.lock().modules.suspend(name)
    }

    pub(crate) fn resume_module(&self, name: &str) -> Result<()> {
        self.inner.lock().modules.resume(name)
    }

    pub(crate) fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.inner.lock().modules.state(name)
    }

    pub(crate) fn idle_modules(&self, max_idle: Duration) -> Vec<String> {
        self.inner.lock().modules.idle_modules(max_idle)
    }

    // --- navigation handle ---

    /// Start a navigation, superseding (cancelling) any current one
    pub(crate) fn begin_navigation(&self) -> Arc<NavigationHandle> {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.current.take() {
            tracing::debug!(seq = previous.seq(), "superseding in-flight navigation");
            previous.cancel();
        }
        let handle = Arc::new(NavigationHandle {
            seq: inner.next_nav_seq,
            token: CancellationToken::new(),
        });
        inner.next_nav_seq += 1;
        inner.current = Some(handle.clone());
        handle
    }

    /// Clear the current handle, but only if `handle` still owns it
    pub(crate) fn finish_navigation(&self, handle: &NavigationHandle) {
        let mut inner = self.inner.lock();
        if inner
            .current
            .as_ref()
            .is_some_and(|current| current.seq() == handle.seq())
        {
            inner.current = None;
        }
    }

    /// Cancel the in-flight navigation, if any
    pub(crate) fn cancel_current(&self) {
        let mut inner = self.inner.lock();
        if let Some(current) = inner.current.take() {
            tracing::debug!(seq = current.seq(), "navigation cancelled by caller");
            current.cancel();
        }
    }

    /// Record the last successfully reached URL; ignored once superseded
    pub(crate) fn set_location(&self, handle: &NavigationHandle, url: &str) {
        let mut inner = self.inner.lock();
        let still_current = inner
            .current
            .as_ref()
            .is_some_and(|current| current.seq() == handle.seq());
        if still_current {
            inner.location = Some(url.to_string());
        }
    }

    pub(crate) fn location(&self) -> Option<String> {
        self.inner.lock().location.clone()
    }
}
