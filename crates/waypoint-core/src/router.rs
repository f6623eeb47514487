//! Public router surface
//!
//! `Router` wires the serialized shared state to the two environment
//! collaborators and exposes the operation surface: route registration,
//! interceptors, navigation, and the module lifecycle.

use crate::config::RouterConfig;
use crate::context::NavigationKind;
use crate::destination::{DestinationFactory, SpecHandle, TransitionExecutor};
use crate::error::Result;
use crate::interceptor::Interceptor;
use crate::module::{Module, ModuleState};
use crate::navigator;
use crate::state::RouterState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use waypoint_router::CacheStats;

/// URL-pattern navigation router
///
/// Cheap to clone; clones share the same state and collaborators.
#[derive(Clone)]
pub struct Router {
    state: Arc<RouterState>,
    factory: Arc<dyn DestinationFactory>,
    executor: Arc<dyn TransitionExecutor>,
}

impl Router {
    /// Create a router with default configuration
    pub fn new(
        factory: Arc<dyn DestinationFactory>,
        executor: Arc<dyn TransitionExecutor>,
    ) -> Self {
        Self::with_config(RouterConfig::default(), factory, executor)
    }

    pub fn with_config(
        config: RouterConfig,
        factory: Arc<dyn DestinationFactory>,
        executor: Arc<dyn TransitionExecutor>,
    ) -> Self {
        Self {
            state: Arc::new(RouterState::new(config)),
            factory,
            executor,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        self.state.config()
    }

    /// Register a route owned by `module`
    pub fn register(&self, pattern: &str, module: &str, destination: SpecHandle) -> Result<()> {
        self.state.register(pattern, module, destination)
    }

    pub fn route_count(&self) -> usize {
        self.state.route_count()
    }

    /// Every live (pattern, module) pair, in registration order
    pub fn routes(&self) -> Vec<(String, String)> {
        self.state.routes()
    }

    /// Patterns owned by one module
    pub fn routes_for_module(&self, module: &str) -> Vec<String> {
        self.state.routes_for_module(module)
    }

    /// Resolution cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.state.cache_stats()
    }

    /// The last successfully reached URL
    pub fn current_location(&self) -> Option<String> {
        self.state.location()
    }

    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.state.add_interceptor(interceptor);
    }

    pub fn remove_interceptor(&self, name: &str) -> bool {
        self.state.remove_interceptor(name)
    }

    /// Navigate with defaults: no caller params, push
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.navigate_with(url, None, NavigationKind::Push).await
    }

    /// Navigate, supplying caller params and a navigation kind
    ///
    /// Starting a navigation supersedes the in-flight one, whose call
    /// resolves with `RouterError::Cancelled`. The result is delivered
    /// exactly once, as a value - never across the await as a panic.
    pub async fn navigate_with(
        &self,
        url: &str,
        params: Option<HashMap<String, String>>,
        kind: NavigationKind,
    ) -> Result<()> {
        let handle = self.state.begin_navigation();
        navigator::drive(
            &self.state,
            self.factory.as_ref(),
            self.executor.as_ref(),
            &handle,
            url,
            params.unwrap_or_default(),
            kind,
        )
        .await
    }

    /// Cooperatively cancel the in-flight navigation, if any
    pub fn cancel_current_navigation(&self) {
        self.state.cancel_current();
    }

    /// Make a module known (state: unloaded)
    pub fn install_module(&self, module: Arc<dyn Module>) -> Result<()> {
        self.state.install_module(module)
    }

    /// Load a module, registering its routes
    pub fn load_module(&self, name: &str) -> Result<()> {
        self.state.load_module(name)
    }

    /// Unload a module; refuses while loaded dependents exist
    pub fn unload_module(&self, name: &str) -> Result<()> {
        self.state.unload_module(name, false).map(|_| ())
    }

    /// Unload a module and, depth-first, every module depending on it.
    /// Returns the unloaded names in unload order.
    pub fn unload_module_cascade(&self, name: &str) -> Result<Vec<String>> {
        self.state.unload_module(name, true)
    }

    pub fn suspend_module(&self, name: &str) -> Result<()> {
        self.state.suspend_module(name)
    }

    pub fn resume_module(&self, name: &str) -> Result<()> {
        self.state.resume_module(name)
    }

    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.state.module_state(name)
    }

    /// Loaded modules idle past `max_idle`: suspension candidates
    pub fn idle_modules(&self, max_idle: Duration) -> Vec<String> {
        self.state.idle_modules(max_idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RouteContext;
    use crate::destination::{CollaboratorError, Destination, TransitionOutcome};
    use crate::error::RouterError;
    use crate::interceptor::{InterceptRequest, Outcome};
    use crate::module::RouteDef;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::{oneshot, Semaphore};

    struct StubDestination {
        name: String,
    }

    impl Destination for StubDestination {
        fn name(&self) -> &str {
            &self.name
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        calls: AtomicU32,
        fail_first: u32,
        retryable: bool,
        last_context: Mutex<Option<RouteContext>>,
        gate: Option<(String, Arc<Semaphore>)>,
    }

    impl CountingFactory {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                retryable: true,
                ..Default::default()
            })
        }

        fn failing(times: u32) -> Arc<Self> {
            Arc::new(Self {
                fail_first: times,
                retryable: true,
                ..Default::default()
            })
        }

        fn permanent() -> Arc<Self> {
            Arc::new(Self {
                fail_first: u32::MAX,
                retryable: false,
                ..Default::default()
            })
        }

        fn gated(spec_name: &str, gate: Arc<Semaphore>) -> Arc<Self> {
            Arc::new(Self {
                retryable: true,
                gate: Some((spec_name.to_string(), gate)),
                ..Default::default()
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DestinationFactory for CountingFactory {
        async fn create(
            &self,
            spec: &SpecHandle,
            context: &RouteContext,
        ) -> std::result::Result<Box<dyn Destination>, CollaboratorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            *self.last_context.lock() = Some(context.clone());
            if let Some((gated_name, gate)) = &self.gate {
                if spec.name() == gated_name {
                    let _permit = gate.acquire().await.expect("gate closed");
                }
            }
            if call <= self.fail_first {
                return Err(if self.retryable {
                    CollaboratorError::new("factory failed")
                } else {
                    CollaboratorError::permanent("factory failed")
                });
            }
            Ok(Box::new(StubDestination {
                name: spec.name().to_string(),
            }))
        }
    }

    #[derive(Default)]
    struct CountingExecutor {
        calls: AtomicU32,
        fail_first: u32,
        pending: bool,
        pending_fail_first: u32,
        last_kind: Mutex<Option<&'static str>>,
        last_from: Mutex<Option<String>>,
    }

    impl CountingExecutor {
        fn ok() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn failing(times: u32) -> Arc<Self> {
            Arc::new(Self {
                fail_first: times,
                ..Default::default()
            })
        }

        fn pending(fail_first: u32) -> Arc<Self> {
            Arc::new(Self {
                pending: true,
                pending_fail_first: fail_first,
                ..Default::default()
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TransitionExecutor for CountingExecutor {
        async fn perform(
            &self,
            kind: &NavigationKind,
            _destination: Box<dyn Destination>,
            from: Option<&str>,
            _animated: bool,
        ) -> std::result::Result<TransitionOutcome, CollaboratorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            *self.last_kind.lock() = Some(kind.as_str());
            *self.last_from.lock() = from.map(str::to_string);
            if call <= self.fail_first {
                return Err(CollaboratorError::new("transition failed"));
            }
            if self.pending {
                let (tx, rx) = oneshot::channel();
                let result = if call <= self.fail_first + self.pending_fail_first {
                    Err(CollaboratorError::new("present failed"))
                } else {
                    Ok(())
                };
                tx.send(result).ok();
                return Ok(TransitionOutcome::Pending(rx));
            }
            Ok(TransitionOutcome::Completed)
        }
    }

    struct FnInterceptor {
        name: &'static str,
        priority: i32,
        outcome: fn(&InterceptRequest) -> Outcome,
    }

    #[async_trait]
    impl Interceptor for FnInterceptor {
        fn priority(&self) -> i32 {
            self.priority
        }

        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, request: &InterceptRequest) -> Outcome {
            (self.outcome)(request)
        }
    }

    fn interceptor(
        name: &'static str,
        priority: i32,
        outcome: fn(&InterceptRequest) -> Outcome,
    ) -> Arc<dyn Interceptor> {
        Arc::new(FnInterceptor {
            name,
            priority,
            outcome,
        })
    }

    fn spec(name: &str) -> SpecHandle {
        Arc::new(name.to_string())
    }

    fn fast_config() -> RouterConfig {
        RouterConfig::new().retry_delay_ms(10)
    }

    #[tokio::test]
    async fn test_navigate_happy_path() {
        let factory = CountingFactory::ok();
        let executor = CountingExecutor::ok();
        let router = Router::new(factory.clone(), executor.clone());
        router.register("/home", "core", spec("home")).unwrap();

        router.navigate("app://home").await.unwrap();
        assert_eq!(factory.calls(), 1);
        assert_eq!(executor.calls(), 1);
        assert_eq!(router.current_location(), Some("app://home".to_string()));
    }

    #[tokio::test]
    async fn test_route_not_found_is_fatal() {
        let factory = CountingFactory::ok();
        let router = Router::new(factory.clone(), CountingExecutor::ok());

        let err = router.navigate("app://missing").await.unwrap_err();
        assert!(matches!(err, RouterError::RouteNotFound { path } if path == "/missing"));
        assert_eq!(factory.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal() {
        let router = Router::new(CountingFactory::ok(), CountingExecutor::ok());
        assert!(matches!(
            router.navigate("  ").await,
            Err(RouterError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_param_precedence_path_over_caller_over_query() {
        let factory = CountingFactory::ok();
        let router = Router::new(factory.clone(), CountingExecutor::ok());
        router.register("/user/:id", "core", spec("user")).unwrap();

        let params = HashMap::from([
            ("tab".to_string(), "caller".to_string()),
            ("lang".to_string(), "fr".to_string()),
        ]);
        router
            .navigate_with(
                "app://user/42?id=999&tab=query",
                Some(params),
                NavigationKind::Push,
            )
            .await
            .unwrap();

        let context = factory.last_context.lock().clone().unwrap();
        assert_eq!(context.param("id"), Some("42"));
        assert_eq!(context.param("tab"), Some("caller"));
        assert_eq!(context.param("lang"), Some("fr"));
        assert_eq!(context.module, "core");
    }

    #[tokio::test]
    async fn test_interceptor_block_prevents_creation() {
        let factory = CountingFactory::ok();
        let router = Router::new(factory.clone(), CountingExecutor::ok());
        router.register("/home", "core", spec("home")).unwrap();
        router.add_interceptor(interceptor("gate", 50, |_| Outcome::block("denied")));

        let err = router.navigate("app://home").await.unwrap_err();
        assert!(matches!(
            err,
            RouterError::InterceptorRejected { reason } if reason == "denied"
        ));
        assert_eq!(factory.calls(), 0);
    }

    #[tokio::test]
    async fn test_interceptor_redirect_reroutes() {
        let factory = CountingFactory::ok();
        let router = Router::new(factory.clone(), CountingExecutor::ok());
        router.register("/cart", "shop", spec("cart")).unwrap();
        router.register("/login", "auth", spec("login")).unwrap();
        router.add_interceptor(interceptor("auth", 100, |req| {
            if req.url == "/cart" {
                Outcome::redirect(
                    "/login?next=cart",
                    HashMap::from([("reason".to_string(), "auth".to_string())]),
                )
            } else {
                Outcome::pass()
            }
        }));

        router.navigate("app://cart").await.unwrap();
        let context = factory.last_context.lock().clone().unwrap();
        assert_eq!(context.module, "auth");
        // Redirect URL's own query folds in under the chain-supplied params
        assert_eq!(context.param("next"), Some("cart"));
        assert_eq!(context.param("reason"), Some("auth"));
        assert_eq!(
            router.current_location(),
            Some("/login?next=cart".to_string())
        );
    }

    #[tokio::test]
    async fn test_interceptor_kind_override() {
        let executor = CountingExecutor::ok();
        let router = Router::new(CountingFactory::ok(), executor.clone());
        router.register("/paywall", "shop", spec("paywall")).unwrap();
        router.add_interceptor(interceptor("modal", 0, |_| {
            Outcome::force_kind(NavigationKind::Present)
        }));

        router.navigate("app://paywall").await.unwrap();
        assert_eq!(*executor.last_kind.lock(), Some("present"));
    }

    #[tokio::test]
    async fn test_custom_kind_never_overridden() {
        let executor = CountingExecutor::ok();
        let router = Router::new(CountingFactory::ok(), executor.clone());
        router.register("/paywall", "shop", spec("paywall")).unwrap();
        router.add_interceptor(interceptor("modal", 0, |_| {
            Outcome::force_kind(NavigationKind::Present)
        }));

        router
            .navigate_with(
                "app://paywall",
                None,
                NavigationKind::Custom("fade".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(*executor.last_kind.lock(), Some("custom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_creation_retried_then_succeeds() {
        let factory = CountingFactory::failing(2);
        let router = Router::with_config(fast_config(), factory.clone(), CountingExecutor::ok());
        router.register("/home", "core", spec("home")).unwrap();

        router.navigate("app://home").await.unwrap();
        assert_eq!(factory.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_creation_retries_exhausted() {
        let factory = CountingFactory::failing(u32::MAX);
        let config = fast_config().max_retry_count(2);
        let router = Router::with_config(config, factory.clone(), CountingExecutor::ok());
        router.register("/home", "core", spec("home")).unwrap();

        let err = router.navigate("app://home").await.unwrap_err();
        assert!(matches!(
            err,
            RouterError::DestinationCreation { attempts: 3, .. }
        ));
        assert_eq!(factory.calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let factory = CountingFactory::permanent();
        let router = Router::with_config(fast_config(), factory.clone(), CountingExecutor::ok());
        router.register("/home", "core", spec("home")).unwrap();

        let err = router.navigate("app://home").await.unwrap_err();
        assert!(matches!(
            err,
            RouterError::DestinationCreation { attempts: 1, .. }
        ));
        assert_eq!(factory.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_failure_retried() {
        let executor = CountingExecutor::failing(1);
        let router = Router::with_config(fast_config(), CountingFactory::ok(), executor.clone());
        router.register("/home", "core", spec("home")).unwrap();

        router.navigate("app://home").await.unwrap();
        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_retry_stops_silently() {
        let factory = CountingFactory::failing(u32::MAX);
        let executor = CountingExecutor::ok();
        let config = RouterConfig::new().retry_delay(Duration::from_secs(60));
        let router = Router::with_config(config, factory.clone(), executor.clone());
        router.register("/home", "core", spec("home")).unwrap();

        let task = {
            let router = router.clone();
            tokio::spawn(async move { router.navigate("app://home").await })
        };
        // Let the navigation fail its first attempt and park in the delay
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        router.cancel_current_navigation();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(RouterError::Cancelled)));
        assert_eq!(factory.calls(), 1);
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_new_navigation_supersedes_previous() {
        let gate = Arc::new(Semaphore::new(0));
        let factory = CountingFactory::gated("slow", gate.clone());
        let executor = CountingExecutor::ok();
        let router = Router::new(factory.clone(), executor.clone());
        router.register("/slow", "core", spec("slow")).unwrap();
        router.register("/fast", "core", spec("fast")).unwrap();

        let superseded = {
            let router = router.clone();
            tokio::spawn(async move { router.navigate("app://slow").await })
        };
        tokio::task::yield_now().await;

        router.navigate("app://fast").await.unwrap();
        assert_eq!(router.current_location(), Some("app://fast".to_string()));

        // Let the stalled creation finish; the superseded task must not
        // dispatch its transition
        gate.add_permits(1);
        let result = superseded.await.unwrap();
        assert!(matches!(result, Err(RouterError::Cancelled)));
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_present_pending_completion_signal() {
        let executor = CountingExecutor::pending(0);
        let router = Router::new(CountingFactory::ok(), executor.clone());
        router.register("/sheet", "core", spec("sheet")).unwrap();

        router
            .navigate_with("app://sheet", None, NavigationKind::Present)
            .await
            .unwrap();
        assert_eq!(executor.calls(), 1);
        assert_eq!(*executor.last_kind.lock(), Some("present"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_failure_retried() {
        let executor = CountingExecutor::pending(1);
        let router = Router::with_config(fast_config(), CountingFactory::ok(), executor.clone());
        router.register("/sheet", "core", spec("sheet")).unwrap();

        router
            .navigate_with("app://sheet", None, NavigationKind::Present)
            .await
            .unwrap();
        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test]
    async fn test_transition_sees_previous_location() {
        let executor = CountingExecutor::ok();
        let router = Router::new(CountingFactory::ok(), executor.clone());
        router.register("/a", "core", spec("a")).unwrap();
        router.register("/b", "core", spec("b")).unwrap();

        router.navigate("app://a").await.unwrap();
        assert_eq!(*executor.last_from.lock(), None);

        router.navigate("app://b").await.unwrap();
        assert_eq!(*executor.last_from.lock(), Some("app://a".to_string()));
    }

    struct RoutesModule {
        name: &'static str,
        deps: Vec<String>,
        patterns: Vec<&'static str>,
    }

    impl Module for RoutesModule {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }

        fn routes(&self) -> Vec<RouteDef> {
            self.patterns
                .iter()
                .map(|p| RouteDef::new(*p, spec(self.name)))
                .collect()
        }
    }

    fn module(name: &'static str, deps: &[&str], patterns: &[&'static str]) -> Arc<dyn Module> {
        Arc::new(RoutesModule {
            name,
            deps: deps.iter().map(|d| d.to_string()).collect(),
            patterns: patterns.to_vec(),
        })
    }

    #[tokio::test]
    async fn test_unloaded_module_routes_stop_resolving() {
        let router = Router::new(CountingFactory::ok(), CountingExecutor::ok());
        router
            .install_module(module("shop", &[], &["/cart", "/cart/:item"]))
            .unwrap();
        router.load_module("shop").unwrap();

        router.navigate("app://cart/42").await.unwrap();

        router.unload_module("shop").unwrap();
        // The cached resolution for this path must not survive the unload
        let err = router.navigate("app://cart/42").await.unwrap_err();
        assert!(matches!(err, RouterError::RouteNotFound { .. }));
        assert_eq!(router.route_count(), 0);
    }

    #[tokio::test]
    async fn test_module_dependency_ordering() {
        let router = Router::new(CountingFactory::ok(), CountingExecutor::ok());
        router
            .install_module(module("account", &[], &["/account"]))
            .unwrap();
        router
            .install_module(module("checkout", &["account"], &["/checkout"]))
            .unwrap();

        assert!(matches!(
            router.load_module("checkout"),
            Err(RouterError::DependencyNotSatisfied { .. })
        ));
        assert!(matches!(
            router.navigate("app://checkout").await,
            Err(RouterError::RouteNotFound { .. })
        ));

        router.load_module("account").unwrap();
        router.load_module("checkout").unwrap();
        router.navigate("app://checkout").await.unwrap();

        let unloaded = router.unload_module_cascade("account").unwrap();
        assert_eq!(unloaded, vec!["checkout", "account"]);
        assert_eq!(router.module_state("account"), Some(ModuleState::Unloaded));
    }

    #[tokio::test]
    async fn test_suspended_module_still_routes() {
        let router = Router::new(CountingFactory::ok(), CountingExecutor::ok());
        router
            .install_module(module("shop", &[], &["/cart"]))
            .unwrap();
        router.load_module("shop").unwrap();
        router.suspend_module("shop").unwrap();

        router.navigate("app://cart").await.unwrap();
        assert_eq!(router.module_state("shop"), Some(ModuleState::Suspended));

        router.resume_module("shop").unwrap();
        assert_eq!(router.module_state("shop"), Some(ModuleState::Loaded));
    }

    #[tokio::test]
    async fn test_strict_registration_surfaces_duplicates() {
        let config = RouterConfig::new().registration(waypoint_router::RegistrationPolicy::Strict);
        let router = Router::with_config(config, CountingFactory::ok(), CountingExecutor::ok());
        router.register("/user/:id", "core", spec("a")).unwrap();

        let err = router.register("/user/:uid", "core", spec("b")).unwrap_err();
        assert!(matches!(err, RouterError::Registry(_)));
    }

    #[tokio::test]
    async fn test_route_listing() {
        let router = Router::new(CountingFactory::ok(), CountingExecutor::ok());
        router.register("/cart", "shop", spec("cart")).unwrap();
        router.register("/user/:id", "account", spec("user")).unwrap();

        assert_eq!(
            router.routes(),
            vec![
                ("/cart".to_string(), "shop".to_string()),
                ("/user/:id".to_string(), "account".to_string()),
            ]
        );
        assert_eq!(router.routes_for_module("shop"), vec!["/cart"]);
        assert!(router.routes_for_module("ghost").is_empty());
    }

    #[tokio::test]
    async fn test_cache_stats_through_facade() {
        let router = Router::new(CountingFactory::ok(), CountingExecutor::ok());
        router.register("/home", "core", spec("home")).unwrap();

        router.navigate("app://home").await.unwrap();
        router.navigate("app://home").await.unwrap();

        let stats = router.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }
}
