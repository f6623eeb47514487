//! waypoint-core: URL-pattern navigation router core
//!
//! Callers register destinations under URL patterns, then navigate by URL.
//! A navigation resolves through the priority-ordered matcher and its
//! cache, folds through an async interceptor chain that can rewrite,
//! redirect or block it, and runs as a single-flight task with retry and
//! cooperative cancellation. Rendering and platform transitions stay
//! behind the `DestinationFactory` / `TransitionExecutor` seams; grouped
//! route registrations are owned by dependency-aware modules.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod destination;
pub mod error;
pub mod interceptor;
pub mod module;
pub mod router;
pub mod url;

mod navigator;
mod state;

// Re-exports
pub use config::RouterConfig;
pub use context::{NavigationKind, RouteContext};
pub use destination::{
    CollaboratorError, Destination, DestinationFactory, DestinationSpec, SpecHandle,
    TransitionExecutor, TransitionOutcome,
};
pub use error::{Result, RouterError};
pub use interceptor::{
    ChainResolution, InterceptRequest, Interceptor, InterceptorChain, Outcome,
};
pub use module::{Module, ModuleManager, ModuleState, RouteDef};
pub use router::Router;
pub use url::NavigationUrl;

// Matching-core re-exports
pub use waypoint_router::{
    CacheStats, MatchResult, PatternError, RegistrationPolicy, RegistryError, RoutePattern,
};
