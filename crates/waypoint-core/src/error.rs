//! Error types for waypoint-core

use thiserror::Error;

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, RouterError>;

/// Error types for the navigation router
///
/// Only `DestinationCreation` and `Transition` are ever retried; every
/// other failure repeats deterministically and surfaces on first occurrence.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Unparsable navigation URL
    #[error("invalid navigation url: {0}")]
    InvalidUrl(String),

    /// An interceptor blocked the navigation
    #[error("navigation rejected: {reason}")]
    InterceptorRejected { reason: String },

    /// No registered pattern matches the request path
    #[error("no route matches path: {path}")]
    RouteNotFound { path: String },

    /// The destination factory failed; retries exhausted or not applicable
    #[error("destination creation failed after {attempts} attempt(s): {message}")]
    DestinationCreation { message: String, attempts: u32 },

    /// The transition executor failed; retries exhausted or not applicable
    #[error("transition failed after {attempts} attempt(s): {message}")]
    Transition { message: String, attempts: u32 },

    /// A module was loaded before one of its declared dependencies
    #[error("module {module} requires dependency {missing} to be loaded")]
    DependencyNotSatisfied { module: String, missing: String },

    /// A module with loaded dependents was unloaded without cascade
    #[error("module {module} is still required by {dependents:?}")]
    DependencyViolation {
        module: String,
        dependents: Vec<String>,
    },

    /// Cascade unload walked into a dependency cycle
    #[error("dependency cycle involving module {module}")]
    CyclicDependency { module: String },

    /// Module name not known to the lifecycle manager
    #[error("unknown module: {0}")]
    ModuleNotFound(String),

    /// Lifecycle operation not valid for the module's current state
    #[error("module {module} is {state}")]
    InvalidModuleState { module: String, state: &'static str },

    /// Registration failure (invalid or duplicate pattern)
    #[error(transparent)]
    Registry(#[from] waypoint_router::RegistryError),

    /// The navigation was superseded by a newer one
    #[error("navigation cancelled")]
    Cancelled,
}
