//! waypoint-router: URL pattern matching and route registry
//!
//! Single Source of Truth (SSOT) matching core used by waypoint-core.
//! Holds the pure data structures: patterns, match results, the registry
//! and its path-keyed resolution cache. No async, no shared state.
//!
//! ## Pattern Syntax
//! - `:name` - Named parameter (captures one segment)
//! - `*` - Single wildcard (matches one segment, no capture)
//! - `**` - Recursive wildcard (matches the remaining path; final segment only)
//!
//! ## Priority
//! Among patterns that all match a path, the winner is chosen by:
//! 1. Highest score (static segments 10, parameters 1, wildcards 0)
//! 2. More segments (more specific)
//! 3. Earliest registration
//!
//! ## Example
//! ```
//! use waypoint_router::Registry;
//!
//! let mut registry: Registry<u32> = Registry::new();
//! registry.register("/user/:id", "profile", 1).unwrap();
//! registry.register("/user/settings", "profile", 2).unwrap();
//!
//! let resolved = registry.resolve("/user/settings").unwrap();
//! assert_eq!(resolved.destination, 2);
//!
//! let resolved = registry.resolve("/user/42").unwrap();
//! assert_eq!(resolved.destination, 1);
//! assert_eq!(resolved.params, vec![("id".to_string(), "42".to_string())]);
//! ```

pub mod pattern;
pub mod registry;

pub use pattern::{MatchResult, PatternError, RoutePattern, Segment};
pub use registry::{
    CacheStats, RegistrationPolicy, Registry, RegistryError, Resolved, RouteEntry,
};
