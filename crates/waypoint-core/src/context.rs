//! Navigation kinds and the per-attempt route context

use std::collections::HashMap;

/// Requested transition style
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationKind {
    /// Push onto the navigation stack
    Push,
    /// Modal presentation; completion is signalled asynchronously
    Present,
    /// Replace the current top
    Replace,
    /// Pop the current top
    Pop,
    /// Pop everything back to the root
    PopToRoot,
    /// Pop back to a named destination
    PopTo(String),
    /// Environment-defined transition; never overridden by interceptors
    Custom(String),
}

impl NavigationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationKind::Push => "push",
            NavigationKind::Present => "present",
            NavigationKind::Replace => "replace",
            NavigationKind::Pop => "pop",
            NavigationKind::PopToRoot => "pop-to-root",
            NavigationKind::PopTo(_) => "pop-to",
            NavigationKind::Custom(_) => "custom",
        }
    }

    /// Custom kinds express caller intent the chain must not rewrite
    pub fn is_custom(&self) -> bool {
        matches!(self, NavigationKind::Custom(_))
    }
}

impl Default for NavigationKind {
    fn default() -> Self {
        NavigationKind::Push
    }
}

/// Per-attempt bundle handed to destination creation
///
/// Parameter precedence on key collision: matched path params override
/// caller-supplied params, which override URL query/fragment params.
/// Discarded once the destination has been created.
#[derive(Debug, Clone)]
pub struct RouteContext {
    /// The effective navigation URL (post-redirect when the chain rewrote it)
    pub url: String,
    /// Merged parameter mapping
    pub params: HashMap<String, String>,
    /// Module owning the matched route
    pub module: String,
}

impl RouteContext {
    /// Look up a merged parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
