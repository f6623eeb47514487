//! Navigation interceptors
//!
//! Ordered middleware over navigation requests. Each interceptor sees the
//! current (url, params, kind) and resolves to continue, redirect, or block.
//! The chain runs strictly sequentially - later interceptors must observe
//! the redirects of earlier ones, so concurrent execution is not permitted.

use crate::context::NavigationKind;
use crate::error::{Result, RouterError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Input handed to each interceptor
#[derive(Debug, Clone)]
pub struct InterceptRequest {
    /// Current request URL (already rewritten by earlier interceptors)
    pub url: String,
    /// Current merged parameters
    pub params: HashMap<String, String>,
    /// Effective navigation kind
    pub kind: NavigationKind,
}

/// What an interceptor decided
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Proceed; unset fields pass the current values through.
    /// New params merge over old, new values winning on key collision.
    Continue {
        url: Option<String>,
        params: Option<HashMap<String, String>>,
        kind: Option<NavigationKind>,
    },
    /// Replace URL and params outright (no merge), continue the chain
    Redirect {
        url: String,
        params: HashMap<String, String>,
    },
    /// Short-circuit the chain and fail the navigation
    Block { reason: String },
}

impl Outcome {
    /// Continue with everything unchanged
    pub fn pass() -> Self {
        Outcome::Continue {
            url: None,
            params: None,
            kind: None,
        }
    }

    /// Continue with a rewritten URL
    pub fn rewrite_url(url: impl Into<String>) -> Self {
        Outcome::Continue {
            url: Some(url.into()),
            params: None,
            kind: None,
        }
    }

    /// Continue, forcing a navigation kind (ignored for custom caller kinds)
    pub fn force_kind(kind: NavigationKind) -> Self {
        Outcome::Continue {
            url: None,
            params: None,
            kind: Some(kind),
        }
    }

    pub fn redirect(url: impl Into<String>, params: HashMap<String, String>) -> Self {
        Outcome::Redirect {
            url: url.into(),
            params,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Outcome::Block {
            reason: reason.into(),
        }
    }
}

/// A middleware unit in the navigation pipeline
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Higher priority runs first; ties run in registration order
    fn priority(&self) -> i32 {
        0
    }

    /// Identifier used in traces
    fn name(&self) -> &str;

    /// Inspect the current request and decide how navigation proceeds
    async fn handle(&self, request: &InterceptRequest) -> Outcome;
}

/// Result of a full chain run
#[derive(Debug, Clone)]
pub struct ChainResolution {
    pub url: String,
    pub params: HashMap<String, String>,
    pub kind: NavigationKind,
}

struct ChainEntry {
    interceptor: Arc<dyn Interceptor>,
    priority: i32,
}

/// Priority-ordered interceptor collection
///
/// Kept sorted on insertion: descending priority, then registration order.
#[derive(Default)]
pub struct InterceptorChain {
    entries: Vec<ChainEntry>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, interceptor: Arc<dyn Interceptor>) {
        let priority = interceptor.priority();
        // Inserting after every entry of equal priority preserves
        // registration order among ties
        let idx = self.entries.partition_point(|e| e.priority >= priority);
        self.entries
            .insert(idx, ChainEntry { interceptor, priority });
    }

    /// Remove an interceptor by name; returns whether one was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.interceptor.name() != name);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered snapshot, cloned out so the chain can run without any lock held
    pub fn snapshot(&self) -> Vec<Arc<dyn Interceptor>> {
        self.entries.iter().map(|e| e.interceptor.clone()).collect()
    }
}

/// Fold a request through the interceptors, in order
///
/// Cancellation is checked before every invocation; a cancelled run makes
/// no further interceptor calls.
pub(crate) async fn run_chain(
    interceptors: &[Arc<dyn Interceptor>],
    url: String,
    params: HashMap<String, String>,
    kind: NavigationKind,
    cancel: &CancellationToken,
) -> Result<ChainResolution> {
    let caller_kind_is_custom = kind.is_custom();
    let mut current = ChainResolution { url, params, kind };

    for interceptor in interceptors {
        if cancel.is_cancelled() {
            return Err(RouterError::Cancelled);
        }
        let request = InterceptRequest {
            url: current.url.clone(),
            params: current.params.clone(),
            kind: current.kind.clone(),
        };
        match interceptor.handle(&request).await {
            Outcome::Continue { url, params, kind } => {
                if let Some(url) = url {
                    current.url = url;
                }
                if let Some(params) = params {
                    for (k, v) in params {
                        current.params.insert(k, v);
                    }
                }
                if let Some(kind) = kind {
                    if caller_kind_is_custom {
                        tracing::debug!(
                            interceptor = interceptor.name(),
                            "kind override ignored for custom caller kind"
                        );
                    } else {
                        current.kind = kind;
                    }
                }
            }
            Outcome::Redirect { url, params } => {
                tracing::debug!(
                    interceptor = interceptor.name(),
                    from = %current.url,
                    to = %url,
                    "navigation redirected"
                );
                current.url = url;
                current.params = params;
            }
            Outcome::Block { reason } => {
                tracing::debug!(
                    interceptor = interceptor.name(),
                    %reason,
                    "navigation blocked"
                );
                return Err(RouterError::InterceptorRejected { reason });
            }
        }
    }

    Ok(current)
}
