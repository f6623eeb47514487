//! Collaborator seams: destination creation and transition execution
//!
//! The core never renders anything. A matched route carries an opaque
//! `DestinationSpec`; the environment's `DestinationFactory` turns it into
//! a `Destination`, and its `TransitionExecutor` puts that destination on
//! screen. Both collaborators classify their failures as retryable or not.

use crate::context::{NavigationKind, RouteContext};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

/// Descriptor registered with a route: which destination a match leads to
///
/// Implementations are open-ended; the core only needs a stable name for
/// traces and for the factory to dispatch on.
pub trait DestinationSpec: Send + Sync {
    fn name(&self) -> &str;
}

impl DestinationSpec for String {
    fn name(&self) -> &str {
        self
    }
}

/// Shared handle to a destination descriptor
pub type SpecHandle = Arc<dyn DestinationSpec>;

/// Opaque created destination; owned by the environment after the transition
pub trait Destination: Send {
    fn name(&self) -> &str;
}

/// Failure reported by a collaborator
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    pub message: String,
    /// Transient failures may be retried; permanent ones surface immediately
    pub retryable: bool,
}

impl CollaboratorError {
    /// A retryable failure
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure retrying cannot fix
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Builds destinations from matched routes
#[async_trait]
pub trait DestinationFactory: Send + Sync {
    /// Create the destination for a matched route
    ///
    /// Expected to be deterministic given (spec, context); failures are
    /// reported, never panicked.
    async fn create(
        &self,
        spec: &SpecHandle,
        context: &RouteContext,
    ) -> Result<Box<dyn Destination>, CollaboratorError>;
}

/// How a transition reported completion
pub enum TransitionOutcome {
    /// Finished before `perform` returned
    Completed,
    /// Completion arrives later over the channel; `Present` transitions
    /// must use this form rather than returning early
    Pending(oneshot::Receiver<Result<(), CollaboratorError>>),
}

/// Executes the platform transition for a created destination
#[async_trait]
pub trait TransitionExecutor: Send + Sync {
    async fn perform(
        &self,
        kind: &NavigationKind,
        destination: Box<dyn Destination>,
        from: Option<&str>,
        animated: bool,
    ) -> Result<TransitionOutcome, CollaboratorError>;
}
