//! Navigation orchestration
//!
//! One attempt walks Resolving -> Intercepting -> Acquiring -> Transitioning.
//! Only failures from the external collaborators are retried, on a fixed
//! delay; URL parsing, interception and route matching repeat
//! deterministically, so they fail fast. Cancellation is cooperative: the
//! flag is checked at every suspension point, and a transition already
//! dispatched to the executor is allowed to finish.

use crate::context::{NavigationKind, RouteContext};
use crate::destination::{
    CollaboratorError, Destination, DestinationFactory, TransitionExecutor, TransitionOutcome,
};
use crate::error::{Result, RouterError};
use crate::interceptor;
use crate::state::{NavigationHandle, RouterState};
use crate::url::NavigationUrl;
use std::collections::HashMap;

/// Per-attempt state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavPhase {
    Resolving,
    Intercepting,
    Acquiring,
    Transitioning,
    Completed,
    Failed,
}

impl NavPhase {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            NavPhase::Resolving => "resolving",
            NavPhase::Intercepting => "intercepting",
            NavPhase::Acquiring => "acquiring",
            NavPhase::Transitioning => "transitioning",
            NavPhase::Completed => "completed",
            NavPhase::Failed => "failed",
        }
    }
}

/// Drive one navigation to a terminal state and release its handle
pub(crate) async fn drive(
    state: &RouterState,
    factory: &dyn DestinationFactory,
    executor: &dyn TransitionExecutor,
    handle: &NavigationHandle,
    url: &str,
    caller_params: HashMap<String, String>,
    kind: NavigationKind,
) -> Result<()> {
    let result = run(state, factory, executor, handle, url, caller_params, kind).await;
    state.finish_navigation(handle);
    match &result {
        Ok(()) => tracing::debug!(
            seq = handle.seq(),
            phase = NavPhase::Completed.as_str(),
            %url,
            "navigation completed"
        ),
        Err(err) => tracing::debug!(
            seq = handle.seq(),
            phase = NavPhase::Failed.as_str(),
            %url,
            %err,
            "navigation ended"
        ),
    }
    result
}

async fn run(
    state: &RouterState,
    factory: &dyn DestinationFactory,
    executor: &dyn TransitionExecutor,
    handle: &NavigationHandle,
    url: &str,
    caller_params: HashMap<String, String>,
    kind: NavigationKind,
) -> Result<()> {
    tracing::debug!(
        seq = handle.seq(),
        phase = NavPhase::Resolving.as_str(),
        %url,
        "navigation started"
    );
    let parsed = NavigationUrl::parse(url)?;

    // Caller params override query/fragment params
    let mut params: HashMap<String, String> = parsed.params.iter().cloned().collect();
    params.extend(caller_params);

    tracing::debug!(seq = handle.seq(), phase = NavPhase::Intercepting.as_str());
    let interceptors = state.interceptors();
    let resolution = interceptor::run_chain(
        &interceptors,
        parsed.path.clone(),
        params,
        kind,
        handle.token(),
    )
    .await?;

    // The chain may have pointed the request somewhere else entirely; its
    // final URL can carry query/fragment params of its own, which fold in
    // below the chain-supplied mapping
    let (effective_url, path, params) = if resolution.url == parsed.path {
        (parsed.raw, parsed.path, resolution.params)
    } else {
        let redirected = NavigationUrl::parse(&resolution.url)?;
        let mut merged: HashMap<String, String> = redirected.params.iter().cloned().collect();
        merged.extend(resolution.params);
        (redirected.raw, redirected.path, merged)
    };
    let kind = resolution.kind;

    let max_retries = state.config().max_retry_count;
    let retry_delay = state.config().retry_delay;
    let animated = state.config().animated;
    let mut retries: u32 = 0;

    loop {
        if handle.is_cancelled() {
            return Err(RouterError::Cancelled);
        }

        tracing::debug!(
            seq = handle.seq(),
            phase = NavPhase::Acquiring.as_str(),
            %path,
            retries
        );
        let Some(resolved) = state.resolve_route(&path) else {
            return Err(RouterError::RouteNotFound { path });
        };

        // Matched path params take precedence over everything merged so far
        let mut merged = params.clone();
        for (name, value) in &resolved.params {
            merged.insert(name.clone(), value.clone());
        }
        let context = RouteContext {
            url: effective_url.clone(),
            params: merged,
            module: resolved.module.clone(),
        };

        let failure = match factory.create(&resolved.destination, &context).await {
            Ok(destination) => {
                if handle.is_cancelled() {
                    // Superseded while creating: the transition must not start
                    return Err(RouterError::Cancelled);
                }
                match transition(state, executor, handle, &kind, destination, animated).await {
                    Ok(()) => {
                        state.set_location(handle, &effective_url);
                        return Ok(());
                    }
                    Err(err) => Failure::Transition(err),
                }
            }
            Err(err) => Failure::Creation(err),
        };

        if handle.is_cancelled() {
            return Err(RouterError::Cancelled);
        }
        if !failure.error().retryable || retries >= max_retries {
            return Err(failure.surface(retries + 1));
        }
        retries += 1;
        tracing::warn!(
            seq = handle.seq(),
            retry = retries,
            max = max_retries,
            error = %failure.error(),
            "navigation attempt failed, retrying"
        );
        tokio::select! {
            _ = handle.token().cancelled() => return Err(RouterError::Cancelled),
            _ = tokio::time::sleep(retry_delay) => {}
        }
    }
}

async fn transition(
    state: &RouterState,
    executor: &dyn TransitionExecutor,
    handle: &NavigationHandle,
    kind: &NavigationKind,
    destination: Box<dyn Destination>,
    animated: bool,
) -> std::result::Result<(), CollaboratorError> {
    tracing::debug!(
        seq = handle.seq(),
        phase = NavPhase::Transitioning.as_str(),
        kind = kind.as_str(),
        destination = destination.name()
    );
    let from = state.location();
    match executor
        .perform(kind, destination, from.as_deref(), animated)
        .await?
    {
        TransitionOutcome::Completed => Ok(()),
        TransitionOutcome::Pending(receiver) => match receiver.await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::new(
                "transition dropped its completion signal",
            )),
        },
    }
}

/// Which retryable step failed, for error wrapping
enum Failure {
    Creation(CollaboratorError),
    Transition(CollaboratorError),
}

impl Failure {
    fn error(&self) -> &CollaboratorError {
        match self {
            Failure::Creation(err) | Failure::Transition(err) => err,
        }
    }

    fn surface(self, attempts: u32) -> RouterError {
        match self {
            Failure::Creation(err) => RouterError::DestinationCreation {
                message: err.message,
                attempts,
            },
            Failure::Transition(err) => RouterError::Transition {
                message: err.message,
                attempts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(NavPhase::Resolving.as_str(), "resolving");
        assert_eq!(NavPhase::Intercepting.as_str(), "intercepting");
        assert_eq!(NavPhase::Acquiring.as_str(), "acquiring");
        assert_eq!(NavPhase::Transitioning.as_str(), "transitioning");
        assert_eq!(NavPhase::Completed.as_str(), "completed");
        assert_eq!(NavPhase::Failed.as_str(), "failed");
    }

    #[test]
    fn test_failure_surfaces_as_typed_error() {
        let creation = Failure::Creation(CollaboratorError::new("boom"));
        assert!(matches!(
            creation.surface(4),
            RouterError::DestinationCreation { attempts: 4, .. }
        ));

        let transition = Failure::Transition(CollaboratorError::permanent("gone"));
        assert!(matches!(
            transition.surface(1),
            RouterError::Transition { attempts: 1, .. }
        ));
    }
}
