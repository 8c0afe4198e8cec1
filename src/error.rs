use std::fmt::{Debug, Display};
use std::sync::Arc;

use thiserror::Error;

use crate::ComponentId;
use crate::core::ArcStr;

/// A userland failure shared between every reader of a failed node.
///
/// Transform failures are sticky for the whole build, so the same error has
/// to be handed out many times. The inner [`anyhow::Error`] is not clonable,
/// hence the [`Arc`].
#[derive(Clone)]
pub struct Cause(pub(crate) Arc<anyhow::Error>);

impl Cause {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(err.into()))
    }

    /// Returns `true` if both causes are the very same captured failure.
    pub fn ptr_eq(&self, other: &Cause) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<anyhow::Error> for Cause {
    fn from(e: anyhow::Error) -> Self {
        Cause(Arc::new(e))
    }
}

impl Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&*self.0, f)
    }
}

impl Debug for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl std::error::Error for Cause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        (**self.0).source()
    }
}

/// Failure of a single transformation node.
#[derive(Debug, Error, Clone)]
pub enum TransformError {
    #[error("Failed to transform {artifact} ({component}) with {transformation}:\n{cause}")]
    Failed {
        component: ComponentId,
        transformation: ArcStr,
        artifact: ArcStr,
        cause: Cause,
    },

    #[error("Transform of {artifact} ({component}) with {transformation} panicked: {message}")]
    Panicked {
        component: ComponentId,
        transformation: ArcStr,
        artifact: ArcStr,
        message: String,
    },

    #[error("{0} has not been executed yet")]
    NotExecuted(String),
}

impl TransformError {
    /// The component whose artifact failed to transform, if known.
    pub fn component(&self) -> Option<&ComponentId> {
        match self {
            TransformError::Failed { component, .. } => Some(component),
            TransformError::Panicked { component, .. } => Some(component),
            TransformError::NotExecuted(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Cycle detected in transformation graph at {0}")]
    Cycle(String),

    #[error("Failed to build the thread pool:\n{0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Invalid resolve options:\n{0}")]
    Options(#[from] serde_json::Error),
}
