//! Resolved artifact sets and the capabilities they expose.

mod composite;
mod source;
mod transformed;

pub use crate::set::composite::CompositeArtifactSet;
pub use crate::set::source::{Origin, SourceArtifactSet};
pub use crate::set::transformed::TransformedArtifactSet;

use crate::core::SetId;
use crate::engine::{NodeInput, OperationQueue, TaskDependencyContext};
use crate::visit::{AsyncArtifactListener, Completion};
use crate::ResolvableArtifact;

/// A set of artifacts which can be visited and which may need work to be
/// done before its contents are available.
pub trait ResolvedArtifactSet: Send + Sync {
    /// Structural identity, equal for sets resolving to the same artifacts.
    fn identity(&self) -> SetId;

    /// Starts visiting this set, see [`crate::visit`] for the protocol.
    fn start_visit<'a>(
        &'a self,
        queue: &dyn OperationQueue,
        listener: &mut dyn AsyncArtifactListener,
    ) -> Completion<'a>;

    /// Reports the work which has to happen before this set can be visited.
    fn visit_dependencies(&self, context: &mut dyn TaskDependencyContext);

    /// What a transformation of this set takes as inputs, one entry per
    /// resulting node, in visit order.
    fn node_inputs(&self) -> Vec<NodeInput>;
}

/// Direct access to untransformed artifacts, split by where they come from.
///
/// Only sets holding source artifacts implement this, transformed sets have
/// no meaningful answer.
pub trait ClassifiedArtifacts {
    fn visit_local_artifacts(&self, visitor: &mut dyn FnMut(&ResolvableArtifact));

    fn visit_external_artifacts(&self, visitor: &mut dyn FnMut(&ResolvableArtifact));
}

/// A set with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyArtifactSet;

impl ResolvedArtifactSet for EmptyArtifactSet {
    fn identity(&self) -> SetId {
        SetId::EMPTY
    }

    fn start_visit<'a>(
        &'a self,
        _: &dyn OperationQueue,
        listener: &mut dyn AsyncArtifactListener,
    ) -> Completion<'a> {
        listener.prepare_for_visit(self);
        Completion::empty(self)
    }

    fn visit_dependencies(&self, _: &mut dyn TaskDependencyContext) {}

    fn node_inputs(&self) -> Vec<NodeInput> {
        vec![]
    }
}
