//! The two-phase visitation protocol.
//!
//! Visiting an artifact set happens in two steps. [`start_visit`] asks the
//! listener whether contents are needed and, if so, kicks off whatever work
//! producing them takes. It hands back a [`Completion`] which, once that work
//! had a chance to run, renders the results to an [`ArtifactVisitor`].
//! Splitting the two lets a consumer start every set before waiting on any.
//!
//! [`start_visit`]: crate::ResolvedArtifactSet::start_visit

use crate::error::TransformError;
use crate::set::ResolvedArtifactSet;
use crate::{AttributeSet, ComponentId, ResolvableArtifact};

/// Whether a visit needs the artifacts themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitType {
    /// Artifact files are needed, transformations have to run.
    Contents,
    /// Only the structure is needed, nothing gets executed.
    NoContents,
}

/// Consulted once per set at the start of a visit.
pub trait AsyncArtifactListener {
    fn prepare_for_visit(&mut self, source: &dyn ResolvedArtifactSet) -> VisitType;
}

impl AsyncArtifactListener for VisitType {
    fn prepare_for_visit(&mut self, _: &dyn ResolvedArtifactSet) -> VisitType {
        *self
    }
}

/// Receives the results of a visit.
pub trait ArtifactVisitor {
    fn visit_artifact(
        &mut self,
        display_name: &ComponentId,
        attributes: &AttributeSet,
        artifact: &ResolvableArtifact,
    );

    fn visit_failure(&mut self, failure: TransformError);

    /// Called once a set has rendered everything it had to render.
    fn end_visit_collection(&mut self, _source: &dyn ResolvedArtifactSet) {}
}

/// The deferred second phase of a visit.
#[must_use = "a completion does nothing unless visited"]
pub struct Completion<'a>(Box<dyn FnOnce(&mut dyn ArtifactVisitor) + 'a>);

impl<'a> Completion<'a> {
    pub fn new<F>(render: F) -> Self
    where
        F: FnOnce(&mut dyn ArtifactVisitor) + 'a,
    {
        Self(Box::new(render))
    }

    /// A completion that renders nothing but still closes the collection.
    pub fn empty(source: &'a dyn ResolvedArtifactSet) -> Self {
        Self::new(move |visitor| visitor.end_visit_collection(source))
    }

    pub fn visit(self, visitor: &mut dyn ArtifactVisitor) {
        (self.0)(visitor)
    }
}
