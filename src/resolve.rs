//! Resolving many artifact sets at once.

use std::time::Instant;

use serde::Deserialize;
use tracing::Level;

use crate::engine::{InlineQueue, OperationQueue, ParallelQueue};
use crate::error::{ResolveError, TransformError};
use crate::set::ResolvedArtifactSet;
use crate::visit::{ArtifactVisitor, AsyncArtifactListener, Completion};
use crate::{AttributeSet, ComponentId, ResolvableArtifact};

/// How transformations are executed during resolution.
///
/// ```json
/// { "parallel": true, "threads": 8 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveOptions {
    /// Run transformations on a thread pool instead of the calling thread.
    pub parallel: bool,
    /// Size of the thread pool, rayon picks one when unset.
    pub threads: Option<usize>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

impl ResolveOptions {
    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the queue these options describe.
    pub fn queue(&self) -> Result<Box<dyn OperationQueue>, ResolveError> {
        Ok(match (self.parallel, self.threads) {
            (false, _) => Box::new(InlineQueue),
            (true, None) => Box::new(ParallelQueue::new()),
            (true, Some(threads)) => Box::new(ParallelQueue::with_threads(threads)?),
        })
    }
}

/// One artifact as rendered by a visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub display_name: ComponentId,
    pub attributes: AttributeSet,
    pub artifact: ResolvableArtifact,
}

/// Visitor that keeps everything it is shown.
#[derive(Debug, Default)]
pub struct ArtifactCollector {
    artifacts: Vec<ResolvedArtifact>,
    failures: Vec<TransformError>,
    visited: usize,
}

impl ArtifactCollector {
    pub fn artifacts(&self) -> &[ResolvedArtifact] {
        &self.artifacts
    }

    pub fn failures(&self) -> &[TransformError] {
        &self.failures
    }

    /// Number of collections which signalled their end.
    pub fn visited(&self) -> usize {
        self.visited
    }

    pub fn into_result(self) -> Result<Vec<ResolvedArtifact>, ResolveError> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure.into()),
            None => Ok(self.artifacts),
        }
    }
}

impl ArtifactVisitor for ArtifactCollector {
    fn visit_artifact(
        &mut self,
        display_name: &ComponentId,
        attributes: &AttributeSet,
        artifact: &ResolvableArtifact,
    ) {
        self.artifacts.push(ResolvedArtifact {
            display_name: display_name.clone(),
            attributes: attributes.clone(),
            artifact: artifact.clone(),
        });
    }

    fn visit_failure(&mut self, failure: TransformError) {
        self.failures.push(failure);
    }

    fn end_visit_collection(&mut self, _: &dyn ResolvedArtifactSet) {
        self.visited += 1;
    }
}

/// Resolves the contents of `sets`.
///
/// Every set is started before the queue is waited on, so independent
/// transformations can run side by side. The sets are then rendered in the
/// order given. A failing set does not stop the others from being rendered,
/// the first failure is returned once all of them were.
pub fn resolve_artifacts(
    sets: &[&dyn ResolvedArtifactSet],
    queue: &dyn OperationQueue,
    listener: &mut dyn AsyncArtifactListener,
) -> Result<Vec<ResolvedArtifact>, ResolveError> {
    let span = tracing::span!(Level::INFO, "resolve", sets = sets.len());
    let _enter = span.enter();
    let start = Instant::now();

    let completions: Vec<Completion> = sets
        .iter()
        .map(|set| set.start_visit(queue, &mut *listener))
        .collect();

    queue.wait_for_completion();

    let mut collector = ArtifactCollector::default();
    for completion in completions {
        completion.visit(&mut collector);
    }

    match collector.failures.len() {
        0 => tracing::info!(
            "resolved {} artifact(s) in {:.2?}",
            collector.artifacts.len(),
            start.elapsed()
        ),
        n => tracing::warn!("resolution finished with {} failure(s)", n),
    }

    collector.into_result()
}
