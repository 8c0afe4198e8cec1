use std::sync::Arc;

use crate::core::SetId;
use crate::engine::{NodeInput, OperationQueue, TaskDependencyContext};
use crate::set::{ClassifiedArtifacts, ResolvedArtifactSet};
use crate::visit::{AsyncArtifactListener, Completion, VisitType};
use crate::{AttributeSet, ComponentId, ResolvableArtifact};

/// Where the artifacts of a [`SourceArtifactSet`] come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Built by a project of the current build.
    Local,
    /// Downloaded module artifacts.
    External,
}

/// The untransformed artifacts of one component variant.
///
/// These are always available, visiting them never schedules any work.
#[derive(Debug, Clone)]
pub struct SourceArtifactSet {
    owner: ComponentId,
    attributes: AttributeSet,
    artifacts: Arc<[ResolvableArtifact]>,
    origin: Origin,
    identity: SetId,
}

impl SourceArtifactSet {
    pub fn new(
        origin: Origin,
        owner: ComponentId,
        attributes: AttributeSet,
        artifacts: impl IntoIterator<Item = ResolvableArtifact>,
    ) -> Self {
        let artifacts: Arc<[ResolvableArtifact]> = artifacts.into_iter().collect();
        let identity = SetId::of(&(origin, &owner, &attributes, &artifacts));

        Self {
            owner,
            attributes,
            artifacts,
            origin,
            identity,
        }
    }

    pub fn local(
        owner: ComponentId,
        attributes: AttributeSet,
        artifacts: impl IntoIterator<Item = ResolvableArtifact>,
    ) -> Self {
        Self::new(Origin::Local, owner, attributes, artifacts)
    }

    pub fn external(
        owner: ComponentId,
        attributes: AttributeSet,
        artifacts: impl IntoIterator<Item = ResolvableArtifact>,
    ) -> Self {
        Self::new(Origin::External, owner, attributes, artifacts)
    }

    pub fn owner_id(&self) -> &ComponentId {
        &self.owner
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn artifacts(&self) -> &[ResolvableArtifact] {
        &self.artifacts
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

impl ResolvedArtifactSet for SourceArtifactSet {
    fn identity(&self) -> SetId {
        self.identity
    }

    fn start_visit<'a>(
        &'a self,
        _: &dyn OperationQueue,
        listener: &mut dyn AsyncArtifactListener,
    ) -> Completion<'a> {
        if listener.prepare_for_visit(self) == VisitType::NoContents {
            return Completion::empty(self);
        }

        Completion::new(move |visitor| {
            for artifact in self.artifacts.iter() {
                visitor.visit_artifact(&self.owner, &self.attributes, artifact);
            }
            visitor.end_visit_collection(self);
        })
    }

    fn visit_dependencies(&self, _: &mut dyn TaskDependencyContext) {}

    fn node_inputs(&self) -> Vec<NodeInput> {
        self.artifacts
            .iter()
            .cloned()
            .map(NodeInput::Initial)
            .collect()
    }
}

impl ClassifiedArtifacts for SourceArtifactSet {
    fn visit_local_artifacts(&self, visitor: &mut dyn FnMut(&ResolvableArtifact)) {
        if self.origin == Origin::Local {
            self.artifacts.iter().for_each(visitor);
        }
    }

    fn visit_external_artifacts(&self, visitor: &mut dyn FnMut(&ResolvableArtifact)) {
        if self.origin == Origin::External {
            self.artifacts.iter().for_each(visitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InlineQueue;
    use crate::error::TransformError;
    use crate::visit::ArtifactVisitor;

    #[derive(Default)]
    struct Names(Vec<String>, usize);

    impl ArtifactVisitor for Names {
        fn visit_artifact(
            &mut self,
            _: &ComponentId,
            _: &AttributeSet,
            artifact: &ResolvableArtifact,
        ) {
            self.0.push(artifact.id().name().to_string());
        }

        fn visit_failure(&mut self, failure: TransformError) {
            panic!("unexpected failure {failure}");
        }

        fn end_visit_collection(&mut self, _: &dyn ResolvedArtifactSet) {
            self.1 += 1;
        }
    }

    fn jars(origin: Origin, names: &[&str]) -> SourceArtifactSet {
        let lib = ComponentId::new("project :lib");
        SourceArtifactSet::new(
            origin,
            lib.clone(),
            AttributeSet::of([("usage", "jar")]),
            names.iter().map(|n| ResolvableArtifact::new(lib.clone(), *n)),
        )
    }

    #[test]
    fn test_structural_identity() {
        assert_eq!(
            jars(Origin::Local, &["foo.jar"]).identity(),
            jars(Origin::Local, &["foo.jar"]).identity()
        );
        assert_ne!(
            jars(Origin::Local, &["foo.jar"]).identity(),
            jars(Origin::Local, &["bar.jar"]).identity()
        );
        assert_ne!(
            jars(Origin::Local, &["foo.jar"]).identity(),
            jars(Origin::External, &["foo.jar"]).identity()
        );
    }

    #[test]
    fn test_visit_renders_in_order() {
        let set = jars(Origin::Local, &["foo.jar", "bar.jar"]);
        let mut names = Names::default();

        set.start_visit(&InlineQueue, &mut VisitType::Contents)
            .visit(&mut names);

        assert_eq!(names.0, ["foo.jar", "bar.jar"]);
        assert_eq!(names.1, 1);
    }

    #[test]
    fn test_visit_without_contents() {
        let set = jars(Origin::Local, &["foo.jar"]);
        let mut names = Names::default();

        set.start_visit(&InlineQueue, &mut VisitType::NoContents)
            .visit(&mut names);

        assert!(names.0.is_empty());
        assert_eq!(names.1, 1);
    }

    #[test]
    fn test_classified_visits() {
        let local = jars(Origin::Local, &["foo.jar"]);
        let external = jars(Origin::External, &["asm.jar"]);

        let mut seen = Vec::new();
        local.visit_local_artifacts(&mut |a| seen.push(a.id().name().to_string()));
        local.visit_external_artifacts(&mut |a| seen.push(a.id().name().to_string()));
        external.visit_local_artifacts(&mut |a| seen.push(a.id().name().to_string()));
        external.visit_external_artifacts(&mut |a| seen.push(a.id().name().to_string()));

        assert_eq!(seen, ["foo.jar", "asm.jar"]);
    }
}
