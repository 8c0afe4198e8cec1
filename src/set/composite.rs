use std::sync::Arc;

use crate::core::SetId;
use crate::engine::{NodeInput, OperationQueue, TaskDependencyContext};
use crate::set::ResolvedArtifactSet;
use crate::visit::{AsyncArtifactListener, Completion};

/// An ordered concatenation of artifact sets.
#[derive(Clone, Default)]
pub struct CompositeArtifactSet {
    sets: Vec<Arc<dyn ResolvedArtifactSet>>,
}

impl CompositeArtifactSet {
    pub fn new(sets: impl IntoIterator<Item = Arc<dyn ResolvedArtifactSet>>) -> Self {
        Self {
            sets: sets.into_iter().collect(),
        }
    }

    pub fn sets(&self) -> &[Arc<dyn ResolvedArtifactSet>] {
        &self.sets
    }
}

impl ResolvedArtifactSet for CompositeArtifactSet {
    fn identity(&self) -> SetId {
        let children: Vec<SetId> = self.sets.iter().map(|set| set.identity()).collect();
        SetId::of(&children)
    }

    fn start_visit<'a>(
        &'a self,
        queue: &dyn OperationQueue,
        listener: &mut dyn AsyncArtifactListener,
    ) -> Completion<'a> {
        // Every child is started before any of them is rendered.
        let completions: Vec<Completion<'a>> = self
            .sets
            .iter()
            .map(|set| set.start_visit(queue, &mut *listener))
            .collect();

        Completion::new(move |visitor| {
            for completion in completions {
                completion.visit(visitor);
            }
        })
    }

    fn visit_dependencies(&self, context: &mut dyn TaskDependencyContext) {
        for set in &self.sets {
            set.visit_dependencies(context);
        }
    }

    fn node_inputs(&self) -> Vec<NodeInput> {
        self.sets.iter().flat_map(|set| set.node_inputs()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InlineQueue;
    use crate::set::{EmptyArtifactSet, SourceArtifactSet};
    use crate::visit::VisitType;
    use crate::{AttributeSet, ComponentId, ResolvableArtifact};

    fn jars(component: &str, names: &[&str]) -> Arc<dyn ResolvedArtifactSet> {
        let owner = ComponentId::new(component);
        Arc::new(SourceArtifactSet::local(
            owner.clone(),
            AttributeSet::of([("usage", "jar")]),
            names.iter().map(|n| ResolvableArtifact::new(owner.clone(), *n)),
        ))
    }

    #[test]
    fn test_concatenates_in_order() {
        let set = CompositeArtifactSet::new([
            jars("project :a", &["a.jar"]),
            Arc::new(EmptyArtifactSet) as Arc<dyn ResolvedArtifactSet>,
            jars("project :b", &["b1.jar", "b2.jar"]),
        ]);

        let names: Vec<_> = set
            .node_inputs()
            .iter()
            .map(|input| match input {
                NodeInput::Initial(artifact) => artifact.id().name().to_string(),
                NodeInput::Chained(node) => node.to_string(),
            })
            .collect();
        assert_eq!(names, ["a.jar", "b1.jar", "b2.jar"]);

        let mut listener = VisitType::Contents;
        let mut collector = crate::resolve::ArtifactCollector::default();
        set.start_visit(&InlineQueue, &mut listener)
            .visit(&mut collector);

        let rendered: Vec<_> = collector
            .artifacts()
            .iter()
            .map(|a| a.display_name.to_string())
            .collect();
        assert_eq!(rendered, ["project :a", "project :b", "project :b"]);
        assert_eq!(collector.visited(), 3);
    }

    #[test]
    fn test_identity_follows_children() {
        let a = CompositeArtifactSet::new([jars("project :a", &["a.jar"])]);
        let b = CompositeArtifactSet::new([jars("project :a", &["a.jar"])]);
        let c = CompositeArtifactSet::new([jars("project :b", &["a.jar"])]);

        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
    }
}
