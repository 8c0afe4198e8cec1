use std::sync::Arc;

use crate::core::SetId;
use crate::engine::{
    self, NodeInput, NodeSet, NodeState, Operation, OperationQueue, TaskDependencyContext,
    TransformationDependency, TransformationNodeRegistry,
};
use crate::set::ResolvedArtifactSet;
use crate::transform::{DependenciesContext, DependenciesResolverFactory, Transformation};
use crate::visit::{AsyncArtifactListener, Completion, VisitType};
use crate::{AttributeSet, ComponentId, ResolvableArtifact};

/// The artifacts of a component's variant after applying a transformation.
///
/// Construction registers the request with the node registry and keeps the
/// resulting nodes. Visiting the set with contents executes them, visiting
/// without contents never does.
pub struct TransformedArtifactSet {
    owner: ComponentId,
    target_attributes: AttributeSet,
    nodes: NodeSet,
    identity: SetId,
}

impl TransformedArtifactSet {
    pub fn new(
        owner: ComponentId,
        delegate: &dyn ResolvedArtifactSet,
        target_attributes: AttributeSet,
        transformation: &Transformation,
        dependencies: &dyn DependenciesResolverFactory,
        registry: &TransformationNodeRegistry,
    ) -> Self {
        let context = if transformation.requires_dependencies() {
            dependencies.create(&owner)
        } else {
            DependenciesContext::none()
        };

        let identity = engine::identity_of(delegate.identity(), transformation, &context);
        let nodes = registry.get_or_create(delegate, transformation, context);

        tracing::debug!(
            "{} -> {} with {} ({} node(s))",
            owner,
            target_attributes,
            transformation,
            nodes.len()
        );

        Self {
            owner,
            target_attributes,
            nodes,
            identity,
        }
    }

    pub fn owner_id(&self) -> &ComponentId {
        &self.owner
    }

    pub fn target_attributes(&self) -> &AttributeSet {
        &self.target_attributes
    }

    pub fn scheduled_nodes(&self) -> &NodeSet {
        &self.nodes
    }
}

impl ResolvedArtifactSet for TransformedArtifactSet {
    fn identity(&self) -> SetId {
        self.identity
    }

    fn start_visit<'a>(
        &'a self,
        queue: &dyn OperationQueue,
        listener: &mut dyn AsyncArtifactListener,
    ) -> Completion<'a> {
        if listener.prepare_for_visit(self) == VisitType::NoContents {
            return Completion::empty(self);
        }

        for node in self.nodes.iter() {
            if node.state() == NodeState::Scheduled {
                let node = Arc::clone(node);
                queue.add(Operation::new(node.to_string(), move || {
                    node.execute_if_not_already()
                }));
            }
        }

        Completion::new(move |visitor| {
            let mut artifacts: Vec<ResolvableArtifact> = Vec::with_capacity(self.nodes.len());

            for node in self.nodes.iter() {
                // Whatever the queue did, the node has finished after this.
                node.execute_if_not_already();

                match node.transformed_subject() {
                    Ok(subject) => artifacts.extend(
                        subject
                            .files()
                            .iter()
                            .map(|file| subject.initial().transformed_to(file)),
                    ),
                    Err(failure) => {
                        visitor.visit_failure(failure);
                        visitor.end_visit_collection(self);
                        return;
                    }
                }
            }

            for artifact in &artifacts {
                visitor.visit_artifact(&self.owner, &self.target_attributes, artifact);
            }
            visitor.end_visit_collection(self);
        })
    }

    fn visit_dependencies(&self, context: &mut dyn TaskDependencyContext) {
        if !self.nodes.is_empty() {
            context.add(TransformationDependency::new(Arc::clone(&self.nodes)));
        }
    }

    fn node_inputs(&self) -> Vec<NodeInput> {
        self.nodes
            .iter()
            .cloned()
            .map(NodeInput::Chained)
            .collect()
    }
}
