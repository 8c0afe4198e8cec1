use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::SetId;
use crate::engine::node::{NodeInput, TransformationNode};
use crate::set::ResolvedArtifactSet;
use crate::transform::{DependenciesContext, Transformation, TransformationId};

/// An ordered, shared collection of transformation nodes.
pub type NodeSet = Arc<[Arc<TransformationNode>]>;

/// What makes two transformation requests the same request.
///
/// Both the upstream set and the transformation are part of the key, so the
/// same transform of two different sets, or two transforms of the same set,
/// never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    delegate: SetId,
    transformation: TransformationId,
    dependencies: DependenciesContext,
}

impl NodeKey {
    fn new(delegate: SetId, step: &Transformation, dependencies: &DependenciesContext) -> Self {
        // Steps which don't look at the extra dependencies shouldn't be split
        // by them.
        let dependencies = if step.requires_dependencies() {
            dependencies.clone()
        } else {
            DependenciesContext::none()
        };

        Self {
            delegate,
            transformation: step.id(),
            dependencies,
        }
    }

    /// Identity of the set made of the nodes stored under this key.
    fn identity(&self) -> SetId {
        SetId::of(self)
    }
}

/// Deduplication table for transformation nodes.
///
/// Every structurally identical request made during a build, no matter which
/// consumer makes it, receives the very same node collection, so each
/// transformation of each artifact is executed once and cached for everyone.
///
/// Chained transformations are registered one step at a time. A request for
/// `unzip -> instrument` therefore shares its `unzip` nodes with a plain
/// `unzip` request on the same upstream.
#[derive(Default)]
pub struct TransformationNodeRegistry {
    nodes: Mutex<HashMap<NodeKey, NodeSet>>,
}

impl TransformationNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the nodes applying `transformation` to everything `delegate`
    /// produces, creating them if this request hasn't been seen yet.
    ///
    /// No I/O happens here and nothing is executed. Safe to call from many
    /// threads at once: the first caller creates the nodes and every other
    /// caller observes the same instance.
    pub fn get_or_create(
        &self,
        delegate: &dyn ResolvedArtifactSet,
        transformation: &Transformation,
        dependencies: DependenciesContext,
    ) -> NodeSet {
        let mut upstream = delegate.identity();
        let mut previous: Option<NodeSet> = None;

        for step in transformation.steps() {
            let key = NodeKey::new(upstream, &step, &dependencies);
            upstream = key.identity();

            let nodes = self.find_or_insert(key, |key| {
                let inputs: Vec<NodeInput> = match &previous {
                    None => delegate.node_inputs(),
                    Some(nodes) => nodes.iter().cloned().map(NodeInput::Chained).collect(),
                };

                inputs
                    .into_iter()
                    .map(|input| {
                        TransformationNode::new(input, step.clone(), key.dependencies.clone())
                    })
                    .collect()
            });

            previous = Some(nodes);
        }

        previous.unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Number of distinct requests registered so far.
    pub fn len(&self) -> usize {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find_or_insert<F>(&self, key: NodeKey, create: F) -> NodeSet
    where
        F: FnOnce(&NodeKey) -> Vec<Arc<TransformationNode>>,
    {
        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);

        match nodes.entry(key) {
            Entry::Occupied(entry) => {
                tracing::debug!(
                    "reusing {} node(s) for {:?}",
                    entry.get().len(),
                    entry.key().transformation
                );
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => {
                let created: NodeSet = create(entry.key()).into();
                tracing::debug!(
                    "scheduled {} node(s) for {:?}",
                    created.len(),
                    entry.key().transformation
                );
                Arc::clone(entry.insert(created))
            }
        }
    }
}

/// Identity of the set of nodes `get_or_create` hands out for this request.
pub(crate) fn identity_of(
    delegate: SetId,
    transformation: &Transformation,
    dependencies: &DependenciesContext,
) -> SetId {
    transformation
        .steps()
        .iter()
        .fold(delegate, |upstream, step| {
            NodeKey::new(upstream, step, dependencies).identity()
        })
}
