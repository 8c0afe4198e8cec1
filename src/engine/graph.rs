//! Build-time dependency bookkeeping for transformation nodes.
//!
//! Before anything runs, consumers walk artifact sets with
//! [`visit_dependencies`](crate::ResolvedArtifactSet::visit_dependencies) to
//! find out which nodes have to be executed. The [`ExecutionGraph`] turns
//! those nodes into a DAG where chained steps point at the steps they consume.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::engine::node::{NodeId, TransformationNode};
use crate::engine::registry::NodeSet;
use crate::error::ResolveError;

/// A build dependency on every node of a transformed artifact set.
#[derive(Debug, Clone)]
pub struct TransformationDependency {
    nodes: NodeSet,
}

impl TransformationDependency {
    pub fn new(nodes: NodeSet) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Arc<TransformationNode>] {
        &self.nodes
    }
}

/// Collects the build dependencies reported by artifact sets.
pub trait TaskDependencyContext {
    fn add(&mut self, dependency: TransformationDependency);
}

impl TaskDependencyContext for Vec<TransformationDependency> {
    fn add(&mut self, dependency: TransformationDependency) {
        self.push(dependency);
    }
}

/// Directed graph of transformation nodes, edges go from a node to the nodes
/// consuming its outputs.
#[derive(Default)]
pub struct ExecutionGraph {
    graph: DiGraph<Arc<TransformationNode>, ()>,
    indices: HashMap<NodeId, NodeIndex>,
}

impl ExecutionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node along with everything it transitively depends on.
    ///
    /// Inserting a node twice is a no-op.
    pub fn insert(&mut self, node: &Arc<TransformationNode>) -> NodeIndex {
        if let Some(index) = self.indices.get(&node.id()) {
            return *index;
        }

        let index = self.graph.add_node(Arc::clone(node));
        self.indices.insert(node.id(), index);

        for dependency in node.dependencies() {
            let from = self.insert(&dependency);
            self.graph.add_edge(from, index, ());
        }

        index
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, node: &TransformationNode) -> bool {
        self.indices.contains_key(&node.id())
    }

    /// The nodes which must run before `node`.
    pub fn dependencies_of(&self, node: &TransformationNode) -> Vec<Arc<TransformationNode>> {
        let Some(index) = self.indices.get(&node.id()) else {
            return vec![];
        };

        self.graph
            .neighbors_directed(*index, Direction::Incoming)
            .map(|i| Arc::clone(&self.graph[i]))
            .collect()
    }

    /// Every node in an order where each one comes after its dependencies.
    pub fn execution_order(&self) -> Result<Vec<Arc<TransformationNode>>, ResolveError> {
        let order = petgraph::algo::toposort(&self.graph, None)
            .map_err(|cycle| ResolveError::Cycle(self.graph[cycle.node_id()].to_string()))?;

        Ok(order
            .into_iter()
            .map(|index| Arc::clone(&self.graph[index]))
            .collect())
    }
}

impl FromIterator<TransformationDependency> for ExecutionGraph {
    fn from_iter<I: IntoIterator<Item = TransformationDependency>>(iter: I) -> Self {
        let mut graph = ExecutionGraph::new();
        for dependency in iter {
            for node in dependency.nodes() {
                graph.insert(node);
            }
        }
        graph
    }
}

impl TaskDependencyContext for ExecutionGraph {
    fn add(&mut self, dependency: TransformationDependency) {
        for node in dependency.nodes() {
            self.insert(node);
        }
    }
}
