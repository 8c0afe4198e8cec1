//! Scheduling and execution of transformation nodes.

mod graph;
mod node;
mod queue;
mod registry;

pub use crate::engine::graph::{ExecutionGraph, TaskDependencyContext, TransformationDependency};
pub use crate::engine::node::{NodeId, NodeInput, NodeState, TransformationNode, TransformedSubject};
pub use crate::engine::queue::{InlineQueue, Operation, OperationQueue, ParallelQueue};
pub use crate::engine::registry::{NodeSet, TransformationNodeRegistry};

pub(crate) use crate::engine::registry::identity_of;
