#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod artifact;
mod attributes;
mod core;
pub mod engine;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
mod resolve;
pub mod set;
mod transform;
pub mod visit;

pub use crate::artifact::{ArtifactId, ComponentId, ResolvableArtifact};
pub use crate::attributes::AttributeSet;
pub use crate::core::SetId;
pub use crate::engine::{
    ExecutionGraph, InlineQueue, NodeState, Operation, OperationQueue, ParallelQueue,
    TaskDependencyContext, TransformationDependency, TransformationNode,
    TransformationNodeRegistry,
};
pub use crate::error::{Cause, ResolveError, TransformError};
pub use crate::resolve::{ArtifactCollector, ResolveOptions, ResolvedArtifact, resolve_artifacts};
pub use crate::set::{
    ClassifiedArtifacts, CompositeArtifactSet, EmptyArtifactSet, Origin, ResolvedArtifactSet,
    SourceArtifactSet, TransformedArtifactSet,
};
pub use crate::transform::{
    Arity, DependenciesContext, DependenciesResolverFactory, NoDependencies, StaticDependencies,
    TransformAction, Transformation, TransformationId,
};
pub use crate::visit::{ArtifactVisitor, AsyncArtifactListener, Completion, VisitType};
