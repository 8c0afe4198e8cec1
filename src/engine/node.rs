use std::fmt::{Debug, Display};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::Level;

use crate::error::{Cause, TransformError};
use crate::transform::{DependenciesContext, Transformation};
use crate::{ComponentId, ResolvableArtifact};

/// Unique identity of a [`TransformationNode`] within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a node takes its input from.
#[derive(Clone)]
pub enum NodeInput {
    /// An untransformed upstream artifact.
    Initial(ResolvableArtifact),
    /// Every output of another node, for chained transformations.
    Chained(Arc<TransformationNode>),
}

impl NodeInput {
    fn source(&self) -> &ResolvableArtifact {
        match self {
            NodeInput::Initial(artifact) => artifact,
            NodeInput::Chained(previous) => previous.input_artifact(),
        }
    }
}

/// Execution state of a [`TransformationNode`].
///
/// `Scheduled -> Executing -> Completed | Failed`, terminal states are never
/// left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Scheduled,
    Executing,
    Completed,
    Failed,
}

/// Result of a successful node execution: the source artifact the chain
/// started from, and the files produced for it in order.
#[derive(Debug, Clone)]
pub struct TransformedSubject {
    initial: ResolvableArtifact,
    files: Arc<[Utf8PathBuf]>,
}

impl TransformedSubject {
    pub fn initial(&self) -> &ResolvableArtifact {
        &self.initial
    }

    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }
}

type NodeResult = Result<TransformedSubject, TransformError>;

/// One memoized application of a transformation step to one input.
///
/// Nodes are created and shared by the
/// [`TransformationNodeRegistry`](crate::TransformationNodeRegistry). However
/// many artifact sets reference a node, and however many threads race to
/// execute it, the transformation runs at most once. The outcome, success or
/// failure, is kept for the remainder of the build.
pub struct TransformationNode {
    id: NodeId,
    owner: ComponentId,
    input: NodeInput,
    step: Transformation,
    dependencies: DependenciesContext,
    started: AtomicBool,
    result: OnceLock<NodeResult>,
}

impl TransformationNode {
    pub(crate) fn new(
        input: NodeInput,
        step: Transformation,
        dependencies: DependenciesContext,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::next(),
            owner: input.source().component().clone(),
            input,
            step,
            dependencies,
            started: AtomicBool::new(false),
            result: OnceLock::new(),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn owner(&self) -> &ComponentId {
        &self.owner
    }

    pub fn transformation(&self) -> &Transformation {
        &self.step
    }

    pub fn dependencies_context(&self) -> &DependenciesContext {
        &self.dependencies
    }

    /// The untransformed artifact this node's outputs are attributed to.
    ///
    /// Use [`ResolvableArtifact::transformed_to`] on it to turn an output file
    /// into a resolvable artifact.
    pub fn input_artifact(&self) -> &ResolvableArtifact {
        self.input.source()
    }

    /// Nodes which have to run before this one.
    pub fn dependencies(&self) -> Vec<Arc<TransformationNode>> {
        match &self.input {
            NodeInput::Initial(_) => vec![],
            NodeInput::Chained(previous) => vec![Arc::clone(previous)],
        }
    }

    pub fn state(&self) -> NodeState {
        match self.result.get() {
            Some(Ok(_)) => NodeState::Completed,
            Some(Err(_)) => NodeState::Failed,
            None if self.started.load(Ordering::Acquire) => NodeState::Executing,
            None => NodeState::Scheduled,
        }
    }

    /// Runs the transformation unless that already happened.
    ///
    /// If another thread is executing this node right now, blocks until it
    /// finishes and reuses its result.
    pub fn execute_if_not_already(&self) {
        self.result.get_or_init(|| {
            self.started.store(true, Ordering::Release);
            self.execute()
        });
    }

    /// Returns the captured outcome of the execution.
    ///
    /// A failure is returned as the very same error on every call.
    pub fn transformed_subject(&self) -> Result<TransformedSubject, TransformError> {
        match self.result.get() {
            Some(result) => result.clone(),
            None => Err(TransformError::NotExecuted(self.to_string())),
        }
    }

    fn execute(&self) -> NodeResult {
        let span = tracing::span!(Level::INFO, "transform", node = %self);
        let _enter = span.enter();
        let start = Instant::now();

        let result = match &self.input {
            NodeInput::Initial(artifact) => {
                self.apply(artifact.file()).map(|files| TransformedSubject {
                    initial: artifact.clone(),
                    files: files.into(),
                })
            }
            NodeInput::Chained(previous) => {
                previous.execute_if_not_already();
                previous.transformed_subject().and_then(|subject| {
                    let mut files = Vec::new();
                    for file in subject.files() {
                        files.extend(self.apply(file)?);
                    }

                    Ok(TransformedSubject {
                        initial: subject.initial,
                        files: files.into(),
                    })
                })
            }
        };

        match &result {
            Ok(subject) => tracing::debug!(
                "produced {} file(s) in {:.2?}",
                subject.files.len(),
                start.elapsed()
            ),
            Err(err) => tracing::error!("{err}"),
        }

        result
    }

    fn apply(&self, file: &Utf8Path) -> Result<Vec<Utf8PathBuf>, TransformError> {
        // A panicking action must not take the whole resolution down with it,
        // the node just ends up failed like with any other error.
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.step.apply(file, &self.dependencies)
        }));

        let artifact = self.input_artifact().id().name().into();
        let transformation = self.step.name().into();

        match outcome {
            Ok(Ok(files)) => Ok(files),
            Ok(Err(err)) => Err(TransformError::Failed {
                component: self.owner.clone(),
                transformation,
                artifact,
                cause: Cause::from(err),
            }),
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    String::from("unknown payload")
                };

                Err(TransformError::Panicked {
                    component: self.owner.clone(),
                    transformation,
                    artifact,
                    message,
                })
            }
        }
    }
}

impl Display for TransformationNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Transform {} ({}) with {}",
            self.input_artifact().id().name(),
            self.owner,
            self.step
        )
    }
}

impl Debug for TransformationNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationNode")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("transformation", &self.step)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn artifact(name: &str) -> ResolvableArtifact {
        ResolvableArtifact::new(ComponentId::new("project :lib"), format!("libs/{name}"))
    }

    fn counting(name: &str, count: Arc<AtomicUsize>) -> Transformation {
        Transformation::new(name, move |input, _| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(vec![input.with_extension("classes")])
        })
    }

    #[test]
    fn test_state_machine() {
        let count = Arc::new(AtomicUsize::new(0));
        let node = TransformationNode::new(
            NodeInput::Initial(artifact("foo.jar")),
            counting("Unzip", count.clone()),
            DependenciesContext::none(),
        );

        assert_eq!(node.state(), NodeState::Scheduled);
        assert!(matches!(
            node.transformed_subject(),
            Err(TransformError::NotExecuted(_))
        ));

        node.execute_if_not_already();
        assert_eq!(node.state(), NodeState::Completed);

        let subject = node.transformed_subject().unwrap();
        assert_eq!(subject.initial(), &artifact("foo.jar"));
        assert_eq!(subject.files(), &[Utf8PathBuf::from("libs/foo.classes")]);
    }

    #[test]
    fn test_execute_at_most_once_sequential() {
        let count = Arc::new(AtomicUsize::new(0));
        let node = TransformationNode::new(
            NodeInput::Initial(artifact("foo.jar")),
            counting("Unzip", count.clone()),
            DependenciesContext::none(),
        );

        for _ in 0..5 {
            node.execute_if_not_already();
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_execute_at_most_once_concurrent() {
        let count = Arc::new(AtomicUsize::new(0));
        let slow = {
            let count = count.clone();
            Transformation::new("Slow", move |input, _| {
                count.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(vec![input.join("out")])
            })
        };

        let node = TransformationNode::new(
            NodeInput::Initial(artifact("foo.jar")),
            slow,
            DependenciesContext::none(),
        );

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    node.execute_if_not_already();
                    // Every caller observes the complete result.
                    let subject = node.transformed_subject().unwrap();
                    assert_eq!(subject.files().len(), 1);
                });
            }
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(node.state(), NodeState::Completed);
    }

    #[test]
    fn test_failure_is_sticky() {
        let count = Arc::new(AtomicUsize::new(0));
        let failing = {
            let count = count.clone();
            Transformation::new("Broken", move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("corrupt zip")
            })
        };

        let node = TransformationNode::new(
            NodeInput::Initial(artifact("foo.jar")),
            failing,
            DependenciesContext::none(),
        );

        node.execute_if_not_already();
        let first = node.transformed_subject().unwrap_err();

        node.execute_if_not_already();
        let second = node.transformed_subject().unwrap_err();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(node.state(), NodeState::Failed);

        match (&first, &second) {
            (
                TransformError::Failed { cause: a, .. },
                TransformError::Failed { cause: b, .. },
            ) => assert!(a.ptr_eq(b)),
            _ => panic!("expected captured failures, got {first:?}"),
        }

        let message = first.to_string();
        assert!(message.contains("foo.jar"));
        assert!(message.contains("project :lib"));
        assert!(message.contains("Broken"));
        assert!(message.contains("corrupt zip"));
    }

    #[test]
    fn test_panic_is_captured() {
        let node = TransformationNode::new(
            NodeInput::Initial(artifact("foo.jar")),
            Transformation::new("Panicky", |_, _| panic!("boom")),
            DependenciesContext::none(),
        );

        node.execute_if_not_already();

        match node.transformed_subject() {
            Err(TransformError::Panicked { message, .. }) => assert_eq!(message, "boom"),
            other => panic!("expected a captured panic, got {other:?}"),
        }
    }

    #[test]
    fn test_chained_node() {
        let unzip_count = Arc::new(AtomicUsize::new(0));
        let first = TransformationNode::new(
            NodeInput::Initial(artifact("foo.jar")),
            counting("Unzip", unzip_count.clone()),
            DependenciesContext::none(),
        );

        let split = Transformation::new("Split", |input, _| {
            Ok(vec![input.join("a.class"), input.join("b.class")])
        });
        let second = TransformationNode::new(
            NodeInput::Chained(first.clone()),
            split,
            DependenciesContext::none(),
        );

        assert_eq!(second.dependencies().len(), 1);
        assert_eq!(second.input_artifact(), first.input_artifact());
        assert_eq!(second.owner(), first.owner());

        second.execute_if_not_already();
        first.execute_if_not_already();

        assert_eq!(unzip_count.load(Ordering::SeqCst), 1);
        assert_eq!(first.state(), NodeState::Completed);

        let subject = second.transformed_subject().unwrap();
        assert_eq!(subject.initial(), &artifact("foo.jar"));
        assert_eq!(
            subject.files(),
            &[
                Utf8PathBuf::from("libs/foo.classes/a.class"),
                Utf8PathBuf::from("libs/foo.classes/b.class"),
            ]
        );
    }

    #[test]
    fn test_chained_node_inherits_failure() {
        let first = TransformationNode::new(
            NodeInput::Initial(artifact("foo.jar")),
            Transformation::new("Broken", |_, _| anyhow::bail!("nope")),
            DependenciesContext::none(),
        );
        let second = TransformationNode::new(
            NodeInput::Chained(first.clone()),
            Transformation::new("Never", |_, _| unreachable!()),
            DependenciesContext::none(),
        );

        second.execute_if_not_already();

        let err = second.transformed_subject().unwrap_err();
        assert!(err.to_string().contains("Broken"));
        assert_eq!(second.state(), NodeState::Failed);
    }

    #[test]
    fn test_display() {
        let node = TransformationNode::new(
            NodeInput::Initial(artifact("foo.jar")),
            Transformation::new("Unzip", |input, _| Ok(vec![input.to_path_buf()])),
            DependenciesContext::none(),
        );

        assert_eq!(node.to_string(), "Transform foo.jar (project :lib) with Unzip");
    }
}
