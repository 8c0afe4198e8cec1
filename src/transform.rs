//! Transformation descriptors and the extra inputs they depend on.

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};

use crate::core::ArcStr;
use crate::{ComponentId, ResolvableArtifact};

/// The function behind a [`Transformation`].
///
/// Given one input file and the pre-resolved extra dependencies, produces the
/// ordered list of output files. It is treated as an opaque callable, any
/// closure with the matching signature implements it.
pub trait TransformAction: Send + Sync {
    fn transform(
        &self,
        input: &Utf8Path,
        dependencies: &DependenciesContext,
    ) -> anyhow::Result<Vec<Utf8PathBuf>>;
}

impl<F> TransformAction for F
where
    F: Fn(&Utf8Path, &DependenciesContext) -> anyhow::Result<Vec<Utf8PathBuf>> + Send + Sync,
{
    fn transform(
        &self,
        input: &Utf8Path,
        dependencies: &DependenciesContext,
    ) -> anyhow::Result<Vec<Utf8PathBuf>> {
        self(input, dependencies)
    }
}

/// How many files a transformation declares to produce per input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Zero or more outputs.
    #[default]
    Any,
    /// Exactly this many outputs, anything else is a failure.
    Exactly(usize),
}

/// Unique identity of a constructed [`Transformation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformationId(u64);

impl TransformationId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
enum Kind {
    Step {
        action: Arc<dyn TransformAction>,
        arity: Arity,
        requires_dependencies: bool,
    },
    Chain(Arc<[Transformation]>),
}

/// An immutable, configured transformation.
///
/// Equality is by identity: each call to [`Transformation::new`] (or any of
/// the builder methods) yields a transformation distinct from every other,
/// while clones compare equal to their original. Every distinct configured
/// transformation is expected to be constructed once per build.
#[derive(Clone)]
pub struct Transformation {
    id: TransformationId,
    name: ArcStr,
    kind: Kind,
}

impl Transformation {
    /// Creates a single-step transformation from a closure.
    pub fn new<F>(name: impl Into<ArcStr>, action: F) -> Self
    where
        F: Fn(&Utf8Path, &DependenciesContext) -> anyhow::Result<Vec<Utf8PathBuf>>
            + Send
            + Sync
            + 'static,
    {
        Self::from_action(name, action)
    }

    /// Creates a single-step transformation from any [`TransformAction`].
    pub fn from_action<A>(name: impl Into<ArcStr>, action: A) -> Self
    where
        A: TransformAction + 'static,
    {
        Self {
            id: TransformationId::next(),
            name: name.into(),
            kind: Kind::Step {
                action: Arc::new(action),
                arity: Arity::Any,
                requires_dependencies: false,
            },
        }
    }

    /// Declares how many outputs every application must produce.
    ///
    /// Has no effect on chains, whose steps carry their own arity, and a
    /// chain keeps its identity.
    pub fn with_arity(mut self, value: Arity) -> Self {
        if let Kind::Step { arity, .. } = &mut self.kind {
            *arity = value;
            self.id = TransformationId::next();
        }
        self
    }

    /// Marks this transformation as needing the extra dependencies of the
    /// component it is applied in.
    ///
    /// Has no effect on chains, mark the steps which need them instead.
    pub fn requiring_dependencies(mut self) -> Self {
        if let Kind::Step {
            requires_dependencies,
            ..
        } = &mut self.kind
        {
            *requires_dependencies = true;
            self.id = TransformationId::next();
        }
        self
    }

    /// Creates a chain that applies `self` first and `next` to each of its
    /// outputs.
    pub fn then(&self, next: &Transformation) -> Transformation {
        let steps: Vec<_> = self.steps().into_iter().chain(next.steps()).collect();
        let name = steps
            .iter()
            .map(|step| step.name.as_ref())
            .collect::<Vec<_>>()
            .join(" -> ");

        Transformation {
            id: TransformationId::next(),
            name: name.into(),
            kind: Kind::Chain(steps.into()),
        }
    }

    pub fn id(&self) -> TransformationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The single-step transformations this one consists of, in order.
    pub fn steps(&self) -> Vec<Transformation> {
        match &self.kind {
            Kind::Step { .. } => vec![self.clone()],
            Kind::Chain(steps) => steps.to_vec(),
        }
    }

    pub fn is_chain(&self) -> bool {
        matches!(self.kind, Kind::Chain(_))
    }

    pub fn requires_dependencies(&self) -> bool {
        match &self.kind {
            Kind::Step {
                requires_dependencies,
                ..
            } => *requires_dependencies,
            Kind::Chain(steps) => steps.iter().any(Transformation::requires_dependencies),
        }
    }

    /// Runs a single step on one input file.
    ///
    /// Chains are never applied as a whole, the registry splits them into one
    /// node per step and each node feeds the outputs of the previous one.
    pub(crate) fn apply(
        &self,
        input: &Utf8Path,
        dependencies: &DependenciesContext,
    ) -> anyhow::Result<Vec<Utf8PathBuf>> {
        match &self.kind {
            Kind::Step { action, arity, .. } => {
                let files = action.transform(input, dependencies)?;

                if let Arity::Exactly(expected) = *arity
                    && files.len() != expected
                {
                    anyhow::bail!(
                        "{} declared {} output(s) but produced {}",
                        self.name,
                        expected,
                        files.len()
                    );
                }

                Ok(files)
            }
            Kind::Chain(_) => {
                anyhow::bail!("{} is a chain and has to be applied step by step", self.name)
            }
        }
    }
}

impl PartialEq for Transformation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transformation {}

impl std::hash::Hash for Transformation {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for Transformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Debug for Transformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transformation({}#{})", self.name, self.id.0)
    }
}

/// Pre-resolved extra inputs of a transformation in one component.
///
/// These are dependencies of the transform itself, not of the artifact being
/// transformed. Equality is structural since the context is part of the
/// registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DependenciesContext {
    component: Option<ComponentId>,
    artifacts: Arc<[ResolvableArtifact]>,
}

impl DependenciesContext {
    /// Context of a transformation that does not need extra dependencies.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(
        component: ComponentId,
        artifacts: impl IntoIterator<Item = ResolvableArtifact>,
    ) -> Self {
        Self {
            component: Some(component),
            artifacts: artifacts.into_iter().collect(),
        }
    }

    pub fn component(&self) -> Option<&ComponentId> {
        self.component.as_ref()
    }

    pub fn artifacts(&self) -> &[ResolvableArtifact] {
        &self.artifacts
    }

    pub fn files(&self) -> impl Iterator<Item = &Utf8Path> {
        self.artifacts.iter().map(ResolvableArtifact::file)
    }
}

/// Resolves the extra dependencies of transformations applied in a component.
pub trait DependenciesResolverFactory: Send + Sync {
    fn create(&self, component: &ComponentId) -> DependenciesContext;
}

/// Every component resolves to an empty set of extra dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependenciesResolverFactory for NoDependencies {
    fn create(&self, component: &ComponentId) -> DependenciesContext {
        DependenciesContext::new(component.clone(), [])
    }
}

/// Extra dependencies known up front, per component.
#[derive(Debug, Clone, Default)]
pub struct StaticDependencies {
    map: HashMap<ComponentId, Vec<ResolvableArtifact>>,
}

impl StaticDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        component: ComponentId,
        artifacts: impl IntoIterator<Item = ResolvableArtifact>,
    ) -> Self {
        self.map.entry(component).or_default().extend(artifacts);
        self
    }
}

impl DependenciesResolverFactory for StaticDependencies {
    fn create(&self, component: &ComponentId) -> DependenciesContext {
        let artifacts = self.map.get(component).cloned().unwrap_or_default();
        DependenciesContext::new(component.clone(), artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unzip() -> Transformation {
        Transformation::new("Unzip", |input, _| Ok(vec![input.with_extension("")]))
    }

    #[test]
    fn test_identity_equality() {
        let a = unzip();
        let b = unzip();

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a, a.clone().requiring_dependencies());
    }

    #[test]
    fn test_then_flattens_steps() {
        let unzip = unzip();
        let instrument =
            Transformation::new("Instrument", |input, _| Ok(vec![input.join("instrumented")]));
        let minify = Transformation::new("Minify", |input, _| Ok(vec![input.join("min")]));

        let chain = unzip.then(&instrument).then(&minify);

        assert!(chain.is_chain());
        assert_eq!(chain.name(), "Unzip -> Instrument -> Minify");
        assert_eq!(chain.steps(), vec![unzip, instrument, minify]);

        // Steps are applied by the nodes, never by the chain itself.
        let err = chain
            .apply(Utf8Path::new("libs/foo.jar"), &DependenciesContext::none())
            .unwrap_err();
        assert!(err.to_string().contains("step by step"));
    }

    #[test]
    fn test_chain_applied_through_nodes() {
        use crate::engine::TransformationNodeRegistry;
        use crate::set::SourceArtifactSet;
        use crate::AttributeSet;

        let lib = ComponentId::new("project :lib");
        let source = SourceArtifactSet::local(
            lib.clone(),
            AttributeSet::of([("usage", "jar")]),
            [ResolvableArtifact::new(lib, "libs/foo.jar")],
        );
        let split = Transformation::new("Split", |input, _| {
            Ok(vec![input.join("a.class"), input.join("b.class")])
        });
        let minify = Transformation::new("Minify", |input, _| Ok(vec![input.join("min")]));
        let chain = unzip().then(&split).then(&minify);

        let registry = TransformationNodeRegistry::new();
        let nodes = registry.get_or_create(&source, &chain, DependenciesContext::none());
        assert_eq!(nodes.len(), 1);

        nodes[0].execute_if_not_already();
        let subject = nodes[0].transformed_subject().unwrap();

        assert_eq!(subject.initial().id().name(), "foo.jar");
        assert_eq!(
            subject.files(),
            &[
                Utf8PathBuf::from("libs/foo/a.class/min"),
                Utf8PathBuf::from("libs/foo/b.class/min"),
            ]
        );
    }

    #[test]
    fn test_arity_is_enforced() {
        let split =
            Transformation::new("Split", |input, _| Ok(vec![input.join("a"), input.join("b")]));

        let any = split.clone().with_arity(Arity::Any);
        let one = split.with_arity(Arity::Exactly(1));

        assert_eq!(
            any.apply(Utf8Path::new("x"), &DependenciesContext::none())
                .unwrap()
                .len(),
            2
        );

        let err = one
            .apply(Utf8Path::new("x"), &DependenciesContext::none())
            .unwrap_err();
        assert!(err.to_string().contains("declared 1 output(s) but produced 2"));
    }

    #[test]
    fn test_chain_builders_keep_identity() {
        let chain = unzip().then(&unzip());

        assert_eq!(chain.clone().with_arity(Arity::Exactly(1)), chain);
        assert_eq!(chain.clone().requiring_dependencies(), chain);
        assert!(!chain.clone().requiring_dependencies().requires_dependencies());
    }

    #[test]
    fn test_requires_dependencies() {
        let plain = unzip();
        let needy = unzip().requiring_dependencies();

        assert!(!plain.requires_dependencies());
        assert!(needy.requires_dependencies());
        assert!(plain.then(&needy).requires_dependencies());
    }

    #[test]
    fn test_static_dependencies() {
        let app = ComponentId::new("project :app");
        let lib = ComponentId::new("project :lib");
        let asm = ResolvableArtifact::new(ComponentId::new("org.ow2:asm:9.7"), "asm.jar");

        let factory = StaticDependencies::new().with(app.clone(), [asm.clone()]);

        let ctx = factory.create(&app);
        assert_eq!(ctx.component(), Some(&app));
        assert_eq!(ctx.artifacts(), &[asm]);
        assert_eq!(ctx, factory.create(&app));

        let empty = factory.create(&lib);
        assert!(empty.artifacts().is_empty());
        assert_ne!(empty, ctx);
        assert_eq!(empty, NoDependencies.create(&lib));
    }
}
