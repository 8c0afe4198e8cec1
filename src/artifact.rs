use std::fmt::{Debug, Display};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::core::ArcStr;

/// Identifies the component owning an artifact, e.g. `project :lib`.
///
/// This is also the display name under which artifacts are rendered to
/// visitors.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(ArcStr);

impl ComponentId {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Identity of a resolvable artifact.
///
/// A transformed artifact is identified by the artifact it was originally
/// derived from together with the file the transform produced. Two
/// transforms emitting a `classes` directory, for different jars or into
/// different locations for the same jar, therefore never collide even though
/// the file names are the same.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    /// An artifact as produced by its component, before any transformation.
    Original { component: ComponentId, name: ArcStr },
    /// A file produced by transforming the `original` artifact.
    Transformed {
        original: Arc<ArtifactId>,
        file: Utf8PathBuf,
    },
}

impl ArtifactId {
    pub fn original(component: ComponentId, name: impl Into<ArcStr>) -> Self {
        ArtifactId::Original {
            component,
            name: name.into(),
        }
    }

    /// The component which owns this artifact.
    pub fn component(&self) -> &ComponentId {
        match self {
            ArtifactId::Original { component, .. } => component,
            ArtifactId::Transformed { original, .. } => original.component(),
        }
    }

    /// The identity of the untransformed artifact this one derives from.
    pub fn source(&self) -> &ArtifactId {
        match self {
            ArtifactId::Original { .. } => self,
            ArtifactId::Transformed { original, .. } => original.source(),
        }
    }

    /// The file name part of the identity.
    pub fn name(&self) -> &str {
        match self {
            ArtifactId::Original { name, .. } => name,
            ArtifactId::Transformed { file, .. } => file_name(file),
        }
    }
}

impl Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactId::Original { component, name } => write!(f, "{name} ({component})"),
            ArtifactId::Transformed { original, file } => {
                write!(f, "{} ({original})", file_name(file))
            }
        }
    }
}

impl Debug for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactId::Original { .. } => write!(f, "ArtifactId({self})"),
            ArtifactId::Transformed { original, file } => {
                write!(f, "ArtifactId({file} ({original}))")
            }
        }
    }
}

/// An artifact whose file location is known.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ResolvableArtifact {
    id: ArtifactId,
    file: Utf8PathBuf,
}

impl ResolvableArtifact {
    /// Creates an original artifact of `component`, named after the file.
    pub fn new(component: ComponentId, file: impl Into<Utf8PathBuf>) -> Self {
        let file = file.into();

        Self {
            id: ArtifactId::original(component, file_name(&file)),
            file,
        }
    }

    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    pub fn file(&self) -> &Utf8Path {
        &self.file
    }

    pub fn component(&self) -> &ComponentId {
        self.id.component()
    }

    /// Creates the artifact representing `file` as an output of transforming
    /// this artifact.
    ///
    /// The identity always refers back to the untransformed source artifact,
    /// so outputs of chained transforms stay attributable to what the
    /// component originally produced.
    pub fn transformed_to(&self, file: &Utf8Path) -> ResolvableArtifact {
        ResolvableArtifact {
            id: ArtifactId::Transformed {
                original: Arc::new(self.id.source().clone()),
                file: file.to_path_buf(),
            },
            file: file.to_path_buf(),
        }
    }
}

impl Display for ResolvableArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.id, f)
    }
}

fn file_name(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or(path.as_str())
}
