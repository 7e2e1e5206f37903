//! Classloader-model descriptor loading.
//!
//! An artifact ships a `classloader-model.json` describing its dependency
//! set and what it exports. Loading either produces a complete
//! [`ClassloaderModel`] or fails with a [`IsolationError::MalformedModel`]
//! naming the offending file and key — never a partial model.

use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::errors::IsolationError;

/// Dependency scope as declared in the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyScope {
    Provided,
    Compile,
    Runtime,
    Test,
    System,
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provided => write!(f, "PROVIDED"),
            Self::Compile => write!(f, "COMPILE"),
            Self::Runtime => write!(f, "RUNTIME"),
            Self::Test => write!(f, "TEST"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

impl FromStr for DependencyScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PROVIDED" => Ok(Self::Provided),
            "COMPILE" => Ok(Self::Compile),
            "RUNTIME" => Ok(Self::Runtime),
            "TEST" => Ok(Self::Test),
            "SYSTEM" => Ok(Self::System),
            _ => Err(format!("Invalid dependency scope: {s}")),
        }
    }
}

/// One declared artifact dependency; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactDependency {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    artifact_type: String,
    classifier: Option<String>,
    scope: Option<DependencyScope>,
}

impl ArtifactDependency {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
        artifact_type: impl Into<String>,
        classifier: Option<String>,
        scope: Option<DependencyScope>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
            artifact_type: artifact_type.into(),
            classifier,
            scope,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn scope(&self) -> Option<DependencyScope> {
        self.scope
    }
}

impl fmt::Display for ArtifactDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDependency {
    #[serde(default)]
    group_id: String,
    #[serde(default)]
    artifact_id: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(rename = "type", default = "default_artifact_type")]
    artifact_type: String,
    #[serde(default)]
    classifier: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn default_artifact_type() -> String {
    "jar".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassloaderModel {
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    #[serde(default)]
    exported_packages: Vec<String>,
    #[serde(default)]
    exported_resources: Vec<String>,
}

/// Classpath model of one artifact, derived from its packaged descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassloaderModel {
    runtime_classes: Option<PathBuf>,
    exported_packages: HashSet<String>,
    exported_resources: HashSet<String>,
    dependencies: HashSet<ArtifactDependency>,
}

impl ClassloaderModel {
    /// Fixed-path descriptor inside an artifact directory.
    pub const DESCRIPTOR_FILE: &'static str = "classloader-model.json";

    /// An empty model exporting nothing and declaring no dependencies.
    pub fn empty() -> Self {
        Self {
            runtime_classes: None,
            exported_packages: HashSet::new(),
            exported_resources: HashSet::new(),
            dependencies: HashSet::new(),
        }
    }

    pub fn with_exports(
        exported_packages: impl IntoIterator<Item = String>,
        exported_resources: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            runtime_classes: None,
            exported_packages: exported_packages.into_iter().collect(),
            exported_resources: exported_resources.into_iter().collect(),
            dependencies: HashSet::new(),
        }
    }

    /// Load the model from an artifact directory.
    ///
    /// Fails fast on malformed input: unreadable descriptor, invalid JSON,
    /// blank coordinates, or an unparsable scope value all reject the whole
    /// document.
    pub fn load(artifact_dir: &Path) -> Result<Self, IsolationError> {
        let descriptor = artifact_dir.join(Self::DESCRIPTOR_FILE);
        let descriptor_display = descriptor.display().to_string();

        let text = fs::read_to_string(&descriptor).map_err(|err| {
            IsolationError::malformed_model(
                &descriptor_display,
                format!("cannot read descriptor: {err}"),
            )
        })?;

        let raw: RawClassloaderModel = serde_json::from_str(&text)
            .map_err(|err| IsolationError::malformed_model(&descriptor_display, err.to_string()))?;

        let mut dependencies = HashSet::new();
        for dependency in raw.dependencies {
            if dependency.group_id.trim().is_empty() {
                return Err(IsolationError::malformed_model(
                    &descriptor_display,
                    format!(
                        "dependency '{}' is missing key 'groupId'",
                        dependency.artifact_id
                    ),
                ));
            }
            if dependency.artifact_id.trim().is_empty() {
                return Err(IsolationError::malformed_model(
                    &descriptor_display,
                    format!(
                        "dependency of group '{}' is missing key 'artifactId'",
                        dependency.group_id
                    ),
                ));
            }
            let scope = match dependency.scope {
                Some(raw_scope) => Some(raw_scope.parse::<DependencyScope>().map_err(|reason| {
                    IsolationError::malformed_model(
                        &descriptor_display,
                        format!(
                            "dependency '{}': bad key 'scope': {reason}",
                            dependency.artifact_id
                        ),
                    )
                })?),
                None => None,
            };
            dependencies.insert(ArtifactDependency::new(
                dependency.group_id,
                dependency.artifact_id,
                dependency.version,
                dependency.artifact_type,
                dependency.classifier,
                scope,
            ));
        }

        let classes_dir = artifact_dir.join("classes");
        let runtime_classes = classes_dir.is_dir().then_some(classes_dir);

        Ok(Self {
            runtime_classes,
            exported_packages: raw.exported_packages.into_iter().collect(),
            exported_resources: raw.exported_resources.into_iter().collect(),
            dependencies,
        })
    }

    pub fn runtime_classes(&self) -> Option<&Path> {
        self.runtime_classes.as_deref()
    }

    pub fn exported_packages(&self) -> &HashSet<String> {
        &self.exported_packages
    }

    pub fn exported_resources(&self) -> &HashSet<String> {
        &self.exported_resources
    }

    pub fn dependencies(&self) -> &HashSet<ArtifactDependency> {
        &self.dependencies
    }
}
