//! Module discovery for container construction.
//!
//! The container node is assembled from "modules": named units exporting
//! packages and resources, described by a `flowgate-module.json` manifest.
//! Discovery runs only against an explicitly seeded set of root directories
//! so that it cannot be polluted by whatever else is on disk or on the test
//! classpath.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::errors::IsolationError;

/// A discovered module: name plus what it exports to the rest of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactModule {
    pub name: String,
    #[serde(default)]
    pub exported_packages: Vec<String>,
    #[serde(default)]
    pub exported_resources: Vec<String>,
}

/// Discovers the modules the container node is built from.
pub trait ModuleDiscoverer: Send + Sync {
    fn discover(&self) -> Result<Vec<ArtifactModule>, IsolationError>;
}

/// Scope owning the file handles opened during one discovery run.
///
/// Handles stay open for the duration of the run and are released when the
/// scope drops — on success and on every early-error exit alike.
#[derive(Default)]
struct DiscoveryScope {
    handles: Vec<File>,
}

impl DiscoveryScope {
    fn load(&mut self, path: &Path) -> Result<String, IsolationError> {
        let root = path.display().to_string();
        let mut file =
            File::open(path).map_err(|err| IsolationError::module_discovery(&root, err))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|err| IsolationError::module_discovery(&root, err))?;
        self.handles.push(file);
        Ok(contents)
    }

    fn release(self) {
        debug!(handles = self.handles.len(), "Released module discovery handles");
    }
}

/// File-system discoverer seeded with explicit root directories.
pub struct FileModuleDiscoverer {
    roots: Vec<PathBuf>,
}

impl FileModuleDiscoverer {
    /// Manifest file expected inside each module directory.
    pub const MODULE_DESCRIPTOR: &'static str = "flowgate-module.json";

    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl ModuleDiscoverer for FileModuleDiscoverer {
    fn discover(&self) -> Result<Vec<ArtifactModule>, IsolationError> {
        let mut scope = DiscoveryScope::default();
        let mut modules = Vec::new();

        for root in &self.roots {
            let root_display = root.display().to_string();
            let entries = fs::read_dir(root)
                .map_err(|err| IsolationError::module_discovery(&root_display, err))?;
            for entry in entries {
                let entry =
                    entry.map_err(|err| IsolationError::module_discovery(&root_display, err))?;
                let descriptor = entry.path().join(Self::MODULE_DESCRIPTOR);
                if !descriptor.is_file() {
                    continue;
                }
                let contents = scope.load(&descriptor)?;
                let module: ArtifactModule = serde_json::from_str(&contents).map_err(|err| {
                    IsolationError::malformed_module(descriptor.display().to_string(), err.to_string())
                })?;
                debug!(
                    module = %module.name,
                    packages = module.exported_packages.len(),
                    "Discovered module"
                );
                modules.push(module);
            }
        }

        // Deterministic order regardless of directory iteration order.
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        scope.release();
        Ok(modules)
    }
}
