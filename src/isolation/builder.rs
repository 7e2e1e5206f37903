//! Deployment-time assembly of the isolation tree.
//!
//! Composition over inheritance: the builder is parameterised with a
//! pluggable [`ModuleDiscoverer`] and a lookup-policy builder function
//! instead of being subclassed per environment.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::descriptor::ClassloaderModel;
use super::discovery::{ArtifactModule, ModuleDiscoverer};
use super::errors::IsolationError;
use super::lookup::ClassLookupPolicy;
use super::node::{ArtifactClassRegistry, ClassResolver, CompositeResolver};

/// Builds the lookup policy from the boot packages and discovered modules.
pub type LookupPolicyBuilder =
    dyn Fn(&HashSet<String>, &[ArtifactModule]) -> ClassLookupPolicy + Send + Sync;

/// Everything the tree exposes to a node owner: packages the container
/// exports resolve parent-first, the rest child-first.
fn default_lookup_policy(
    boot_packages: &HashSet<String>,
    modules: &[ArtifactModule],
) -> ClassLookupPolicy {
    let mut prefixes: Vec<String> = boot_packages
        .iter()
        .cloned()
        .chain(
            modules
                .iter()
                .flat_map(|module| module.exported_packages.iter().cloned()),
        )
        .collect();
    prefixes.sort();
    prefixes.dedup();
    ClassLookupPolicy::parent_first(prefixes)
}

struct ArtifactDefinition {
    name: String,
    model: ClassloaderModel,
    classes: Vec<String>,
    resources: Vec<String>,
}

/// Assembles the container → plugins → application hierarchy.
pub struct IsolationTreeBuilder {
    module_discoverer: Arc<dyn ModuleDiscoverer>,
    lookup_policy_builder: Arc<LookupPolicyBuilder>,
    boot_packages: HashSet<String>,
    container_classes: Vec<String>,
    container_resources: Vec<String>,
    plugins: Vec<ArtifactDefinition>,
    application: Option<ArtifactDefinition>,
}

impl IsolationTreeBuilder {
    pub const CONTAINER_NAME: &'static str = "container";

    pub fn new(module_discoverer: Arc<dyn ModuleDiscoverer>) -> Self {
        Self {
            module_discoverer,
            lookup_policy_builder: Arc::new(default_lookup_policy),
            boot_packages: HashSet::new(),
            container_classes: Vec::new(),
            container_resources: Vec::new(),
            plugins: Vec::new(),
            application: None,
        }
    }

    /// Packages that must resolve to the container everywhere in the tree.
    pub fn with_boot_packages(mut self, packages: impl IntoIterator<Item = String>) -> Self {
        self.boot_packages.extend(packages);
        self
    }

    /// Replace the lookup-policy construction strategy.
    pub fn with_lookup_policy_builder(mut self, builder: Arc<LookupPolicyBuilder>) -> Self {
        self.lookup_policy_builder = builder;
        self
    }

    pub fn with_container_classes(mut self, classes: impl IntoIterator<Item = String>) -> Self {
        self.container_classes.extend(classes);
        self
    }

    pub fn with_container_resources(
        mut self,
        resources: impl IntoIterator<Item = String>,
    ) -> Self {
        self.container_resources.extend(resources);
        self
    }

    /// Add one plugin artifact with its classpath model and local contents.
    pub fn add_plugin(
        mut self,
        name: impl Into<String>,
        model: ClassloaderModel,
        classes: impl IntoIterator<Item = String>,
        resources: impl IntoIterator<Item = String>,
    ) -> Self {
        self.plugins.push(ArtifactDefinition {
            name: name.into(),
            model,
            classes: classes.into_iter().collect(),
            resources: resources.into_iter().collect(),
        });
        self
    }

    /// Define the application artifact deployed on top of the plugins.
    pub fn application(
        mut self,
        name: impl Into<String>,
        model: ClassloaderModel,
        classes: impl IntoIterator<Item = String>,
        resources: impl IntoIterator<Item = String>,
    ) -> Self {
        self.application = Some(ArtifactDefinition {
            name: name.into(),
            model,
            classes: classes.into_iter().collect(),
            resources: resources.into_iter().collect(),
        });
        self
    }

    /// Discover modules, assemble and publish the tree.
    ///
    /// Module discovery failures abort construction; the discoverer releases
    /// any handles it acquired on the way out.
    pub fn build(self) -> Result<IsolationTree, IsolationError> {
        let application_definition = self
            .application
            .ok_or_else(|| IsolationError::build("no application artifact was defined"))?;

        let modules = self.module_discoverer.discover()?;
        let policy = (self.lookup_policy_builder)(&self.boot_packages, &modules);

        let mut container = ArtifactClassRegistry::new(
            Self::CONTAINER_NAME,
            policy.clone(),
            None,
        );
        container.add_classes(self.container_classes);
        container.add_resources(self.container_resources);
        container.export_packages(self.boot_packages.iter().cloned());
        for module in &modules {
            container.export_packages(module.exported_packages.iter().cloned());
            container.export_resources(module.exported_resources.iter().cloned());
        }
        let container = container.publish();
        debug!(modules = modules.len(), "Published container node");

        let mut plugins = Vec::with_capacity(self.plugins.len());
        for definition in self.plugins {
            let mut node = ArtifactClassRegistry::new(
                &definition.name,
                policy.clone(),
                Some(Arc::clone(&container) as Arc<dyn ClassResolver>),
            );
            node.add_classes(definition.classes);
            node.add_resources(definition.resources);
            node.export_packages(definition.model.exported_packages().iter().cloned());
            node.export_resources(definition.model.exported_resources().iter().cloned());
            debug!(plugin = %definition.name, "Published plugin node");
            plugins.push(node.publish());
        }

        // The application sees the container first, then every plugin's
        // exported surface, in deployment order.
        let mut delegates: Vec<Arc<dyn ClassResolver>> =
            vec![Arc::clone(&container) as Arc<dyn ClassResolver>];
        delegates.extend(
            plugins
                .iter()
                .map(|plugin| Arc::clone(plugin) as Arc<dyn ClassResolver>),
        );
        let composite = Arc::new(CompositeResolver::new("application-delegate", delegates));

        let mut application = ArtifactClassRegistry::new(
            &application_definition.name,
            policy,
            Some(composite as Arc<dyn ClassResolver>),
        );
        application.add_classes(application_definition.classes);
        application.add_resources(application_definition.resources);
        application.export_packages(
            application_definition
                .model
                .exported_packages()
                .iter()
                .cloned(),
        );
        application.export_resources(
            application_definition
                .model
                .exported_resources()
                .iter()
                .cloned(),
        );
        let application = application.publish();

        info!(
            application = application.name(),
            plugins = plugins.len(),
            "Isolation tree assembled"
        );

        Ok(IsolationTree {
            container,
            plugins,
            application,
        })
    }
}

/// The published, read-only hierarchy for one deployed application.
pub struct IsolationTree {
    container: Arc<ArtifactClassRegistry>,
    plugins: Vec<Arc<ArtifactClassRegistry>>,
    application: Arc<ArtifactClassRegistry>,
}

impl std::fmt::Debug for IsolationTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolationTree")
            .field("container", &self.container.name())
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("application", &self.application.name())
            .finish()
    }
}

impl IsolationTree {
    pub fn container(&self) -> &Arc<ArtifactClassRegistry> {
        &self.container
    }

    pub fn plugins(&self) -> &[Arc<ArtifactClassRegistry>] {
        &self.plugins
    }

    pub fn plugin(&self, name: &str) -> Option<&Arc<ArtifactClassRegistry>> {
        self.plugins.iter().find(|plugin| plugin.name() == name)
    }

    pub fn application(&self) -> &Arc<ArtifactClassRegistry> {
        &self.application
    }

    /// Tear the tree down at undeployment.
    ///
    /// Nodes drop here; outstanding `Arc` handles keep resolving until
    /// released, after which the nodes are reclaimed deterministically.
    pub fn release(self) {
        info!(application = self.application.name(), "Releasing isolation tree");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticDiscoverer {
        modules: Vec<ArtifactModule>,
    }

    impl ModuleDiscoverer for StaticDiscoverer {
        fn discover(&self) -> Result<Vec<ArtifactModule>, IsolationError> {
            Ok(self.modules.clone())
        }
    }

    struct FailingDiscoverer;

    impl ModuleDiscoverer for FailingDiscoverer {
        fn discover(&self) -> Result<Vec<ArtifactModule>, IsolationError> {
            Err(IsolationError::module_discovery(
                "/container",
                std::io::Error::other("disk gone"),
            ))
        }
    }

    fn api_module() -> ArtifactModule {
        ArtifactModule {
            name: "flowgate-api".to_string(),
            exported_packages: vec!["org.flowgate.api".to_string()],
            exported_resources: vec!["/META-INF/api.schema".to_string()],
        }
    }

    fn builder() -> IsolationTreeBuilder {
        IsolationTreeBuilder::new(Arc::new(StaticDiscoverer {
            modules: vec![api_module()],
        }))
        .with_container_classes(vec!["org.flowgate.api.Processor".to_string()])
        .with_container_resources(vec!["/META-INF/api.schema".to_string()])
    }

    #[test]
    fn test_build_requires_an_application() {
        let err = builder().build().unwrap_err();
        assert!(matches!(err, IsolationError::Build { .. }));
    }

    #[test]
    fn test_discovery_failure_aborts_construction() {
        let err = IsolationTreeBuilder::new(Arc::new(FailingDiscoverer))
            .application("app", ClassloaderModel::empty(), vec![], vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, IsolationError::ModuleDiscovery { .. }));
    }

    #[test]
    fn test_three_tier_resolution() {
        let tree = builder()
            .add_plugin(
                "plugin-http",
                ClassloaderModel::with_exports(
                    vec!["org.acme.http".to_string()],
                    vec![],
                ),
                vec![
                    "org.acme.http.Listener".to_string(),
                    "org.acme.http.internal.Pool".to_string(),
                ],
                vec![],
            )
            .application(
                "app",
                ClassloaderModel::empty(),
                vec!["com.customer.OrderFlow".to_string()],
                vec![],
            )
            .build()
            .unwrap();

        // The application sees its own classes, plugin-exported classes and
        // container-exported API classes.
        let app = tree.application();
        assert_eq!(
            app.resolve_class("com.customer.OrderFlow").unwrap().artifact(),
            "app"
        );
        assert_eq!(
            app.resolve_class("org.acme.http.Listener").unwrap().artifact(),
            "plugin-http"
        );
        assert_eq!(
            app.resolve_class("org.flowgate.api.Processor")
                .unwrap()
                .artifact(),
            "container"
        );

        // Plugin internals stay invisible from the application.
        assert!(app.resolve_class("org.acme.http.internal.Pool").is_err());

        // Plugins see the container's API surface.
        let plugin = tree.plugin("plugin-http").unwrap();
        assert_eq!(
            plugin
                .resolve_class("org.flowgate.api.Processor")
                .unwrap()
                .artifact(),
            "container"
        );
    }

    #[test]
    fn test_api_collision_resolves_parent_first() {
        let tree = builder()
            .add_plugin(
                "plugin-rogue",
                ClassloaderModel::with_exports(vec!["org.flowgate.api".to_string()], vec![]),
                vec!["org.flowgate.api.Processor".to_string()],
                vec![],
            )
            .application("app", ClassloaderModel::empty(), vec![], vec![])
            .build()
            .unwrap();

        // The module-exported API package is parent-first, so even a plugin
        // defining the same class resolves it to the container.
        let plugin = tree.plugin("plugin-rogue").unwrap();
        assert_eq!(
            plugin
                .resolve_class("org.flowgate.api.Processor")
                .unwrap()
                .artifact(),
            "container"
        );
    }
}
