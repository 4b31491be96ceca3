//! Activation runtime facade
//!
//! Owns the side-by-side catalog and wires it to the manifest loader and the
//! resolution orchestrator. The runtime is an explicit, lifecycle-scoped
//! service object: the process bootstrap sequence creates one and injects
//! collaborators through the builder, so tests can substitute any tier.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::ComponentCatalog;
use crate::manifest::{ManifestLoader, ManifestSource};
use crate::provider::{ActivationFactory, InterfaceId, ModuleLoader, NativeModuleLoader, ThreadingModel};
use crate::resolver::{EmptyPackageGraph, PackageGraphResolver, ResolutionOrchestrator};
use crate::Result;

/// Entry point for registration-free activation.
pub struct ActivationRuntime {
    catalog: Arc<ComponentCatalog>,
    loader: ManifestLoader,
    orchestrator: ResolutionOrchestrator,
}

impl ActivationRuntime {
    /// A runtime with default collaborators: empty package graph, native
    /// module loader, no manifest base path.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ActivationRuntimeBuilder {
        ActivationRuntimeBuilder::default()
    }

    /// Load a manifest from any source into the catalog. Returns the number
    /// of classes registered by this document.
    pub fn load_manifest(&self, source: &ManifestSource) -> Result<usize> {
        let count = self.loader.load(source, &self.catalog)?;
        tracing::info!(count, total = self.catalog.len(), "manifest loaded");
        Ok(count)
    }

    /// Convenience wrapper over [`ActivationRuntime::load_manifest`] for
    /// filesystem sources (standalone manifests or `.exe`/`.dll` binaries
    /// with an embedded manifest).
    pub fn load_manifest_path(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.load_manifest(&ManifestSource::Path(path.as_ref().to_path_buf()))
    }

    /// Convenience wrapper over [`ActivationRuntime::load_manifest`] for raw
    /// XML already in memory.
    pub fn load_manifest_xml(&self, xml: &str) -> Result<usize> {
        self.load_manifest(&ManifestSource::Xml(xml.to_string()))
    }

    /// Resolve the threading model declared for `class_id`, package graph
    /// first, side-by-side catalog second.
    pub fn get_threading_model(&self, class_id: &str) -> Result<ThreadingModel> {
        self.orchestrator.threading_model(class_id)
    }

    /// Resolve an activation factory for `class_id`, narrowed to `iid`.
    pub fn get_activation_factory(
        &self,
        class_id: &str,
        iid: &InterfaceId,
    ) -> Result<Arc<dyn ActivationFactory>> {
        self.orchestrator.activation_factory(class_id, iid)
    }

    /// The side-by-side catalog. Diagnostic surface; resolution goes through
    /// the orchestrator.
    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }
}

impl Default for ActivationRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ActivationRuntime`].
#[derive(Default)]
pub struct ActivationRuntimeBuilder {
    base_path: Option<PathBuf>,
    package_graph: Option<Arc<dyn PackageGraphResolver>>,
    module_loader: Option<Arc<dyn ModuleLoader>>,
}

impl ActivationRuntimeBuilder {
    /// Directory relative manifest paths resolve against.
    pub fn with_manifest_base_path(mut self, path: impl AsRef<Path>) -> Self {
        self.base_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// First-tier resolver built from the package graph.
    pub fn with_package_graph(mut self, resolver: Arc<dyn PackageGraphResolver>) -> Self {
        self.package_graph = Some(resolver);
        self
    }

    /// Loader used when a side-by-side provider module is first activated.
    pub fn with_module_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.module_loader = Some(loader);
        self
    }

    pub fn build(self) -> ActivationRuntime {
        let catalog = Arc::new(ComponentCatalog::new());
        let package_graph = self
            .package_graph
            .unwrap_or_else(|| Arc::new(EmptyPackageGraph));
        let module_loader = self
            .module_loader
            .unwrap_or_else(|| Arc::new(NativeModuleLoader::new()));

        let mut loader = ManifestLoader::new();
        if let Some(base) = self.base_path {
            loader = loader.with_base_path(base);
        }

        let orchestrator =
            ResolutionOrchestrator::new(Arc::clone(&catalog), package_graph, module_loader);
        ActivationRuntime {
            catalog,
            loader,
            orchestrator,
        }
    }
}
