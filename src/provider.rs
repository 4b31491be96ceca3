//! Provider records and lazy module loading
//!
//! A [`Provider`] pairs one native module with its lazily resolved activation
//! entry point. The module is loaded on first use behind a one-shot gate:
//! concurrent callers observe exactly one load attempt and share its outcome,
//! success or failure. A provider is owned by the catalog for the life of the
//! process and its module is never unloaded early.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::ActivationError;
use crate::Result;

/// Threading model declared for an activatable class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadingModel {
    /// Single-threaded apartment affinity.
    Sta,
    /// Free-threaded.
    Mta,
    /// Usable from either apartment.
    Both,
}

impl ThreadingModel {
    /// Parse a manifest threading-model string, case-insensitively.
    /// Returns `None` for anything outside the three known values.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("sta") {
            Some(ThreadingModel::Sta)
        } else if value.eq_ignore_ascii_case("mta") {
            Some(ThreadingModel::Mta)
        } else if value.eq_ignore_ascii_case("both") {
            Some(ThreadingModel::Both)
        } else {
            None
        }
    }
}

/// Identifier of the interface a caller wants the generic activation factory
/// narrowed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceId(String);

impl InterfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An object capable of constructing instances of an activatable class.
///
/// Modules hand back a generic factory; callers narrow it to the interface
/// they need via [`ActivationFactory::query_interface`].
pub trait ActivationFactory: Send + Sync {
    /// Narrow this factory to the requested interface, or fail with whatever
    /// error the narrowing step produces.
    fn query_interface(&self, iid: &InterfaceId) -> Result<Arc<dyn ActivationFactory>>;
}

/// A successfully loaded provider module: library handle and resolved entry
/// point together. The two are inseparable, so "handle present without entry
/// point" cannot be represented.
pub trait LoadedModule: Send + Sync {
    /// Invoke the module's factory-retrieval entry point for `class_id`.
    fn get_activation_factory(&self, class_id: &str) -> Result<Arc<dyn ActivationFactory>>;
}

/// Loads provider modules from their declared paths.
///
/// Injected into the resolution path so tests can observe load attempts
/// without touching the dynamic linker.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<Box<dyn LoadedModule>>;
}

/// Well-known exported entry point every provider module implements.
pub const ACTIVATION_ENTRY_POINT: &str = "sxs_get_activation_factory";

/// Signature of the exported entry point.
pub type GetActivationFactoryFn = fn(&str) -> Result<Arc<dyn ActivationFactory>>;

/// One native module declared by a manifest `<file>` entry.
pub struct Provider {
    module_path: String,
    xmlns: Option<String>,
    threading_model: ThreadingModel,
    // Loaded handle + entry point, or the memoized load failure. Populated at
    // most once; the gate serializes racing loaders.
    module: OnceCell<std::result::Result<Box<dyn LoadedModule>, ActivationError>>,
}

impl Provider {
    pub fn new(
        module_path: impl Into<String>,
        xmlns: Option<String>,
        threading_model: ThreadingModel,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            xmlns,
            threading_model,
            module: OnceCell::new(),
        }
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// Declared XML namespace. Informational only; never validated.
    pub fn xmlns(&self) -> Option<&str> {
        self.xmlns.as_deref()
    }

    pub fn threading_model(&self) -> ThreadingModel {
        self.threading_model
    }

    /// Load the module if it is not loaded yet.
    ///
    /// Idempotent and race-safe: at most one load attempt ever happens, and
    /// every caller observes the same outcome. A failed load is memoized and
    /// returned unchanged to later callers; no retry occurs.
    pub fn ensure_loaded(&self, loader: &dyn ModuleLoader) -> Result<&dyn LoadedModule> {
        let slot = self.module.get_or_init(|| {
            tracing::debug!(module = %self.module_path, "loading provider module");
            loader.load(&self.module_path)
        });
        match slot {
            Ok(module) => Ok(module.as_ref()),
            Err(err) => Err(err.clone()),
        }
    }

    /// Resolve an activation factory for `class_id`, narrowed to `iid`.
    ///
    /// Loads the module on first use, asks its entry point for the generic
    /// factory, then narrows. The intermediate generic factory is released
    /// before returning. Module and narrowing failures propagate unmasked.
    pub fn activation_factory(
        &self,
        loader: &dyn ModuleLoader,
        class_id: &str,
        iid: &InterfaceId,
    ) -> Result<Arc<dyn ActivationFactory>> {
        let module = self.ensure_loaded(loader)?;
        let generic = module.get_activation_factory(class_id)?;
        let narrowed = generic.query_interface(iid);
        drop(generic);
        narrowed
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("module_path", &self.module_path)
            .field("xmlns", &self.xmlns)
            .field("threading_model", &self.threading_model)
            .field("loaded", &self.module.get().map(|r| r.is_ok()))
            .finish()
    }
}

/// Production loader backed by the platform dynamic linker.
///
/// Libraries stay alive inside the returned [`LoadedModule`] so the resolved
/// function pointer remains valid until the provider is dropped.
#[derive(Debug, Default)]
pub struct NativeModuleLoader;

impl NativeModuleLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for NativeModuleLoader {
    fn load(&self, path: &str) -> Result<Box<dyn LoadedModule>> {
        let library = unsafe { libloading::Library::new(path) }
            .map_err(|e| ActivationError::module_load(path, e.to_string()))?;
        let entry = unsafe {
            library
                .get::<GetActivationFactoryFn>(ACTIVATION_ENTRY_POINT.as_bytes())
                .map(|symbol| *symbol)
        }
        .map_err(|e| {
            ActivationError::module_load(
                path,
                format!("missing entry point '{}': {}", ACTIVATION_ENTRY_POINT, e),
            )
        })?;
        Ok(Box::new(NativeModule {
            entry,
            _library: library,
        }))
    }
}

struct NativeModule {
    entry: GetActivationFactoryFn,
    _library: libloading::Library,
}

impl LoadedModule for NativeModule {
    fn get_activation_factory(&self, class_id: &str) -> Result<Arc<dyn ActivationFactory>> {
        (self.entry)(class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeFactory {
        supported: InterfaceId,
    }

    impl ActivationFactory for FakeFactory {
        fn query_interface(&self, iid: &InterfaceId) -> Result<Arc<dyn ActivationFactory>> {
            if *iid == self.supported {
                Ok(Arc::new(FakeFactory {
                    supported: self.supported.clone(),
                }))
            } else {
                Err(ActivationError::invalid_argument(format!(
                    "interface '{}' is not implemented",
                    iid
                )))
            }
        }
    }

    struct FakeModule;

    impl LoadedModule for FakeModule {
        fn get_activation_factory(&self, _class_id: &str) -> Result<Arc<dyn ActivationFactory>> {
            Ok(Arc::new(FakeFactory {
                supported: InterfaceId::new("IWidgetFactory"),
            }))
        }
    }

    struct CountingLoader {
        attempts: AtomicUsize,
        fail: bool,
    }

    impl CountingLoader {
        fn new(fail: bool) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl ModuleLoader for CountingLoader {
        fn load(&self, path: &str) -> Result<Box<dyn LoadedModule>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ActivationError::module_load(path, "module not found"))
            } else {
                Ok(Box::new(FakeModule))
            }
        }
    }

    #[test]
    fn test_threading_model_parse() {
        assert_eq!(ThreadingModel::parse("STA"), Some(ThreadingModel::Sta));
        assert_eq!(ThreadingModel::parse("mta"), Some(ThreadingModel::Mta));
        assert_eq!(ThreadingModel::parse("Both"), Some(ThreadingModel::Both));
        assert_eq!(ThreadingModel::parse("neutral"), None);
        assert_eq!(ThreadingModel::parse(""), None);
    }

    #[test]
    fn test_ensure_loaded_is_idempotent() {
        let loader = CountingLoader::new(false);
        let provider = Provider::new("widgets.dll", None, ThreadingModel::Both);

        provider.ensure_loaded(&loader).unwrap();
        provider.ensure_loaded(&loader).unwrap();
        provider.ensure_loaded(&loader).unwrap();

        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_failure_is_memoized() {
        let loader = CountingLoader::new(true);
        let provider = Provider::new("missing.dll", None, ThreadingModel::Sta);

        let first = provider.ensure_loaded(&loader).err().unwrap();
        let second = provider.ensure_loaded(&loader).err().unwrap();

        assert_eq!(first, second);
        assert!(matches!(first, ActivationError::ModuleLoadFailed { .. }));
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_activation_factory_narrows_interface() {
        let loader = CountingLoader::new(false);
        let provider = Provider::new("widgets.dll", None, ThreadingModel::Both);

        let factory = provider.activation_factory(
            &loader,
            "Contoso.Widgets.Widget",
            &InterfaceId::new("IWidgetFactory"),
        );
        assert!(factory.is_ok());

        let err = provider
            .activation_factory(
                &loader,
                "Contoso.Widgets.Widget",
                &InterfaceId::new("IUnsupported"),
            )
            .err()
            .unwrap();
        assert!(matches!(err, ActivationError::InvalidArgument { .. }));
    }
}
