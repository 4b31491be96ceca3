//! Two-tier resolution of threading models and activation factories
//!
//! The package-graph catalog is authoritative when it has an opinion; the
//! side-by-side catalog is consulted only when the package graph explicitly
//! has no entry. A definitive error from the first tier propagates without
//! any fallback. That rule lives in one combinator, shared by the
//! threading-model and factory paths.

use std::sync::Arc;

use crate::catalog::ComponentCatalog;
use crate::error::ActivationError;
use crate::provider::{ActivationFactory, InterfaceId, ModuleLoader, ThreadingModel};
use crate::Result;

/// Tagged outcome of a single resolver tier.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The tier has the class and produced a value.
    Found(T),
    /// The tier definitively has no entry for the class.
    NotFound,
    /// The tier failed. This is not "no entry" and never triggers fallback.
    Error(ActivationError),
}

/// External first-tier catalog built from the dependency/deployment graph.
///
/// A "null factory" result under the package graph's convention maps to
/// [`Outcome::NotFound`]; every other failure is [`Outcome::Error`].
pub trait PackageGraphResolver: Send + Sync {
    fn threading_model(&self, class_id: &str) -> Outcome<ThreadingModel>;

    fn activation_factory(
        &self,
        class_id: &str,
        iid: &InterfaceId,
    ) -> Outcome<Arc<dyn ActivationFactory>>;
}

/// Package-graph tier for processes with no dynamic dependencies: every
/// query is a definitive "not registered", so resolution always falls
/// through to the side-by-side catalog.
#[derive(Debug, Default)]
pub struct EmptyPackageGraph;

impl PackageGraphResolver for EmptyPackageGraph {
    fn threading_model(&self, _class_id: &str) -> Outcome<ThreadingModel> {
        Outcome::NotFound
    }

    fn activation_factory(
        &self,
        _class_id: &str,
        _iid: &InterfaceId,
    ) -> Outcome<Arc<dyn ActivationFactory>> {
        Outcome::NotFound
    }
}

/// Apply the two-tier precedence rule: errors propagate, not-found falls
/// through. The fallback closure runs only when the primary tier reports
/// [`Outcome::NotFound`].
fn resolve_two_tier<T>(
    class_id: &str,
    primary: impl FnOnce() -> Outcome<T>,
    fallback: impl FnOnce() -> Outcome<T>,
) -> Result<T> {
    match primary() {
        Outcome::Found(value) => Ok(value),
        Outcome::Error(err) => Err(err),
        Outcome::NotFound => match fallback() {
            Outcome::Found(value) => Ok(value),
            Outcome::Error(err) => Err(err),
            Outcome::NotFound => Err(ActivationError::not_registered(class_id)),
        },
    }
}

/// Implements the activation lookup surfaces over both catalog tiers.
pub struct ResolutionOrchestrator {
    catalog: Arc<ComponentCatalog>,
    package_graph: Arc<dyn PackageGraphResolver>,
    module_loader: Arc<dyn ModuleLoader>,
}

impl ResolutionOrchestrator {
    pub fn new(
        catalog: Arc<ComponentCatalog>,
        package_graph: Arc<dyn PackageGraphResolver>,
        module_loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            catalog,
            package_graph,
            module_loader,
        }
    }

    /// Resolve the declared threading model for `class_id`.
    pub fn threading_model(&self, class_id: &str) -> Result<ThreadingModel> {
        resolve_two_tier(
            class_id,
            || self.package_graph.threading_model(class_id),
            || match self.catalog.lookup(class_id) {
                Some(provider) => Outcome::Found(provider.threading_model()),
                None => Outcome::NotFound,
            },
        )
    }

    /// Resolve an activation factory for `class_id`, narrowed to `iid`.
    ///
    /// A side-by-side hit loads the provider module on demand and delegates
    /// to its factory entry point.
    pub fn activation_factory(
        &self,
        class_id: &str,
        iid: &InterfaceId,
    ) -> Result<Arc<dyn ActivationFactory>> {
        resolve_two_tier(
            class_id,
            || self.package_graph.activation_factory(class_id, iid),
            || match self.catalog.lookup(class_id) {
                Some(provider) => {
                    tracing::debug!(class_id, "package graph has no entry, using side-by-side catalog");
                    match provider.activation_factory(self.module_loader.as_ref(), class_id, iid) {
                        Ok(factory) => Outcome::Found(factory),
                        Err(err) => Outcome::Error(err),
                    }
                }
                None => Outcome::NotFound,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_tier_prefers_primary_hit() {
        let resolved = resolve_two_tier(
            "A.B",
            || Outcome::Found(1),
            || -> Outcome<i32> { panic!("fallback must not run on a primary hit") },
        );
        assert_eq!(resolved.unwrap(), 1);
    }

    #[test]
    fn test_two_tier_error_skips_fallback() {
        let resolved: Result<i32> = resolve_two_tier(
            "A.B",
            || Outcome::Error(ActivationError::invalid_argument("broken tier")),
            || panic!("fallback must not run on a primary error"),
        );
        assert!(matches!(
            resolved.unwrap_err(),
            ActivationError::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_two_tier_not_found_falls_through() {
        let resolved = resolve_two_tier("A.B", || Outcome::NotFound, || Outcome::Found(2));
        assert_eq!(resolved.unwrap(), 2);
    }

    #[test]
    fn test_two_tier_double_miss_is_not_registered() {
        let resolved: Result<i32> =
            resolve_two_tier("A.B", || Outcome::NotFound, || Outcome::NotFound);
        assert_eq!(
            resolved.unwrap_err(),
            ActivationError::not_registered("A.B")
        );
    }

    #[test]
    fn test_two_tier_fallback_error_propagates() {
        let resolved: Result<i32> = resolve_two_tier(
            "A.B",
            || Outcome::NotFound,
            || Outcome::Error(ActivationError::module_load("widgets.dll", "load failed")),
        );
        assert!(matches!(
            resolved.unwrap_err(),
            ActivationError::ModuleLoadFailed { .. }
        ));
    }
}
