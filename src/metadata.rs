//! Metadata file location for third-party types
//!
//! Resolves the metadata file declaring a non-platform type. Types under the
//! platform's reserved namespace are rejected up front without any search.
//! The actual file/type lookup is performed by an external type-resolution
//! facility; this module only implements the control-flow contract around it.

use std::sync::Arc;

use crate::error::ActivationError;
use crate::Result;

/// Namespace prefix reserved for platform types. Never resolved here.
pub const RESERVED_NAMESPACE_PREFIX: &str = "Windows.";

/// Compatibility version the internally constructed dispenser is pinned to.
pub const DISPENSER_RUNTIME_VERSION: &str = "WindowsRuntime 1.4";

/// Dispenses metadata readers to the type-resolution facility.
pub trait MetadataDispenser: Send + Sync {
    fn runtime_version(&self) -> &str;

    /// Whether the dispenser may negotiate a different runtime version than
    /// the one it was constructed with.
    fn version_negotiation_enabled(&self) -> bool;
}

/// Default dispenser, pinned to [`DISPENSER_RUNTIME_VERSION`] with version
/// negotiation disabled.
///
/// Negotiation must stay disabled: enabling it would trigger an on-demand
/// installation request of an unrelated legacy runtime component that this
/// runtime does not need. This is a documented anti-dependency guard, not an
/// oversight; preserve it in any change to this type.
#[derive(Debug)]
pub struct PinnedMetadataDispenser {
    runtime_version: &'static str,
}

impl PinnedMetadataDispenser {
    pub fn new() -> Self {
        Self {
            runtime_version: DISPENSER_RUNTIME_VERSION,
        }
    }
}

impl Default for PinnedMetadataDispenser {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataDispenser for PinnedMetadataDispenser {
    fn runtime_version(&self) -> &str {
        self.runtime_version
    }

    fn version_negotiation_enabled(&self) -> bool {
        false
    }
}

/// Which optional outputs the caller wants back.
///
/// The import handle and the type-definition token only make sense together;
/// requesting one without the other is a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataQuery {
    pub want_import: bool,
    pub want_type_def: bool,
}

impl MetadataQuery {
    /// Request the file path only.
    pub fn path_only() -> Self {
        Self {
            want_import: false,
            want_type_def: false,
        }
    }

    /// Request the file path plus import handle and type-def token.
    pub fn full() -> Self {
        Self {
            want_import: true,
            want_type_def: true,
        }
    }
}

/// Opaque reader over a located metadata file.
pub trait MetadataImport: Send + Sync {}

/// Token identifying a type definition inside a metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDefToken(pub u32);

/// Result of a successful metadata resolution.
pub struct MetadataResolution {
    pub file_path: String,
    pub import: Option<Arc<dyn MetadataImport>>,
    pub type_def_token: Option<TypeDefToken>,
}

impl std::fmt::Debug for MetadataResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolution")
            .field("file_path", &self.file_path)
            .field("has_import", &self.import.is_some())
            .field("type_def_token", &self.type_def_token)
            .finish()
    }
}

/// External third-party type-resolution facility.
pub trait ThirdPartyTypeResolver: Send + Sync {
    fn resolve(
        &self,
        dispenser: &dyn MetadataDispenser,
        type_name: &str,
        query: MetadataQuery,
    ) -> Result<MetadataResolution>;
}

/// Locate the metadata file declaring `type_name`.
///
/// Reserved-namespace types fail with [`ActivationError::MetadataNotFound`]
/// before any search happens. When the caller supplies no dispenser, a
/// [`PinnedMetadataDispenser`] is constructed internally and handed to the
/// resolver along with the query.
pub fn resolve_metadata_file(
    type_name: &str,
    dispenser: Option<Arc<dyn MetadataDispenser>>,
    query: MetadataQuery,
    resolver: &dyn ThirdPartyTypeResolver,
) -> Result<MetadataResolution> {
    if type_name.starts_with(RESERVED_NAMESPACE_PREFIX) {
        return Err(ActivationError::MetadataNotFound {
            type_name: type_name.to_string(),
        });
    }

    if query.want_import != query.want_type_def {
        return Err(ActivationError::invalid_argument(
            "import handle and type-def token must be requested together",
        ));
    }

    let dispenser = dispenser.unwrap_or_else(|| Arc::new(PinnedMetadataDispenser::new()));
    tracing::debug!(type_name, "resolving third-party metadata file");
    resolver.resolve(dispenser.as_ref(), type_name, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingResolver {
        calls: AtomicUsize,
        seen_version: std::sync::Mutex<Option<(String, bool)>>,
    }

    impl ThirdPartyTypeResolver for RecordingResolver {
        fn resolve(
            &self,
            dispenser: &dyn MetadataDispenser,
            type_name: &str,
            query: MetadataQuery,
        ) -> Result<MetadataResolution> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_version.lock().unwrap() = Some((
                dispenser.runtime_version().to_string(),
                dispenser.version_negotiation_enabled(),
            ));
            Ok(MetadataResolution {
                file_path: format!("{}.winmd", type_name),
                import: None,
                type_def_token: query.want_type_def.then_some(TypeDefToken(0x0200_0001)),
            })
        }
    }

    #[test]
    fn test_reserved_namespace_rejected_without_search() {
        let resolver = RecordingResolver::default();
        let err = resolve_metadata_file(
            "Windows.Foundation.Uri",
            None,
            MetadataQuery::path_only(),
            &resolver,
        )
        .unwrap_err();

        assert!(matches!(err, ActivationError::MetadataNotFound { .. }));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_mismatched_outputs_are_invalid() {
        let resolver = RecordingResolver::default();
        let query = MetadataQuery {
            want_import: true,
            want_type_def: false,
        };
        let err =
            resolve_metadata_file("Contoso.Widgets.Widget", None, query, &resolver).unwrap_err();

        assert!(matches!(err, ActivationError::InvalidArgument { .. }));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_default_dispenser_is_pinned_with_negotiation_disabled() {
        let resolver = RecordingResolver::default();
        resolve_metadata_file(
            "Contoso.Widgets.Widget",
            None,
            MetadataQuery::full(),
            &resolver,
        )
        .unwrap();

        let seen = resolver.seen_version.lock().unwrap().clone().unwrap();
        assert_eq!(seen.0, DISPENSER_RUNTIME_VERSION);
        assert!(!seen.1, "version negotiation must stay disabled");
    }

    #[test]
    fn test_caller_dispenser_is_used_as_is() {
        struct CallerDispenser;
        impl MetadataDispenser for CallerDispenser {
            fn runtime_version(&self) -> &str {
                "WindowsRuntime 1.3"
            }
            fn version_negotiation_enabled(&self) -> bool {
                true
            }
        }

        let resolver = RecordingResolver::default();
        resolve_metadata_file(
            "Contoso.Widgets.Widget",
            Some(Arc::new(CallerDispenser)),
            MetadataQuery::path_only(),
            &resolver,
        )
        .unwrap();

        let seen = resolver.seen_version.lock().unwrap().clone().unwrap();
        assert_eq!(seen.0, "WindowsRuntime 1.3");
    }
}
