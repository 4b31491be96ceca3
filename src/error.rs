//! Activation error types
//!
//! Every failure branch in the crate maps to one of these kinds; callers
//! never receive an unclassified failure.

/// Unified error type for the activation runtime.
///
/// All variants carry owned strings so that a memoized provider-load failure
/// can be cloned and handed to every caller that raced on the same load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("malformed manifest: {reason}{}", .hint.as_ref().map(|h| format!("\n Hint: {}", h)).unwrap_or_default())]
    MalformedManifest { reason: String, hint: Option<String> },

    #[error("activatable class '{class_id}' is already registered")]
    DuplicateClass { class_id: String },

    #[error("failed to load provider module '{path}': {reason}")]
    ModuleLoadFailed { path: String, reason: String },

    #[error("activatable class '{class_id}' is not registered")]
    ClassNotRegistered { class_id: String },

    #[error("no metadata file found for type '{type_name}'")]
    MetadataNotFound { type_name: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl ActivationError {
    /// Shorthand for a manifest structure violation.
    pub fn malformed(reason: impl Into<String>) -> Self {
        ActivationError::MalformedManifest {
            reason: reason.into(),
            hint: None,
        }
    }

    /// Shorthand for a class-identifier collision.
    pub fn duplicate(class_id: impl Into<String>) -> Self {
        ActivationError::DuplicateClass {
            class_id: class_id.into(),
        }
    }

    /// Shorthand for a library or entry-point resolution failure.
    pub fn module_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ActivationError::ModuleLoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a class unknown to both resolver tiers.
    pub fn not_registered(class_id: impl Into<String>) -> Self {
        ActivationError::ClassNotRegistered {
            class_id: class_id.into(),
        }
    }

    /// Shorthand for a caller contract violation.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        ActivationError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Attach an actionable hint to the error.
    pub fn with_hint(mut self, text: impl Into<String>) -> Self {
        if let ActivationError::MalformedManifest { hint, .. } = &mut self {
            *hint = Some(text.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_is_rendered() {
        let err = ActivationError::malformed("missing 'name' attribute")
            .with_hint("every <file> element needs a non-empty name");
        let rendered = err.to_string();
        assert!(rendered.contains("missing 'name' attribute"));
        assert!(rendered.contains("Hint: every <file> element"));
    }

    #[test]
    fn test_hint_only_applies_to_manifest_errors() {
        let err = ActivationError::duplicate("A.B").with_hint("ignored");
        assert_eq!(
            err,
            ActivationError::DuplicateClass {
                class_id: "A.B".into()
            }
        );
    }
}
