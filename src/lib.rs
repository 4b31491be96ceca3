//! # sxs-activation
//!
//! Registration-free activation of named software components. Component
//! availability is declared in XML manifests shipped alongside the
//! application instead of a central system registry; the runtime resolves an
//! activation request against a package-graph catalog first and falls back
//! to the locally built side-by-side catalog.
//!
//! ## Core Philosophy
//!
//! - **Manifest-Driven**: availability comes from `<file>` /
//!   `<activatableClass>` declarations, parsed once and never retained
//! - **Two-Tier Resolution**: the package graph is authoritative when it has
//!   an opinion; the side-by-side catalog answers only when the package
//!   graph explicitly has no entry
//! - **Lazy Loading**: provider modules load on first activation behind a
//!   one-shot, race-safe gate
//! - **Typed Failures**: every failure branch maps to one
//!   [`ActivationError`] kind
//!
//! ## Quick Start
//!
//! ```rust
//! use sxs_activation::{ActivationRuntime, ThreadingModel};
//!
//! fn main() -> sxs_activation::Result<()> {
//!     let runtime = ActivationRuntime::new();
//!     runtime.load_manifest_xml(
//!         r#"<assembly>
//!              <file name="widgets.dll">
//!                <activatableClass name="Contoso.Widgets.Widget" threadingModel="both" />
//!              </file>
//!            </assembly>"#,
//!     )?;
//!
//!     let model = runtime.get_threading_model("Contoso.Widgets.Widget")?;
//!     assert_eq!(model, ThreadingModel::Both);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`manifest`] | Manifest parsing and source dispatch (files, binaries, raw XML) |
//! | [`catalog`] | Process-wide class-identifier to provider map |
//! | [`provider`] | Provider records and lazy native-module loading |
//! | [`resolver`] | Two-tier resolution with the error/not-found precedence rule |
//! | [`metadata`] | Metadata file location for third-party types |
//! | [`channel`] | Push-notification channel lifecycle shim |
//! | [`telemetry`] | Optional telemetry sinks |
//! | [`runtime`] | [`ActivationRuntime`] facade and builder |

pub mod catalog;
pub mod channel;
pub mod manifest;
pub mod metadata;
pub mod provider;
pub mod resolver;
pub mod runtime;
pub mod telemetry;

/// Error type for the library
pub mod error;
pub use error::ActivationError;

/// A specialized Result for activation operations
pub type Result<T> = std::result::Result<T, ActivationError>;

// Re-export main types for convenience
pub use catalog::ComponentCatalog;
pub use manifest::{ManifestLoader, ManifestSource};
pub use provider::{
    ActivationFactory, InterfaceId, LoadedModule, ModuleLoader, NativeModuleLoader, Provider,
    ThreadingModel,
};
pub use resolver::{Outcome, PackageGraphResolver};
pub use runtime::{ActivationRuntime, ActivationRuntimeBuilder};
pub use telemetry::{TelemetryEvent, TelemetrySink};
