//! Side-by-side manifest loading
//!
//! Turns manifest documents into catalog entries. The document is ephemeral:
//! it is parsed once per load and not retained.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ManifestLoader`] | Dispatches over path / binary / raw-XML sources |
//! | [`ManifestSource`] | Where a manifest comes from |
//! | `parser` | Streaming `<file>` / `<activatableClass>` extraction |
//! | `pe` | Embedded manifest-resource lookup in native binaries |

mod loader;
mod parser;
mod pe;

pub use loader::{ManifestLoader, ManifestSource, MANIFEST_DIR_ENV};
