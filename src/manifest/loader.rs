//! Manifest source dispatch
//!
//! A manifest arrives as raw XML, as a standalone manifest file, or embedded
//! as a resource inside a native binary. The loader decides which and feeds
//! the parser. Relative paths are resolved against a configured base path,
//! then against `SXS_MANIFEST_DIR`.

use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::{parser, pe};
use crate::catalog::ComponentCatalog;
use crate::error::ActivationError;
use crate::Result;

/// Environment variable consulted for relative manifest paths when no base
/// path is configured on the runtime.
pub const MANIFEST_DIR_ENV: &str = "SXS_MANIFEST_DIR";

/// Where a manifest comes from.
#[derive(Debug, Clone)]
pub enum ManifestSource {
    /// A filesystem path. Paths ending in `.exe` or `.dll` name a binary
    /// with an embedded manifest resource; anything else is a standalone
    /// manifest document.
    Path(PathBuf),
    /// A raw XML document already in memory.
    Xml(String),
}

/// Loads manifests from any [`ManifestSource`] into a catalog.
#[derive(Debug, Default)]
pub struct ManifestLoader {
    base_path: Option<PathBuf>,
}

impl ManifestLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory relative manifest paths resolve against.
    pub fn with_base_path(mut self, path: impl AsRef<Path>) -> Self {
        self.base_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load one manifest into `catalog`, returning the number of classes
    /// registered.
    pub fn load(&self, source: &ManifestSource, catalog: &ComponentCatalog) -> Result<usize> {
        match source {
            ManifestSource::Xml(xml) => parser::parse_manifest(xml, catalog),
            ManifestSource::Path(path) => self.load_path(path, catalog),
        }
    }

    fn load_path(&self, path: &Path, catalog: &ComponentCatalog) -> Result<usize> {
        let path = self.resolve_path(path);
        tracing::debug!(path = %path.display(), "loading manifest");
        if has_binary_extension(&path) {
            self.load_embedded(&path, catalog)
        } else {
            let xml = std::fs::read_to_string(&path).map_err(|err| {
                ActivationError::malformed(format!(
                    "cannot read manifest '{}': {}",
                    path.display(),
                    err
                ))
                .with_hint("check that the file exists and is readable")
            })?;
            parser::parse_manifest(&xml, catalog)
        }
    }

    /// Extract and parse a manifest embedded in a native binary. The binary
    /// is mapped as data only; it is never loaded for execution here.
    fn load_embedded(&self, path: &Path, catalog: &ComponentCatalog) -> Result<usize> {
        let file = std::fs::File::open(path).map_err(|err| {
            ActivationError::malformed(format!(
                "cannot open binary '{}': {}",
                path.display(),
                err
            ))
        })?;
        let mapping = unsafe { Mmap::map(&file) }.map_err(|err| {
            ActivationError::malformed(format!(
                "cannot map binary '{}': {}",
                path.display(),
                err
            ))
        })?;
        let resource = pe::find_manifest_resource(&mapping)?;
        let xml = std::str::from_utf8(resource).map_err(|err| {
            ActivationError::malformed(format!("embedded manifest is not valid UTF-8: {}", err))
        })?;
        parser::parse_manifest(xml, catalog)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        if let Some(base) = &self.base_path {
            let candidate = base.join(path);
            if candidate.exists() {
                return candidate;
            }
        }
        if let Ok(dir) = std::env::var(MANIFEST_DIR_ENV) {
            let candidate = PathBuf::from(dir).join(path);
            if candidate.exists() {
                return candidate;
            }
        }
        path.to_path_buf()
    }
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("exe") || ext.eq_ignore_ascii_case("dll"))
        .unwrap_or(false)
}
