//! Standalone binary that loads side-by-side manifests and reports the
//! resulting catalog. Used to sanity-check manifests before shipping them
//! next to an application.

use std::path::PathBuf;

use anyhow::bail;
use sxs_activation::ActivationRuntime;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        bail!("usage: validate-manifests <manifest-or-binary> [more...]");
    }

    let mut builder = ActivationRuntime::builder();
    if let Ok(dir) = std::env::var(sxs_activation::manifest::MANIFEST_DIR_ENV) {
        println!("Using manifest directory: {}", dir);
        builder = builder.with_manifest_base_path(dir);
    }
    let runtime = builder.build();

    let mut errors = Vec::new();
    for path in &paths {
        print!("Loading {}... ", path.display());
        match runtime.load_manifest_path(path) {
            Ok(count) => println!("ok ({} classes)", count),
            Err(e) => {
                println!("failed");
                errors.push(format!("  {}: {}", path.display(), e));
            }
        }
    }

    println!("\n=== Registered Classes ===");
    for class_id in runtime.catalog().class_ids() {
        println!("  {}", class_id);
    }
    println!("{} classes total", runtime.catalog().len());

    if !errors.is_empty() {
        bail!("some manifests failed to load:\n{}", errors.join("\n"));
    }

    // A manifest set that registers nothing is almost certainly a mistake.
    if runtime.catalog().is_empty() {
        bail!("no activatable classes registered");
    }

    Ok(())
}
