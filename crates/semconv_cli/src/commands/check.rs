//! Check command - parse and resolve a conventions corpus.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;
use walkdir::WalkDir;

use semconv_model::ConventionSet;

#[derive(Args)]
pub struct CheckArgs {
    /// Directory scanned recursively for .yaml/.yml conventions files
    #[arg(long)]
    pub yaml_root: Option<PathBuf>,

    /// Individual conventions files
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Log validation findings instead of failing on the first one
    #[arg(long)]
    pub lenient: bool,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let files = collect_files(args.yaml_root.as_deref(), &args.files)?;
    if files.is_empty() {
        bail!("no conventions files found; pass --yaml-root or file arguments");
    }
    info!("Checking {} conventions files", files.len());

    let set = load_set(&files, !args.lenient)?;
    println!(
        "{} files parsed, {} groups resolved",
        files.len(),
        set.len()
    );
    Ok(())
}

/// Parse and resolve a corpus, failing on any recorded parse error.
pub fn load_set(files: &[PathBuf], strict: bool) -> Result<ConventionSet> {
    let mut set = ConventionSet::new(strict);
    for file in files {
        set.parse_file(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
    }
    set.finish().context("resolution failed")?;
    if set.has_error() {
        bail!("validation failed, see the errors above");
    }
    Ok(set)
}

/// Explicit files plus every YAML file under the root, in sorted order.
pub fn collect_files(yaml_root: Option<&Path>, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = files.to_vec();
    if let Some(root) = yaml_root {
        if !root.is_dir() {
            bail!("--yaml-root {} not found", root.display());
        }
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            ) {
                out.push(path.to_path_buf());
            }
        }
    }
    out.sort();
    Ok(out)
}
