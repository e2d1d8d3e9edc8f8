//! Compatibility command - compare a corpus against a previous version.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use semconv_compat::CompatibilityChecker;

use super::check::{collect_files, load_set};

#[derive(Args)]
pub struct CompatibilityArgs {
    /// Directory with the current conventions files
    #[arg(long)]
    pub yaml_root: PathBuf,

    /// Directory with the previous version's conventions files
    #[arg(long)]
    pub previous_root: PathBuf,

    /// Do not fail on non-critical findings
    #[arg(long)]
    pub ignore_warnings: bool,

    /// Output format for findings
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn execute(args: CompatibilityArgs) -> Result<()> {
    info!(
        "Comparing {} against {}",
        args.yaml_root.display(),
        args.previous_root.display()
    );
    let current = load_set(&collect_files(Some(&args.yaml_root), &[])?, true)?;
    let previous = load_set(&collect_files(Some(&args.previous_root), &[])?, true)?;

    let problems = CompatibilityChecker::new(&current, &previous).check();
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&problems)?),
        OutputFormat::Text => {
            for problem in &problems {
                if problem.critical {
                    println!("{}", problem);
                } else {
                    println!("warning: {}", problem);
                }
            }
        }
    }

    let critical = problems.iter().filter(|p| p.critical).count();
    let warnings = problems.len() - critical;
    if critical > 0 {
        bail!("compatibility check failed with {} critical problems", critical);
    }
    if warnings > 0 && !args.ignore_warnings {
        bail!("compatibility check found {} warnings", warnings);
    }
    Ok(())
}
