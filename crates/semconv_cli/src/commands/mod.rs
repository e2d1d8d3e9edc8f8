//! CLI command definitions.
//!
//! Each subcommand maps to one stage of the conventions toolchain.

use clap::{Parser, Subcommand};

pub mod check;
pub mod compatibility;

/// semconvgen - semantic convention YAML tooling
#[derive(Parser)]
#[command(name = "semconvgen")]
#[command(version, about = "Parse, resolve, and check semantic convention YAML files")]
#[command(long_about = r#"
semconvgen loads semantic convention YAML files, resolves every
ref/extends/include cross-reference, and reports validation errors
pinned to their YAML source position.

WORKFLOWS:
  check          → Parse and resolve a conventions corpus
  compatibility  → Compare a corpus against a previous version

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Compatibility failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and resolve a conventions corpus
    Check(check::CheckArgs),

    /// Check backward compatibility against a previous corpus
    Compatibility(compatibility::CompatibilityArgs),
}
