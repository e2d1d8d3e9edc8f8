//! Identifier and key-set validation utilities.
//!
//! Everything above the document layer funnels its findings through a
//! [`ValidationContext`]: strict mode raises on the first defect, lenient
//! mode logs a warning and carries on so that a best-effort model can still
//! be produced.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::doc::{Mapping, Pos};
use crate::error::{Result, ValidationError};

/// Convention identifiers start with a lowercase ASCII letter and contain
/// only lowercase letters, digits, underscore, dash, and non-trailing dots.
pub static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z](\.?[a-z0-9_-]+)+$").unwrap());

/// Carries the reporting policy for one input file.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub file_name: String,
    pub strict: bool,
}

impl ValidationContext {
    pub fn new(file_name: impl Into<String>, strict: bool) -> Self {
        Self {
            file_name: file_name.into(),
            strict,
        }
    }

    /// Raise the error in strict mode, log it and continue in lenient mode.
    pub fn raise_or_warn(
        &self,
        pos: Pos,
        message: impl Into<String>,
        id: Option<&str>,
    ) -> Result<()> {
        let error = ValidationError::new(pos, message, id);
        if self.strict {
            Err(error.into())
        } else {
            warn!("{}: {}", self.file_name, error);
            Ok(())
        }
    }
}

/// Check an identifier against the conventions grammar.
pub fn validate_id(id: &str, pos: Pos, ctx: &ValidationContext) -> Result<()> {
    if !ID_RE.is_match(id) {
        ctx.raise_or_warn(
            pos,
            format!(
                "Invalid id {}. Semantic convention ids MUST match {}",
                id,
                ID_RE.as_str()
            ),
            Some(id),
        )?;
    }
    Ok(())
}

/// Reject keys outside the allowed set, reporting the first offender at its
/// own position.
pub fn validate_keys(
    map: &Mapping,
    node_pos: Pos,
    allowed: &[&str],
    ctx: &ValidationContext,
) -> Result<()> {
    let unwanted: Vec<&str> = map.keys().filter(|k| !allowed.contains(k)).collect();
    if let Some(first) = unwanted.first() {
        let pos = map.key_pos(first).unwrap_or(node_pos);
        let id = map.get("id").and_then(|n| n.scalar_to_string());
        ctx.raise_or_warn(
            pos,
            format!("Invalid keys: [{}]", unwanted.join(", ")),
            id.as_deref(),
        )?;
    }
    Ok(())
}

/// Require every mandatory key to be present.
pub fn check_no_missing_keys(
    map: &Mapping,
    node_pos: Pos,
    mandatory: &[&str],
    ctx: &ValidationContext,
) -> Result<()> {
    let missing: Vec<&str> = mandatory
        .iter()
        .filter(|k| !map.contains_key(k))
        .copied()
        .collect();
    if !missing.is_empty() {
        let id = map.get("id").and_then(|n| n.scalar_to_string());
        ctx.raise_or_warn(
            node_pos,
            format!("Missing keys: [{}]", missing.join(", ")),
            id.as_deref(),
        )?;
    }
    Ok(())
}
