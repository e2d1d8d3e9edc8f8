//! Group constraints: `any_of` choice sets and `include` directives.

use serde::Serialize;

use crate::attribute::Attribute;
use crate::doc::{Node, Pos};
use crate::error::{Result, ValidationError};
use crate::validation::{validate_keys, ValidationContext};

/// At least one of the choice sets must be fully present on a signal.
///
/// Equality considers the choice ids only, so inherited copies compare
/// equal to their origin regardless of resolution state.
#[derive(Debug, Clone, Serialize)]
pub struct AnyOf {
    pub choice_list_ids: Vec<Vec<String>>,
    #[serde(skip)]
    pub choice_positions: Vec<Pos>,
    pub inherited: bool,
    /// Resolved attributes per choice set, filled during resolution.
    #[serde(skip)]
    pub choice_list_attributes: Vec<Vec<Attribute>>,
}

impl PartialEq for AnyOf {
    fn eq(&self, other: &Self) -> bool {
        self.choice_list_ids == other.choice_list_ids
    }
}

impl Eq for AnyOf {}

impl AnyOf {
    pub fn new(choice_list_ids: Vec<Vec<String>>, choice_positions: Vec<Pos>) -> Self {
        Self {
            choice_list_ids,
            choice_positions,
            inherited: false,
            choice_list_attributes: Vec::new(),
        }
    }

    /// A flagged copy for propagation into an extending group.
    pub fn inherit_anyof(&self) -> AnyOf {
        AnyOf {
            inherited: true,
            ..self.clone()
        }
    }

    pub fn add_attributes(&mut self, attributes: Vec<Attribute>) {
        self.choice_list_attributes.push(attributes);
    }
}

/// Pulls every attribute and constraint of another group into this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Include {
    pub semconv_id: String,
    #[serde(skip)]
    pub position: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    AnyOf(AnyOf),
    Include(Include),
}

/// Parse the `constraints:` sequence of a group. Each entry carries exactly
/// one constraint type.
pub fn parse_constraints(node: Option<&Node>, ctx: &ValidationContext) -> Result<Vec<Constraint>> {
    let mut constraints = Vec::new();
    let Some(node) = node else {
        return Ok(constraints);
    };
    let entries = node.as_seq().ok_or_else(|| {
        ValidationError::new(node.pos, "constraints must be a sequence", None)
    })?;

    for entry in entries {
        let map = entry.as_map().ok_or_else(|| {
            ValidationError::new(entry.pos, "constraint must be a mapping", None)
        })?;
        validate_keys(map, entry.pos, &["any_of", "include"], ctx)?;
        if map.len() > 1 {
            let second = map.keys().nth(1).unwrap_or_default();
            let pos = map.key_pos(second).unwrap_or(entry.pos);
            return Err(ValidationError::new(
                pos,
                "Invalid entry in constraint array - multiple top-level keys in entry.",
                None,
            )
            .into());
        }

        if let Some(include_node) = map.get("include") {
            let semconv_id = include_node.scalar_to_string().ok_or_else(|| {
                ValidationError::new(include_node.pos, "include expects a group id", None)
            })?;
            constraints.push(Constraint::Include(Include {
                semconv_id: semconv_id.trim().to_owned(),
                position: map.key_pos("include").unwrap_or(entry.pos),
            }));
        } else if let Some(any_of_node) = map.get("any_of") {
            let choices = any_of_node.as_seq().ok_or_else(|| {
                ValidationError::new(any_of_node.pos, "any_of expects a sequence", None)
            })?;
            let mut choice_list_ids = Vec::with_capacity(choices.len());
            let mut choice_positions = Vec::with_capacity(choices.len());
            for choice in choices {
                // A bare scalar is a one-element choice set.
                let ids = match choice.as_seq() {
                    Some(items) => items
                        .iter()
                        .map(|item| {
                            item.scalar_to_string().ok_or_else(|| {
                                ValidationError::new(
                                    item.pos,
                                    "any_of expects attribute ids",
                                    None,
                                )
                            })
                        })
                        .collect::<std::result::Result<Vec<_>, _>>()?,
                    None => vec![choice.scalar_to_string().ok_or_else(|| {
                        ValidationError::new(choice.pos, "any_of expects attribute ids", None)
                    })?],
                };
                choice_list_ids.push(ids);
                choice_positions.push(choice.pos);
            }
            constraints.push(Constraint::AnyOf(AnyOf::new(
                choice_list_ids,
                choice_positions,
            )));
        }
    }

    Ok(constraints)
}
