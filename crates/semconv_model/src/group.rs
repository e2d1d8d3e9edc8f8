//! Semantic convention groups.
//!
//! A group is one entry of the top-level `groups:` sequence. The group
//! type drives which keys are allowed and which extra fields are carried;
//! the variants live in [`GroupKind`] so dispatch is explicit.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::attribute::{
    parse_attributes, parse_stability_deprecated, Attribute, Stability,
};
use crate::constraints::{parse_constraints, AnyOf, Constraint};
use crate::doc::{Mapping, Node, Pos};
use crate::error::{Result, ValidationError};
use crate::validation::{check_no_missing_keys, validate_id, validate_keys, ValidationContext};

const BASE_ALLOWED_KEYS: &[&str] = &[
    "id",
    "type",
    "brief",
    "note",
    "prefix",
    "stability",
    "deprecated",
    "extends",
    "attributes",
    "constraints",
];

const SPAN_EXTRA_KEYS: &[&str] = &["events", "span_kind"];
const EVENT_EXTRA_KEYS: &[&str] = &["name"];
const METRIC_EXTRA_KEYS: &[&str] = &["metric_name", "unit", "instrument"];
const UNITS_ALLOWED_KEYS: &[&str] = &["id", "type", "brief", "members"];

/// The kind of span a span group describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Empty,
    Client,
    Server,
    Producer,
    Consumer,
    Internal,
}

impl SpanKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "client" => Some(SpanKind::Client),
            "server" => Some(SpanKind::Server),
            "producer" => Some(SpanKind::Producer),
            "consumer" => Some(SpanKind::Consumer),
            "internal" => Some(SpanKind::Internal),
            _ => None,
        }
    }
}

/// A metric instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Counter,
    UpDownCounter,
    Histogram,
    Gauge,
}

impl Instrument {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "counter" => Some(Instrument::Counter),
            "updowncounter" => Some(Instrument::UpDownCounter),
            "histogram" => Some(Instrument::Histogram),
            "gauge" => Some(Instrument::Gauge),
            _ => None,
        }
    }

    /// The API-level instrument name.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Instrument::Counter => "Counter",
            Instrument::UpDownCounter => "UpDownCounter",
            Instrument::Histogram => "Histogram",
            Instrument::Gauge => "Gauge",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::Counter => write!(f, "counter"),
            Instrument::UpDownCounter => write!(f, "updowncounter"),
            Instrument::Histogram => write!(f, "histogram"),
            Instrument::Gauge => write!(f, "gauge"),
        }
    }
}

/// One entry of a units group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitMember {
    pub id: String,
    pub brief: String,
    pub value: String,
    #[serde(skip)]
    pub position: Pos,
}

impl UnitMember {
    fn parse(node: Option<&Node>, ctx: &ValidationContext) -> Result<IndexMap<String, UnitMember>> {
        let mut members = IndexMap::new();
        let Some(node) = node else {
            return Ok(members);
        };
        let nodes = node.as_seq().ok_or_else(|| {
            ValidationError::new(node.pos, "members must be a sequence", None)
        })?;
        for member_node in nodes {
            let map = member_node.as_map().ok_or_else(|| {
                ValidationError::new(member_node.pos, "unit member must be a mapping", None)
            })?;
            validate_keys(map, member_node.pos, &["id", "brief", "value"], ctx)?;
            check_no_missing_keys(map, member_node.pos, &["id", "brief", "value"], ctx)?;
            let member = UnitMember {
                id: map
                    .get("id")
                    .and_then(|n| n.scalar_to_string())
                    .map(|s| s.trim().to_owned())
                    .unwrap_or_default(),
                brief: map
                    .get("brief")
                    .and_then(|n| n.scalar_to_string())
                    .map(|s| s.trim().to_owned())
                    .unwrap_or_default(),
                value: map
                    .get("value")
                    .and_then(|n| n.scalar_to_string())
                    .unwrap_or_default(),
                position: map.first_key_pos().unwrap_or(member_node.pos),
            };
            validate_id(&member.id, member.position, ctx)?;
            members.insert(member.id.clone(), member);
        }
        Ok(members)
    }
}

/// Group-type specific payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum GroupKind {
    AttributeGroup,
    Span {
        span_kind: SpanKind,
    },
    Event {
        name: String,
    },
    Metric {
        metric_name: String,
        unit: String,
        instrument: Instrument,
    },
    MetricGroup,
    Resource,
    Scope,
    Units {
        members: IndexMap<String, UnitMember>,
    },
}

impl GroupKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            GroupKind::AttributeGroup => "attribute_group",
            GroupKind::Span { .. } => "span",
            GroupKind::Event { .. } => "event",
            GroupKind::Metric { .. } => "metric",
            GroupKind::MetricGroup => "metric_group",
            GroupKind::Resource => "resource",
            GroupKind::Scope => "scope",
            GroupKind::Units { .. } => "units",
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self, GroupKind::Event { .. })
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, GroupKind::Metric { .. })
    }
}

/// A parsed semantic convention group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub semconv_id: String,
    pub kind: GroupKind,
    pub brief: String,
    pub note: String,
    pub prefix: String,
    pub stability: Option<Stability>,
    pub deprecated: Option<String>,
    pub extends: String,
    /// Event group ids attached to a span group, validated at resolution.
    pub events: Vec<String>,
    pub constraints: Vec<Constraint>,
    pub attrs_by_name: IndexMap<String, Attribute>,
    #[serde(skip)]
    pub position: Pos,
}

impl Group {
    /// Non-template attributes, sorted by fully-qualified name.
    pub fn attributes(&self) -> Vec<&Attribute> {
        self.select_attributes(Some(false))
    }

    /// Template attributes, sorted by fully-qualified name.
    pub fn attribute_templates(&self) -> Vec<&Attribute> {
        self.select_attributes(Some(true))
    }

    /// All attributes, sorted by fully-qualified name.
    pub fn attributes_and_templates(&self) -> Vec<&Attribute> {
        self.select_attributes(None)
    }

    fn select_attributes(&self, templates: Option<bool>) -> Vec<&Attribute> {
        let mut attrs: Vec<&Attribute> = self
            .attrs_by_name
            .values()
            .filter(|attr| templates.map_or(true, |t| t == attr.is_template()))
            .collect();
        attrs.sort_by(|a, b| a.fqn.cmp(&b.fqn));
        attrs
    }

    /// Whether an equivalent attribute is already part of this group.
    pub fn contains_attribute(&self, attr: &Attribute) -> bool {
        self.attrs_by_name
            .values()
            .any(|local| local.equivalent_to(attr))
    }

    /// Whether the attribute takes part in any resolved `any_of` choice set.
    pub fn has_attribute_constraint(&self, attr: &Attribute) -> bool {
        self.any_of_constraints().any(|any_of| {
            any_of
                .choice_list_attributes
                .iter()
                .flatten()
                .any(|candidate| candidate.equivalent_to(attr))
        })
    }

    pub fn any_of_constraints(&self) -> impl Iterator<Item = &AnyOf> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::AnyOf(any_of) => Some(any_of),
            _ => None,
        })
    }
}

/// Parse a whole conventions document: a mapping with a `groups:` sequence.
pub fn parse_groups(node: &Node, ctx: &ValidationContext) -> Result<Vec<Group>> {
    let map = node.as_map().ok_or_else(|| {
        ValidationError::new(node.pos, "conventions document must be a mapping", None)
    })?;
    let groups_node = map.get("groups").ok_or_else(|| {
        ValidationError::new(node.pos, "Missing keys: [groups]", None)
    })?;
    let group_nodes = groups_node.as_seq().ok_or_else(|| {
        ValidationError::new(groups_node.pos, "groups must be a sequence", None)
    })?;

    let mut groups = Vec::with_capacity(group_nodes.len());
    for group_node in group_nodes {
        groups.push(parse_group(group_node, ctx)?);
    }
    Ok(groups)
}

fn parse_group(node: &Node, ctx: &ValidationContext) -> Result<Group> {
    let map = node.as_map().ok_or_else(|| {
        ValidationError::new(node.pos, "group must be a mapping", None)
    })?;
    let position = map.first_key_pos().unwrap_or(node.pos);
    let id = map
        .get("id")
        .and_then(|n| n.scalar_to_string())
        .map(|s| s.trim().to_owned())
        .unwrap_or_default();

    let type_value = map.get("type").and_then(|n| n.scalar_to_string());
    if type_value.is_none() {
        warn!(
            "Please set the type for group '{}' on line {} - defaulting to type 'span'",
            id,
            map.key_pos("id").map(|p| p.line).unwrap_or(position.line)
        );
    }
    let type_name = type_value.as_deref().unwrap_or("span");

    let extra_keys: &[&str] = match type_name {
        "span" => SPAN_EXTRA_KEYS,
        "event" => EVENT_EXTRA_KEYS,
        "metric" => METRIC_EXTRA_KEYS,
        "attribute_group" | "metric_group" | "resource" | "scope" => &[],
        "units" => {
            validate_keys(map, position, UNITS_ALLOWED_KEYS, ctx)?;
            check_no_missing_keys(map, position, &["id", "brief"], ctx)?;
            let members = UnitMember::parse(map.get("members"), ctx)?;
            validate_id(&id, position, ctx)?;
            return Ok(Group {
                semconv_id: id,
                kind: GroupKind::Units { members },
                brief: map
                    .get("brief")
                    .and_then(|n| n.scalar_to_string())
                    .map(|s| s.trim().to_owned())
                    .unwrap_or_default(),
                note: String::new(),
                prefix: String::new(),
                stability: None,
                deprecated: None,
                extends: String::new(),
                events: Vec::new(),
                constraints: Vec::new(),
                attrs_by_name: IndexMap::new(),
                position,
            });
        }
        other => {
            let pos = map
                .key_pos("type")
                .or_else(|| map.key_pos("id"))
                .unwrap_or(position);
            return Err(ValidationError::new(
                pos,
                format!("Invalid value for semantic convention type: {}", other),
                Some(&id),
            )
            .into());
        }
    };

    let allowed: Vec<&str> = BASE_ALLOWED_KEYS
        .iter()
        .chain(extra_keys)
        .copied()
        .collect();
    validate_keys(map, position, &allowed, ctx)?;
    check_no_missing_keys(map, position, &["id", "brief"], ctx)?;
    validate_id(&id, position, ctx)?;

    let prefix = map
        .get("prefix")
        .and_then(|n| n.scalar_to_string())
        .map(|s| s.trim().to_owned())
        .unwrap_or_default();
    if !prefix.is_empty() {
        validate_id(&prefix, position, ctx)?;
    }

    let (stability, deprecated) = parse_stability_deprecated(map, position, ctx)?;
    let attrs_by_name = parse_attributes(&prefix, stability, map.get("attributes"), ctx)?;
    let constraints = parse_constraints(map.get("constraints"), ctx)?;

    let kind = match type_name {
        "span" => parse_span_kind(map, position, &id)?,
        "event" => {
            let name = map
                .get("name")
                .and_then(|n| n.scalar_to_string())
                .unwrap_or_else(|| prefix.clone());
            if name.is_empty() {
                return Err(ValidationError::new(
                    position,
                    "Event must define at least one of name or prefix",
                    Some(&id),
                )
                .into());
            }
            GroupKind::Event { name }
        }
        "metric" => parse_metric(map, position, &id)?,
        "metric_group" => GroupKind::MetricGroup,
        "attribute_group" => GroupKind::AttributeGroup,
        "resource" => GroupKind::Resource,
        "scope" => GroupKind::Scope,
        _ => unreachable!("group type validated above"),
    };

    let events = match map.get("events") {
        Some(events_node) => {
            let nodes = events_node.as_seq().ok_or_else(|| {
                ValidationError::new(events_node.pos, "events must be a sequence", Some(&id))
            })?;
            nodes
                .iter()
                .map(|n| {
                    n.scalar_to_string().ok_or_else(|| {
                        ValidationError::new(n.pos, "events expects group ids", Some(&id)).into()
                    })
                })
                .collect::<Result<Vec<String>>>()?
        }
        None => Vec::new(),
    };

    Ok(Group {
        semconv_id: id,
        kind,
        brief: map
            .get("brief")
            .and_then(|n| n.scalar_to_string())
            .map(|s| s.trim().to_owned())
            .unwrap_or_default(),
        note: map
            .get("note")
            .and_then(|n| n.scalar_to_string())
            .map(|s| s.trim().to_owned())
            .unwrap_or_default(),
        prefix,
        stability,
        deprecated,
        extends: map
            .get("extends")
            .and_then(|n| n.scalar_to_string())
            .map(|s| s.trim().to_owned())
            .unwrap_or_default(),
        events,
        constraints,
        attrs_by_name,
        position,
    })
}

fn parse_span_kind(map: &Mapping, position: Pos, id: &str) -> Result<GroupKind> {
    let span_kind = match map.get("span_kind").and_then(|n| n.scalar_to_string()) {
        None => SpanKind::Empty,
        Some(raw) => SpanKind::parse(&raw).ok_or_else(|| {
            ValidationError::new(
                map.key_pos("span_kind").unwrap_or(position),
                format!("Invalid value for span_kind: {}", raw),
                Some(id),
            )
        })?,
    };
    Ok(GroupKind::Span { span_kind })
}

fn parse_metric(map: &Mapping, position: Pos, id: &str) -> Result<GroupKind> {
    let metric_name = map.get("metric_name").and_then(|n| n.scalar_to_string());
    let unit = map.get("unit").and_then(|n| n.scalar_to_string());
    let instrument_raw = map.get("instrument").and_then(|n| n.scalar_to_string());
    let (Some(metric_name), Some(unit), Some(instrument_raw)) =
        (metric_name, unit, instrument_raw)
    else {
        return Err(ValidationError::new(
            position,
            "All of metric_name, units, and instrument must be defined",
            Some(id),
        )
        .into());
    };
    let instrument = Instrument::parse(&instrument_raw).ok_or_else(|| {
        ValidationError::new(
            map.key_pos("instrument").unwrap_or(position),
            format!("Instrument '{}' is not a valid instrument name", instrument_raw),
            Some(id),
        )
    })?;
    Ok(GroupKind::Metric {
        metric_name,
        unit,
        instrument,
    })
}
