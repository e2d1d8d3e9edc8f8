//! Semantic attribute model.
//!
//! Parses one YAML attribute declaration into an [`Attribute`] record and
//! validates types, examples, requirement levels, and the stability /
//! deprecation coupling. Produces a mapping of fully-qualified name to
//! attribute, keyed in declaration order.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::doc::{Mapping, Node, Pos, Scalar, Value};
use crate::error::{Result, ValidationError};
use crate::validation::{check_no_missing_keys, validate_id, validate_keys, ValidationContext};

const ALLOWED_KEYS: &[&str] = &[
    "id",
    "type",
    "brief",
    "examples",
    "ref",
    "tag",
    "deprecated",
    "stability",
    "requirement_level",
    "sampling_relevant",
    "note",
];

/// Stability of an attribute or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Experimental,
    Deprecated,
}

impl Stability {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stable" => Some(Stability::Stable),
            "experimental" => Some(Stability::Experimental),
            "deprecated" => Some(Stability::Deprecated),
            _ => None,
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stability::Stable => write!(f, "stable"),
            Stability::Experimental => write!(f, "experimental"),
            Stability::Deprecated => write!(f, "deprecated"),
        }
    }
}

/// How strongly an attribute is required on its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementLevel {
    Required,
    ConditionallyRequired,
    Recommended,
    OptIn,
}

impl RequirementLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "required" => Some(RequirementLevel::Required),
            "conditionally_required" => Some(RequirementLevel::ConditionallyRequired),
            "recommended" => Some(RequirementLevel::Recommended),
            "opt_in" => Some(RequirementLevel::OptIn),
            _ => None,
        }
    }
}

/// The eight scalar/array primitive type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimitiveType {
    String,
    Int,
    Double,
    Boolean,
    Strings,
    Ints,
    Doubles,
    Booleans,
}

impl PrimitiveType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(PrimitiveType::String),
            "int" => Some(PrimitiveType::Int),
            "double" => Some(PrimitiveType::Double),
            "boolean" => Some(PrimitiveType::Boolean),
            "string[]" => Some(PrimitiveType::Strings),
            "int[]" => Some(PrimitiveType::Ints),
            "double[]" => Some(PrimitiveType::Doubles),
            "boolean[]" => Some(PrimitiveType::Booleans),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Strings
                | PrimitiveType::Ints
                | PrimitiveType::Doubles
                | PrimitiveType::Booleans
        )
    }

    /// The scalar type of a single value, i.e. the element type for arrays.
    pub fn element(&self) -> PrimitiveType {
        match self {
            PrimitiveType::Strings => PrimitiveType::String,
            PrimitiveType::Ints => PrimitiveType::Int,
            PrimitiveType::Doubles => PrimitiveType::Double,
            PrimitiveType::Booleans => PrimitiveType::Boolean,
            other => *other,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::String => "string",
            PrimitiveType::Int => "int",
            PrimitiveType::Double => "double",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Strings => "string[]",
            PrimitiveType::Ints => "int[]",
            PrimitiveType::Doubles => "double[]",
            PrimitiveType::Booleans => "boolean[]",
        };
        write!(f, "{}", name)
    }
}

/// The value type shared by all members of one enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumValueType {
    String,
    Int,
}

impl fmt::Display for EnumValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValueType::String => write!(f, "string"),
            EnumValueType::Int => write!(f, "int"),
        }
    }
}

/// One enum member value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnumValue {
    Int(i64),
    String(String),
}

impl EnumValue {
    pub fn value_type(&self) -> EnumValueType {
        match self {
            EnumValue::Int(_) => EnumValueType::Int,
            EnumValue::String(_) => EnumValueType::String,
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::Int(i) => write!(f, "{}", i),
            EnumValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// One member of an enum attribute type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub id: String,
    pub value: EnumValue,
    pub brief: String,
    pub note: String,
    pub stability: Option<Stability>,
    pub deprecated: Option<String>,
}

/// An enumeration attribute type with its ordered members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumType {
    pub allow_custom_values: bool,
    pub members: Vec<EnumMember>,
    pub value_type: EnumValueType,
}

/// The type of an attribute: primitive, template, or enum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Primitive(PrimitiveType),
    Template(PrimitiveType),
    Enum(EnumType),
}

impl AttributeType {
    pub fn is_enum(&self) -> bool {
        matches!(self, AttributeType::Enum(_))
    }

    pub fn is_template(&self) -> bool {
        matches!(self, AttributeType::Template(_))
    }

    /// Parse a `type:` node. A scalar is a primitive tag or a
    /// `template[<primitive>]` wrapper; a mapping declares an enum.
    pub fn parse(node: &Node, ctx: &ValidationContext) -> Result<Self> {
        match &node.value {
            Value::Scalar(Scalar::String(tag)) => {
                if let Some(primitive) = PrimitiveType::parse(tag) {
                    return Ok(AttributeType::Primitive(primitive));
                }
                if let Some(inner) = tag
                    .strip_prefix("template[")
                    .and_then(|rest| rest.strip_suffix(']'))
                {
                    if let Some(primitive) = PrimitiveType::parse(inner) {
                        return Ok(AttributeType::Template(primitive));
                    }
                }
                Err(ValidationError::new(
                    node.pos,
                    format!("Invalid type: {} is not allowed", tag),
                    None,
                )
                .into())
            }
            Value::Map(map) => Self::parse_enum(map, node.pos, ctx),
            _ => Err(ValidationError::new(
                node.pos,
                "Invalid type: expected a type name or an enum declaration",
                None,
            )
            .into()),
        }
    }

    fn parse_enum(map: &Mapping, pos: Pos, ctx: &ValidationContext) -> Result<Self> {
        validate_keys(map, pos, &["allow_custom_values", "members"], ctx)?;
        check_no_missing_keys(map, pos, &["members"], ctx)?;
        let allow_custom_values = map
            .get("allow_custom_values")
            .and_then(Node::as_bool)
            .unwrap_or(false);

        let members_node = map.get("members");
        let members_pos = map.key_pos("members").unwrap_or(pos);
        let member_nodes = match members_node.and_then(Node::as_seq) {
            Some(nodes) if !nodes.is_empty() => nodes,
            _ => {
                return Err(ValidationError::new(
                    members_pos,
                    "Enumeration without members!",
                    None,
                )
                .into())
            }
        };

        let mut members = Vec::with_capacity(member_nodes.len());
        for member_node in member_nodes {
            members.push(Self::parse_member(member_node, ctx)?);
        }

        let value_type = members[0].value.value_type();
        for (member_node, member) in member_nodes.iter().zip(&members) {
            if member.value.value_type() != value_type {
                let pos = member_node
                    .as_map()
                    .and_then(|m| m.key_pos("value"))
                    .unwrap_or(member_node.pos);
                return Err(ValidationError::new(
                    pos,
                    format!("Enumeration member does not have type {}!", value_type),
                    Some(&member.id),
                )
                .into());
            }
        }

        Ok(AttributeType::Enum(EnumType {
            allow_custom_values,
            members,
            value_type,
        }))
    }

    fn parse_member(node: &Node, ctx: &ValidationContext) -> Result<EnumMember> {
        let map = node.as_map().ok_or_else(|| {
            ValidationError::new(node.pos, "Enum member must be a mapping", None)
        })?;
        validate_keys(
            map,
            node.pos,
            &["id", "value", "brief", "note", "stability", "deprecated"],
            ctx,
        )?;
        check_no_missing_keys(map, node.pos, &["id", "value"], ctx)?;

        let id = map
            .get("id")
            .and_then(|n| n.scalar_to_string())
            .unwrap_or_default();
        validate_id(&id, map.key_pos("id").unwrap_or(node.pos), ctx)?;

        let value_node = map.get("value");
        let value_pos = map.key_pos("value").unwrap_or(node.pos);
        let value = match value_node.map(|n| &n.value) {
            Some(Value::Scalar(Scalar::Int(i))) => EnumValue::Int(*i),
            Some(Value::Scalar(Scalar::String(s))) => EnumValue::String(s.clone()),
            other => {
                let rendered = match other {
                    Some(Value::Scalar(s)) => s.to_string(),
                    _ => String::new(),
                };
                return Err(ValidationError::new(
                    value_pos,
                    format!("Invalid value used in enum: <{}>", rendered),
                    Some(&id),
                )
                .into());
            }
        };

        let (stability, deprecated) = parse_stability_deprecated(map, node.pos, ctx)?;

        Ok(EnumMember {
            brief: map
                .get("brief")
                .and_then(|n| n.scalar_to_string())
                .map(|s| s.trim().to_owned())
                .unwrap_or_else(|| id.clone()),
            note: map
                .get("note")
                .and_then(|n| n.scalar_to_string())
                .map(|s| s.trim().to_owned())
                .unwrap_or_default(),
            id,
            value,
            stability,
            deprecated,
        })
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Primitive(p) => write!(f, "{}", p),
            AttributeType::Template(p) => write!(f, "template[{}]", p),
            AttributeType::Enum(e) => write!(f, "{}", e.value_type),
        }
    }
}

/// One example value, shape-checked against the declared attribute type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Example {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Seq(Vec<Example>),
}

impl fmt::Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Example::Bool(b) => write!(f, "{}", b),
            Example::Int(i) => write!(f, "{}", i),
            Example::Double(d) => write!(f, "{}", d),
            Example::String(s) => write!(f, "{}", s),
            Example::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A semantic attribute. Identity is the fully-qualified name.
///
/// At parse time exactly one of `attr_id` and `reference` is set; after
/// reference resolution both are populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub fqn: String,
    pub attr_id: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub attr_type: Option<AttributeType>,
    pub brief: String,
    pub examples: Option<Vec<Example>>,
    pub tag: String,
    pub stability: Stability,
    pub deprecated: Option<String>,
    pub requirement_level: Option<RequirementLevel>,
    pub requirement_level_msg: String,
    pub sampling_relevant: bool,
    pub note: String,
    #[serde(skip)]
    pub position: Pos,
    pub inherited: bool,
    pub imported: bool,
}

impl Attribute {
    /// A flagged copy for propagation into an including group.
    pub fn import_attribute(&self) -> Attribute {
        Attribute {
            imported: true,
            ..self.clone()
        }
    }

    /// A flagged copy for propagation into an extending group.
    pub fn inherit_attribute(&self) -> Attribute {
        Attribute {
            inherited: true,
            ..self.clone()
        }
    }

    /// Declared in the owning group rather than pulled in via
    /// `include`/`extends`.
    pub fn is_local(&self) -> bool {
        !self.imported && !self.inherited
    }

    pub fn is_enum(&self) -> bool {
        self.attr_type.as_ref().is_some_and(AttributeType::is_enum)
    }

    pub fn is_template(&self) -> bool {
        self.attr_type
            .as_ref()
            .is_some_and(AttributeType::is_template)
    }

    /// Identity for dedup during include-merges: fqn when this attribute
    /// carries a local id, full value equality otherwise.
    pub fn equivalent_to(&self, other: &Attribute) -> bool {
        if self.attr_id.is_some() {
            self.fqn == other.fqn
        } else {
            self == other
        }
    }
}

/// Parse the `attributes:` sequence of one group into a mapping of fqn to
/// attribute. `prefix` namespaces locally-declared ids; `group_stability`
/// is the fallback stability for attributes that declare none.
pub fn parse_attributes(
    prefix: &str,
    group_stability: Option<Stability>,
    node: Option<&Node>,
    ctx: &ValidationContext,
) -> Result<IndexMap<String, Attribute>> {
    let mut attributes: IndexMap<String, Attribute> = IndexMap::new();
    let Some(node) = node else {
        return Ok(attributes);
    };
    let nodes = node.as_seq().ok_or_else(|| {
        ValidationError::new(node.pos, "attributes must be a sequence", None)
    })?;

    for attr_node in nodes {
        let map = attr_node.as_map().ok_or_else(|| {
            ValidationError::new(attr_node.pos, "attribute must be a mapping", None)
        })?;
        validate_keys(map, attr_node.pos, ALLOWED_KEYS, ctx)?;
        let position = map.first_key_pos().unwrap_or(attr_node.pos);

        let attr_id = map.get("id").and_then(|n| n.scalar_to_string());
        let reference = map
            .get("ref")
            .and_then(|n| n.scalar_to_string())
            .map(|s| s.trim().to_owned());

        let (fqn, attr_type, brief, examples) = match (&attr_id, &reference) {
            (None, None) => {
                return Err(ValidationError::new(
                    position,
                    "At least one of id or ref is required.",
                    None,
                )
                .into())
            }
            (Some(id), _) => {
                validate_id(id, map.key_pos("id").unwrap_or(position), ctx)?;
                let (attr_type, brief, examples) = parse_declaration(map, position, ctx)?;
                let fqn = if prefix.is_empty() {
                    id.clone()
                } else {
                    format!("{}.{}", prefix, id)
                };
                (fqn, Some(attr_type), brief, examples)
            }
            (None, Some(reference)) => {
                if map.contains_key("type") {
                    return Err(ValidationError::new(
                        position,
                        format!("Ref attribute '{}' must not declare a type", reference),
                        Some(reference),
                    )
                    .into());
                }
                if map.contains_key("stability") {
                    return Err(ValidationError::new(
                        position,
                        format!(
                            "Ref attribute '{}' must not override stability",
                            reference
                        ),
                        Some(reference),
                    )
                    .into());
                }
                let brief = map
                    .get("brief")
                    .and_then(|n| n.scalar_to_string())
                    .unwrap_or_default();
                let examples = match map.get("examples") {
                    Some(node) => Some(parse_examples(node)?),
                    None => None,
                };
                (reference.clone(), None, brief, examples)
            }
        };

        let (requirement_level, requirement_level_msg) =
            parse_requirement_level(map, attr_node.pos)?;

        let (stability, deprecated) = parse_stability_deprecated(map, position, ctx)?;
        if group_stability == Some(Stability::Deprecated)
            && stability.is_some()
            && stability != Some(Stability::Deprecated)
        {
            let pos = map
                .key_pos("stability")
                .or_else(|| map.key_pos("deprecated"))
                .unwrap_or(position);
            return Err(ValidationError::new(
                pos,
                format!(
                    "Semantic convention stability set to deprecated but attribute '{}' is {}",
                    attr_id.as_deref().unwrap_or(&fqn),
                    stability.map(|s| s.to_string()).unwrap_or_default()
                ),
                Some(&fqn),
            )
            .into());
        }
        let stability = stability.or(group_stability).unwrap_or(Stability::Stable);

        let sampling_relevant = match map.get("sampling_relevant") {
            Some(node) => to_bool("sampling_relevant", node, map, position)?,
            None => false,
        };

        let attribute = Attribute {
            fqn: fqn.trim().to_owned(),
            attr_id,
            reference,
            attr_type,
            brief: brief.trim().to_owned(),
            examples,
            tag: map
                .get("tag")
                .and_then(|n| n.scalar_to_string())
                .map(|s| s.trim().to_owned())
                .unwrap_or_default(),
            stability,
            deprecated,
            requirement_level,
            requirement_level_msg,
            sampling_relevant,
            note: map
                .get("note")
                .and_then(|n| n.scalar_to_string())
                .map(|s| s.trim().to_owned())
                .unwrap_or_default(),
            position,
            inherited: false,
            imported: false,
        };

        if let Some(existing) = attributes.get(&attribute.fqn) {
            return Err(ValidationError::new(
                position,
                format!(
                    "Attribute id {} is already present at line {}",
                    attribute.fqn, existing.position.line
                ),
                Some(&attribute.fqn),
            )
            .into());
        }
        attributes.insert(attribute.fqn.clone(), attribute);
    }

    Ok(attributes)
}

/// Parse the type/brief/examples triple of a locally-declared attribute.
fn parse_declaration(
    map: &Mapping,
    position: Pos,
    ctx: &ValidationContext,
) -> Result<(AttributeType, String, Option<Vec<Example>>)> {
    check_no_missing_keys(map, position, &["type", "brief"], ctx)?;

    let type_node = map.get("type").ok_or_else(|| {
        ValidationError::new(position, "Missing keys: [type]", None)
    })?;
    let attr_type = AttributeType::parse(type_node, ctx)?;
    let brief = map
        .get("brief")
        .and_then(|n| n.scalar_to_string())
        .unwrap_or_default();

    let examples_node = map.get("examples");
    if let AttributeType::Primitive(primitive) = &attr_type {
        if primitive.is_array() {
            if let Some(node) = examples_node {
                if node.as_seq().is_none() {
                    return Err(ValidationError::new(
                        position,
                        format!("Non array examples for {} are not allowed", primitive),
                        None,
                    )
                    .into());
                }
            }
        }
        let needs_examples = matches!(
            primitive.element(),
            PrimitiveType::String
        );
        if needs_examples
            && examples_node
                .and_then(Node::as_seq)
                .map_or(examples_node.is_none(), <[Node]>::is_empty)
        {
            return Err(ValidationError::new(
                position,
                format!("Empty examples for {} are not allowed", primitive),
                None,
            )
            .into());
        }
        if let Some(node) = examples_node {
            check_examples_type(*primitive, node)?;
        }
    }

    let examples = match examples_node {
        Some(node) => Some(parse_examples(node)?),
        None => None,
    };
    Ok((attr_type, brief, examples))
}

/// Convert an examples node to values; a bare scalar becomes a one-element
/// list.
fn parse_examples(node: &Node) -> Result<Vec<Example>> {
    match node.as_seq() {
        Some(items) => items.iter().map(example_value).collect(),
        None => Ok(vec![example_value(node)?]),
    }
}

fn example_value(node: &Node) -> Result<Example> {
    match &node.value {
        Value::Scalar(Scalar::Bool(b)) => Ok(Example::Bool(*b)),
        Value::Scalar(Scalar::Int(i)) => Ok(Example::Int(*i)),
        Value::Scalar(Scalar::Double(d)) => Ok(Example::Double(*d)),
        Value::Scalar(Scalar::String(s)) => Ok(Example::String(s.clone())),
        Value::Seq(items) => Ok(Example::Seq(
            items.iter().map(example_value).collect::<Result<_>>()?,
        )),
        _ => Err(ValidationError::new(node.pos, "Invalid example value", None).into()),
    }
}

/// Check every example's runtime type against the declared attribute type,
/// reporting mismatches at the offending example's own position.
fn check_examples_type(primitive: PrimitiveType, examples: &Node) -> Result<()> {
    let element = primitive.element();
    let nodes: Vec<&Node> = match examples.as_seq() {
        Some(items) => items.iter().collect(),
        None => vec![examples],
    };
    for node in nodes {
        match (&node.value, primitive.is_array()) {
            // Multi-array example: check each element.
            (Value::Seq(items), true) => {
                for item in items {
                    check_example_scalar(element, primitive, item)?;
                }
            }
            _ => check_example_scalar(element, primitive, node)?,
        }
    }
    Ok(())
}

fn check_example_scalar(element: PrimitiveType, declared: PrimitiveType, node: &Node) -> Result<()> {
    let matches = matches!(
        (&node.value, element),
        (Value::Scalar(Scalar::Bool(_)), PrimitiveType::Boolean)
            | (Value::Scalar(Scalar::Int(_)), PrimitiveType::Int)
            | (Value::Scalar(Scalar::Double(_)), PrimitiveType::Double)
            | (Value::Scalar(Scalar::String(_)), PrimitiveType::String)
    );
    if !matches {
        return Err(ValidationError::new(
            node.pos,
            format!(
                "Example with wrong type. Expected {} examples but found '{}'.",
                declared,
                match &node.value {
                    Value::Scalar(s) => s.to_string(),
                    _ => "a non-scalar value".to_owned(),
                }
            ),
            None,
        )
        .into());
    }
    Ok(())
}

/// Parse `requirement_level`, which is either a plain level name or a
/// one-entry mapping attaching a message to `recommended` /
/// `conditionally_required`.
fn parse_requirement_level(
    map: &Mapping,
    node_pos: Pos,
) -> Result<(Option<RequirementLevel>, String)> {
    let Some(node) = map.get("requirement_level") else {
        return Ok((None, String::new()));
    };
    let pos = map.key_pos("requirement_level").unwrap_or(node_pos);

    match &node.value {
        Value::Map(level_map) => {
            if level_map.len() != 1 {
                return Err(ValidationError::new(
                    pos,
                    "Multiple requirement_level values are not allowed!",
                    None,
                )
                .into());
            }
            let message = |key: &str| {
                level_map
                    .get(key)
                    .and_then(|n| n.scalar_to_string())
                    .map(|s| s.trim().to_owned())
            };
            if let Some(msg) = message("conditionally_required") {
                if msg.is_empty() {
                    return Err(ValidationError::new(
                        pos,
                        "Missing message for conditionally required field!",
                        None,
                    )
                    .into());
                }
                return Ok((Some(RequirementLevel::ConditionallyRequired), msg));
            }
            if let Some(msg) = message("recommended") {
                return Ok((Some(RequirementLevel::Recommended), msg));
            }
            Err(ValidationError::new(
                pos,
                format!(
                    "Value '{}' for required field is not allowed",
                    level_map.keys().next().unwrap_or_default()
                ),
                None,
            )
            .into())
        }
        Value::Scalar(scalar) => {
            let raw = scalar.to_string();
            match RequirementLevel::parse(&raw) {
                Some(RequirementLevel::ConditionallyRequired) => Err(ValidationError::new(
                    pos,
                    "Missing message for conditionally required field!",
                    None,
                )
                .into()),
                Some(level) => Ok((Some(level), String::new())),
                None => Err(ValidationError::new(
                    pos,
                    format!("Value '{}' for required field is not allowed", raw),
                    None,
                )
                .into()),
            }
        }
        Value::Seq(_) => Err(ValidationError::new(
            pos,
            "Multiple requirement_level values are not allowed!",
            None,
        )
        .into()),
    }
}

/// Parse the coupled `stability`/`deprecated` pair of a node.
///
/// A deprecation message without explicit stability forces stability to
/// deprecated; a deprecation message with a conflicting explicit stability
/// is an error.
pub fn parse_stability_deprecated(
    map: &Mapping,
    node_pos: Pos,
    _ctx: &ValidationContext,
) -> Result<(Option<Stability>, Option<String>)> {
    let stability_node = map.get("stability");
    let deprecated_node = map.get("deprecated");
    let stability_pos = map
        .key_pos("stability")
        .or_else(|| map.key_pos("deprecated"))
        .unwrap_or(node_pos);

    let mut deprecated = None;
    if let Some(node) = deprecated_node {
        let deprecated_pos = map.key_pos("deprecated").unwrap_or(node_pos);
        let message = node.as_str().map(str::trim).unwrap_or_default();
        if message.is_empty() {
            return Err(ValidationError::new(
                deprecated_pos,
                "Deprecated field expects a string that specifies why the attribute is \
                 deprecated and/or what to use instead!",
                None,
            )
            .into());
        }
        if let Some(stability) = stability_node.and_then(|n| n.scalar_to_string()) {
            if stability != "deprecated" {
                return Err(ValidationError::new(
                    deprecated_pos,
                    format!(
                        "There is a deprecation message but the stability is set to '{}'",
                        stability
                    ),
                    None,
                )
                .into());
            }
        }
        deprecated = Some(message.to_owned());
    }

    let mut stability = None;
    if let Some(node) = stability_node {
        let raw = node.scalar_to_string().unwrap_or_default();
        stability = Some(Stability::parse(&raw).ok_or_else(|| {
            ValidationError::new(
                stability_pos,
                format!("Value '{}' is not allowed as a stability marker", raw),
                None,
            )
        })?);
    } else if deprecated.is_some() {
        stability = Some(Stability::Deprecated);
    }

    Ok((stability, deprecated))
}

/// A YAML boolean, rejecting everything the YAML 1.1 grammar does not
/// recognize.
fn to_bool(key: &str, node: &Node, map: &Mapping, node_pos: Pos) -> Result<bool> {
    if let Some(b) = node.as_bool() {
        return Ok(b);
    }
    let pos = map.key_pos(key).unwrap_or(node_pos);
    Err(ValidationError::new(
        pos,
        format!(
            "Value '{}' for {} field is not allowed",
            node.scalar_to_string().unwrap_or_default(),
            key
        ),
        None,
    )
    .into())
}
