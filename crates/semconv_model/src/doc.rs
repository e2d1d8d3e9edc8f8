//! Position-carrying YAML document abstraction.
//!
//! Every scalar, sequence, mapping, and mapping key keeps the 1-indexed
//! line/column it was read from, so validation errors anywhere in the model
//! can point back at the offending YAML source.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::error::{Error, Result, ValidationError};

/// YAML 1.1 boolean literals, as accepted by the conventions format.
pub static BOOL_TRUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^(y|Y|yes|Yes|YES|true|True|TRUE|on|On|ON)$").unwrap());
pub static BOOL_FALSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^(n|N|no|No|NO|false|False|FALSE|off|Off|OFF)$").unwrap());

/// A 1-indexed source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    fn from_marker(marker: Marker) -> Self {
        // The scanner reports 1-based lines and 0-based columns.
        Self {
            line: marker.line(),
            col: marker.col() + 1,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A typed YAML scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Double(d) => write!(f, "{}", d),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

/// A YAML node together with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub pos: Pos,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Seq(Vec<Node>),
    Map(Mapping),
}

impl Node {
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Render any scalar as a string (YAML briefs are occasionally typed
    /// as numbers or booleans by the parser).
    pub fn scalar_to_string(&self) -> Option<String> {
        match &self.value {
            Value::Scalar(Scalar::Null) => None,
            Value::Scalar(s) => Some(s.to_string()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.value {
            Value::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.value {
            Value::Scalar(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match &self.value {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(&self.value, Value::Scalar(Scalar::Null))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(&self.value, Value::Scalar(_))
    }
}

/// An order-preserving YAML mapping with per-key positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<MapEntry>,
}

#[derive(Debug, Clone, PartialEq)]
struct MapEntry {
    key: String,
    key_pos: Pos,
    value: Node,
}

impl Mapping {
    /// Look up a key, treating explicit nulls as absent. This mirrors how
    /// the conventions format treats `key:` with no value.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.value)
            .filter(|n| !n.is_null())
    }

    /// Whether the key is present at all, null-valued or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Position of the key token itself.
    pub fn key_pos(&self, key: &str) -> Option<Pos> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.key_pos)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the first key, used as the mapping's reported position
    /// when no more specific key applies.
    pub fn first_key_pos(&self) -> Option<Pos> {
        self.entries.first().map(|e| e.key_pos)
    }
}

/// Load a single YAML document from a string.
pub fn load_str(source: &str) -> Result<Node> {
    let mut builder = DocumentBuilder::default();
    let mut parser = Parser::new_from_str(source);
    parser.load(&mut builder, false)?;
    if let Some(err) = builder.error {
        return Err(err.into());
    }
    builder.root.ok_or_else(|| {
        Error::Validation(ValidationError::new(
            Pos::new(1, 1),
            "empty YAML document",
            None,
        ))
    })
}

/// Load a single YAML document from a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Node> {
    let source = fs::read_to_string(path)?;
    load_str(&source)
}

enum Container {
    Seq(Vec<Node>, Pos),
    Map(Vec<MapEntry>, Option<(String, Pos)>, Pos),
}

#[derive(Default)]
struct DocumentBuilder {
    stack: Vec<Container>,
    // Anchor id for each open container, 0 when unanchored.
    container_anchors: Vec<usize>,
    anchors: HashMap<usize, Node>,
    root: Option<Node>,
    error: Option<ValidationError>,
}

impl DocumentBuilder {
    fn insert(&mut self, node: Node, anchor_id: usize) {
        if self.error.is_some() {
            return;
        }
        if anchor_id > 0 {
            self.anchors.insert(anchor_id, node.clone());
        }
        match self.stack.last_mut() {
            Some(Container::Seq(items, _)) => items.push(node),
            Some(Container::Map(entries, pending_key, _)) => match pending_key.take() {
                Some((key, key_pos)) => entries.push(MapEntry {
                    key,
                    key_pos,
                    value: node,
                }),
                None => match &node.value {
                    Value::Scalar(scalar) => {
                        *pending_key = Some((scalar.to_string(), node.pos));
                    }
                    _ => {
                        self.error = Some(ValidationError::new(
                            node.pos,
                            "mapping keys must be scalars",
                            None,
                        ));
                    }
                },
            },
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
        }
    }
}

impl MarkedEventReceiver for DocumentBuilder {
    fn on_event(&mut self, event: Event, marker: Marker) {
        let pos = Pos::from_marker(marker);
        match event {
            Event::Scalar(raw, style, anchor_id, tag) => {
                let scalar = parse_scalar(raw, style, tag.as_ref());
                self.insert(
                    Node {
                        pos,
                        value: Value::Scalar(scalar),
                    },
                    anchor_id,
                );
            }
            Event::SequenceStart(anchor_id, _) => {
                self.stack.push(Container::Seq(Vec::new(), pos));
                self.container_anchors.push(anchor_id);
            }
            Event::MappingStart(anchor_id, _) => {
                self.stack.push(Container::Map(Vec::new(), None, pos));
                self.container_anchors.push(anchor_id);
            }
            Event::SequenceEnd => {
                if let Some(Container::Seq(items, start)) = self.stack.pop() {
                    let anchor_id = self.container_anchors.pop().unwrap_or(0);
                    self.insert(
                        Node {
                            pos: start,
                            value: Value::Seq(items),
                        },
                        anchor_id,
                    );
                }
            }
            Event::MappingEnd => {
                if let Some(Container::Map(entries, _, start)) = self.stack.pop() {
                    let anchor_id = self.container_anchors.pop().unwrap_or(0);
                    self.insert(
                        Node {
                            pos: start,
                            value: Value::Map(Mapping { entries }),
                        },
                        anchor_id,
                    );
                }
            }
            Event::Alias(anchor_id) => {
                match self.anchors.get(&anchor_id).cloned() {
                    Some(node) => self.insert(node, 0),
                    None => {
                        if self.error.is_none() {
                            self.error = Some(ValidationError::new(
                                pos,
                                "alias references an unknown anchor",
                                None,
                            ));
                        }
                    }
                }
            }
            Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd
            | Event::Nothing => {}
        }
    }
}

fn parse_scalar(raw: String, style: TScalarStyle, tag: Option<&Tag>) -> Scalar {
    if let Some(tag) = tag {
        if tag.handle == "tag:yaml.org,2002:" {
            return match tag.suffix.as_str() {
                "null" => Scalar::Null,
                "bool" => match plain_bool(&raw) {
                    Some(b) => Scalar::Bool(b),
                    None => Scalar::String(raw),
                },
                "int" => match parse_int(&raw) {
                    Some(i) => Scalar::Int(i),
                    None => Scalar::String(raw),
                },
                "float" => match raw.parse::<f64>() {
                    Ok(d) => Scalar::Double(d),
                    Err(_) => Scalar::String(raw),
                },
                _ => Scalar::String(raw),
            };
        }
    }
    if style != TScalarStyle::Plain {
        return Scalar::String(raw);
    }
    if raw.is_empty() || raw == "~" || raw == "null" || raw == "Null" || raw == "NULL" {
        return Scalar::Null;
    }
    if let Some(b) = plain_bool(&raw) {
        return Scalar::Bool(b);
    }
    if let Some(i) = parse_int(&raw) {
        return Scalar::Int(i);
    }
    if looks_numeric(&raw) {
        if let Ok(d) = raw.parse::<f64>() {
            return Scalar::Double(d);
        }
    }
    Scalar::String(raw)
}

fn plain_bool(raw: &str) -> Option<bool> {
    if BOOL_TRUE_RE.is_match(raw) {
        Some(true)
    } else if BOOL_FALSE_RE.is_match(raw) {
        Some(false)
    } else {
        None
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.strip_prefix('+').unwrap_or(raw).parse::<i64>().ok()
}

// Guard against `parse::<f64>` accepting words like "infinity" or "nan".
fn looks_numeric(raw: &str) -> bool {
    raw.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E' | '_'))
        && raw.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_typing() {
        let doc = load_str("a: 3\nb: yes\nc: 1.5\nd: 'yes'\ne: text\nf: ~\n").unwrap();
        let map = doc.as_map().unwrap();
        assert_eq!(map.get("a").unwrap().as_int(), Some(3));
        assert_eq!(map.get("b").unwrap().as_bool(), Some(true));
        assert_eq!(map.get("d").unwrap().as_str(), Some("yes"));
        assert_eq!(map.get("e").unwrap().as_str(), Some("text"));
        assert!(map.get("f").is_none());
        assert!(map.contains_key("f"));
    }

    #[test]
    fn test_positions_are_one_indexed() {
        let doc = load_str("groups:\n  - id: first\n    brief: b\n").unwrap();
        let map = doc.as_map().unwrap();
        assert_eq!(map.key_pos("groups").unwrap(), Pos::new(1, 1));
        let groups = map.get("groups").unwrap().as_seq().unwrap();
        let first = groups[0].as_map().unwrap();
        assert_eq!(first.key_pos("id").unwrap().line, 2);
        assert_eq!(first.key_pos("brief").unwrap().line, 3);
    }

    #[test]
    fn test_nested_sequences() {
        let doc = load_str("any_of:\n  - [a.b, c.d]\n  - single\n").unwrap();
        let any_of = doc.as_map().unwrap().get("any_of").unwrap();
        let entries = any_of.as_seq().unwrap();
        assert_eq!(entries[0].as_seq().unwrap().len(), 2);
        assert_eq!(entries[1].as_str(), Some("single"));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(load_str("").is_err());
    }
}
