//! The convention set: all parsed groups plus the resolution engine.
//!
//! Resolution runs after every file has been parsed. `ref` and `include`
//! are resolved to a fixed point first, then `extends` chains parent-first,
//! then `any_of` choice ids are bound to attributes and span events are
//! checked. After [`ConventionSet::finish`] the model is closed: no
//! dangling references remain.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error};

use crate::attribute::Attribute;
use crate::constraints::{Constraint, Include};
use crate::doc;
use crate::error::{Result, ValidationError};
use crate::group::{parse_groups, Group};
use crate::validation::ValidationContext;

/// All groups of one conventions corpus, keyed by group id in insertion
/// order.
#[derive(Debug, Default)]
pub struct ConventionSet {
    strict: bool,
    groups: IndexMap<String, Group>,
    errors: bool,
}

impl ConventionSet {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            groups: IndexMap::new(),
            errors: false,
        }
    }

    /// Parse one conventions file into the set. Parse failures are recorded
    /// on the set rather than aborting, so every file gets reported.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        self.parse_str(&path.display().to_string(), &source);
        Ok(())
    }

    /// Parse one conventions document from a string. See [`Self::parse_file`].
    pub fn parse_str(&mut self, file_name: &str, source: &str) {
        let ctx = ValidationContext::new(file_name, self.strict);
        let parsed = doc::load_str(source).and_then(|node| parse_groups(&node, &ctx));
        match parsed {
            Ok(groups) => {
                for group in groups {
                    if self.groups.contains_key(&group.semconv_id) {
                        self.errors = true;
                        error!(
                            "Error parsing {}: semantic convention '{}' is already defined.",
                            file_name, group.semconv_id
                        );
                    }
                    self.groups.insert(group.semconv_id.clone(), group);
                }
            }
            Err(err) => {
                self.errors = true;
                error!("Error parsing {}: {}", file_name, err);
            }
        }
    }

    pub fn has_error(&self) -> bool {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get_group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn iter_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Every non-template attribute across the set.
    pub fn attributes(&self) -> Vec<&Attribute> {
        self.groups.values().flat_map(Group::attributes).collect()
    }

    /// Every template attribute across the set.
    pub fn attribute_templates(&self) -> Vec<&Attribute> {
        self.groups
            .values()
            .flat_map(Group::attribute_templates)
            .collect()
    }

    /// The event groups attached to a span group, in declaration order.
    /// Valid after [`Self::finish`].
    pub fn events_for(&self, group_id: &str) -> Vec<&Group> {
        self.groups
            .get(group_id)
            .map(|group| {
                group
                    .events
                    .iter()
                    .filter_map(|event_id| self.groups.get(event_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The attribute an id refers to: the declaring occurrence, never a
    /// `ref` placeholder.
    pub fn lookup_attribute(&self, attr_id: &str) -> Option<&Attribute> {
        self.groups
            .values()
            .flat_map(|group| group.attrs_by_name.values())
            .find(|attr| attr.fqn == attr_id && attr.reference.is_none())
    }

    /// Resolve the whole set. Safe to call again after adding more files;
    /// the result is the same model.
    pub fn finish(&mut self) -> Result<()> {
        self.check_unique_fqns();

        // Worklist of groups with potentially unresolved refs or includes.
        // Reverse include and extends edges: a change to a group must
        // revisit every group whose include-closure can observe it, since
        // an include also reads the included group's parent. Changes are
        // monotone, so this terminates.
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for group in self.groups.values() {
            for constraint in &group.constraints {
                if let Constraint::Include(include) = constraint {
                    dependents
                        .entry(include.semconv_id.clone())
                        .or_default()
                        .push(group.semconv_id.clone());
                }
            }
            if !group.extends.is_empty() {
                dependents
                    .entry(group.extends.clone())
                    .or_default()
                    .push(group.semconv_id.clone());
            }
        }
        let mut worklist: IndexSet<String> = self.groups.keys().cloned().collect();
        while let Some(id) = worklist.shift_remove_index(0) {
            // Refs first, includes after.
            let fixpoint_ref = self.resolve_ref(&id)?;
            let mut touched = Vec::new();
            let fixpoint_inc = self.resolve_include(&id, &mut touched)?;
            if !(fixpoint_ref && fixpoint_inc) {
                touched.push(id.clone());
            }
            for changed in touched {
                requeue_dependents(&mut worklist, &dependents, &changed);
            }
        }

        self.populate_extends()?;
        self.populate_anyof_attributes()?;
        self.check_events()?;
        Ok(())
    }

    /// Flag attributes declared with the same fully-qualified name in more
    /// than one group. Propagated copies are exempt.
    fn check_unique_fqns(&mut self) {
        let mut group_by_fqn: HashMap<String, String> = HashMap::new();
        let mut duplicates = Vec::new();
        for group in self.groups.values() {
            for attr in group.attributes_and_templates() {
                if attr.reference.is_some() || !attr.is_local() {
                    continue;
                }
                if let Some(owner) = group_by_fqn.get(&attr.fqn) {
                    duplicates.push((attr.fqn.clone(), group.semconv_id.clone(), owner.clone()));
                }
                group_by_fqn.insert(attr.fqn.clone(), group.semconv_id.clone());
            }
        }
        for (fqn, group_id, owner) in duplicates {
            self.errors = true;
            error!(
                "Attribute {} of semantic convention '{}' is already defined in {}.",
                fqn, group_id, owner
            );
        }
    }

    /// Resolve every `ref` attribute of one group against its declaring
    /// occurrence, first folding in overrides from the group's own extends
    /// chain.
    fn resolve_ref(&mut self, id: &str) -> Result<bool> {
        let Some(group) = self.groups.get(id) else {
            return Ok(true);
        };
        let position = group.position;
        let pending: Vec<String> = group
            .attrs_by_name
            .values()
            .filter(|attr| attr.reference.is_some() && attr.attr_id.is_none())
            .map(|attr| attr.fqn.clone())
            .collect();

        let mut fixpoint = true;
        for fqn in pending {
            let Some(mut attr) = self.groups.get(id).and_then(|g| g.attrs_by_name.get(&fqn)).cloned()
            else {
                continue;
            };
            fixpoint = false;
            self.fill_inherited_attribute(id, &mut attr);
            let Some(reference) = attr.reference.clone() else {
                continue;
            };
            let canonical = self.lookup_attribute(&reference).cloned().ok_or_else(|| {
                ValidationError::new(
                    position,
                    format!(
                        "Semantic Convention {} reference `{}` but it cannot be found!",
                        id, reference
                    ),
                    Some(id),
                )
            })?;
            merge_attribute(&mut attr, &canonical);
            if let Some(group) = self.groups.get_mut(id) {
                group.attrs_by_name.insert(fqn, attr);
            }
        }
        Ok(fixpoint)
    }

    /// Fold overrides for a `ref` attribute from the owning group and its
    /// extends chain, nearest ancestor first. Stops as soon as the
    /// attribute is anchored to its declaring occurrence.
    fn fill_inherited_attribute(&self, group_id: &str, attr: &mut Attribute) {
        if attr.attr_id.is_some() {
            return;
        }
        let Some(group) = self.groups.get(group_id) else {
            return;
        };
        if let Some(reference) = attr.reference.clone() {
            if let Some(parent) = group.attrs_by_name.get(&reference) {
                let parent = parent.clone();
                merge_attribute(attr, &parent);
            }
        }
        if !group.extends.is_empty() && self.groups.contains_key(&group.extends) {
            let extends = group.extends.clone();
            self.fill_inherited_attribute(&extends, attr);
        }
    }

    /// Copy attributes and `any_of` constraints from every included group,
    /// skipping what the target already contains. Groups mutated as a side
    /// effect (the included group gaining its parent's attributes) are
    /// reported through `touched` so the caller can revisit them.
    fn resolve_include(&mut self, id: &str, touched: &mut Vec<String>) -> Result<bool> {
        let Some(group) = self.groups.get(id) else {
            return Ok(true);
        };
        let position = group.position;
        let includes: Vec<Include> = group
            .constraints
            .iter()
            .filter_map(|c| match c {
                Constraint::Include(include) => Some(include.clone()),
                _ => None,
            })
            .collect();

        let mut fixpoint = true;
        for include in includes {
            if !self.groups.contains_key(&include.semconv_id) {
                return Err(ValidationError::new(
                    position,
                    format!(
                        "Semantic Convention {} includes {} but the latter cannot be found!",
                        id, include.semconv_id
                    ),
                    Some(id),
                )
                .into());
            }
            // Pull the included group's own parent in first, so inherited
            // attributes travel with the include. Anything the parent handed
            // down may still be a `ref` placeholder; resolve it in the
            // included group before cloning, and report the mutation.
            if self.extend_from_parent(&include.semconv_id)? {
                self.resolve_ref(&include.semconv_id)?;
                touched.push(include.semconv_id.clone());
            }
            let Some(included) = self.groups.get(&include.semconv_id).cloned() else {
                continue;
            };
            let Some(target) = self.groups.get(id) else {
                continue;
            };

            let mut imported: Vec<Attribute> = Vec::new();
            for attr in included.attributes_and_templates() {
                if target.contains_attribute(attr) {
                    debug!(
                        "[include] {} already contains attribute {}",
                        id, attr.fqn
                    );
                    continue;
                }
                imported.push(attr.import_attribute());
            }
            let new_constraints: Vec<Constraint> = included
                .any_of_constraints()
                .filter(|any_of| {
                    !target
                        .any_of_constraints()
                        .any(|existing| existing == *any_of)
                })
                .map(|any_of| Constraint::AnyOf(any_of.inherit_anyof()))
                .collect();

            if imported.is_empty() && new_constraints.is_empty() {
                continue;
            }
            fixpoint = false;
            if let Some(target) = self.groups.get_mut(id) {
                for attr in imported {
                    target.attrs_by_name.insert(attr.fqn.clone(), attr);
                }
                target.constraints.extend(new_constraints);
            }
        }
        Ok(fixpoint)
    }

    /// Resolve every extends chain, parents before children.
    fn populate_extends(&mut self) -> Result<()> {
        let mut unprocessed: IndexSet<String> = self.groups.keys().cloned().collect();
        while let Some(id) = unprocessed.first().cloned() {
            let mut visiting = Vec::new();
            self.populate_extends_single(&id, &mut unprocessed, &mut visiting)?;
        }
        Ok(())
    }

    fn populate_extends_single(
        &mut self,
        id: &str,
        unprocessed: &mut IndexSet<String>,
        visiting: &mut Vec<String>,
    ) -> Result<()> {
        let Some(group) = self.groups.get(id) else {
            unprocessed.shift_remove(id);
            return Ok(());
        };
        if visiting.iter().any(|v| v == id) {
            return Err(ValidationError::new(
                group.position,
                format!(
                    "Semantic Convention {} is part of a cyclic extends chain!",
                    id
                ),
                Some(id),
            )
            .into());
        }
        visiting.push(id.to_owned());
        let extends = group.extends.clone();
        if !extends.is_empty() {
            if unprocessed.contains(extends.as_str()) {
                self.populate_extends_single(&extends, unprocessed, visiting)?;
            }
            self.extend_from_parent(id)?;
        }
        visiting.pop();
        unprocessed.shift_remove(id);
        Ok(())
    }

    /// Inherit prefix, `any_of` constraints, and attributes from the direct
    /// parent of a group. Attributes already present in the child win.
    /// Returns whether the child actually changed.
    fn extend_from_parent(&mut self, id: &str) -> Result<bool> {
        let Some(group) = self.groups.get(id) else {
            return Ok(false);
        };
        if group.extends.is_empty() {
            return Ok(false);
        }
        let extends = group.extends.clone();
        let position = group.position;
        let Some(parent) = self.groups.get(&extends).cloned() else {
            return Err(ValidationError::new(
                position,
                format!(
                    "Semantic Convention {} extends {} but the latter cannot be found!",
                    id, extends
                ),
                Some(id),
            )
            .into());
        };
        let Some(child) = self.groups.get_mut(id) else {
            return Ok(false);
        };

        let mut changed = false;
        if child.prefix.is_empty() && !parent.prefix.is_empty() {
            child.prefix = parent.prefix.clone();
            changed = true;
        }
        for any_of in parent.any_of_constraints() {
            if !child.any_of_constraints().any(|existing| existing == any_of) {
                child
                    .constraints
                    .push(Constraint::AnyOf(any_of.inherit_anyof()));
                changed = true;
            }
        }
        let before = std::mem::take(&mut child.attrs_by_name);
        let before_len = before.len();
        let mut merged: IndexMap<String, Attribute> = parent
            .attributes_and_templates()
            .into_iter()
            .map(|attr| (attr.fqn.clone(), attr.inherit_attribute()))
            .collect();
        // The child overlays the parent copies, so the merge only grows
        // when the parent contributed an fqn the child did not have.
        for (fqn, attr) in before {
            merged.insert(fqn, attr);
        }
        if merged.len() != before_len {
            changed = true;
        }
        child.attrs_by_name = merged;
        Ok(changed)
    }

    /// Bind every `any_of` choice id to its attribute. Rebuilds the bound
    /// lists from scratch so a second resolution pass reaches the same
    /// state.
    fn populate_anyof_attributes(&mut self) -> Result<()> {
        let ids: Vec<String> = self.groups.keys().cloned().collect();
        for id in ids {
            let Some(group) = self.groups.get(&id) else {
                continue;
            };
            let position = group.position;
            let mut constraints = group.constraints.clone();
            for constraint in &mut constraints {
                let Constraint::AnyOf(any_of) = constraint else {
                    continue;
                };
                let mut resolved: Vec<Vec<Attribute>> = Vec::new();
                for (index, attr_ids) in any_of.choice_list_ids.iter().enumerate() {
                    let mut attrs = Vec::new();
                    for attr_id in attr_ids {
                        let attr = self.lookup_attribute(attr_id).cloned().ok_or_else(|| {
                            ValidationError::new(
                                any_of.choice_positions.get(index).copied().unwrap_or(position),
                                format!(
                                    "Any_of attribute '{}' of semantic convention {} does not exist!",
                                    attr_id, id
                                ),
                                Some(&id),
                            )
                        })?;
                        attrs.push(attr);
                    }
                    if !attrs.is_empty() {
                        resolved.push(attrs);
                    }
                }
                any_of.choice_list_attributes = resolved;
            }
            if let Some(group) = self.groups.get_mut(&id) {
                group.constraints = constraints;
            }
        }
        Ok(())
    }

    /// Check that every event id attached to a span names an event group.
    fn check_events(&self) -> Result<()> {
        for group in self.groups.values() {
            for event_id in &group.events {
                match self.groups.get(event_id) {
                    None => {
                        return Err(ValidationError::new(
                            group.position,
                            format!(
                                "Semantic Convention {} has {} as event but the latter cannot be found!",
                                group.semconv_id, event_id
                            ),
                            Some(&group.semconv_id),
                        )
                        .into())
                    }
                    Some(event) if !event.kind.is_event() => {
                        return Err(ValidationError::new(
                            group.position,
                            format!(
                                "Semantic Convention {} has {} as event but the latter is not a semantic convention for events!",
                                group.semconv_id, event_id
                            ),
                            Some(&group.semconv_id),
                        )
                        .into())
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Re-queue a changed group together with every group that can observe it
/// through the reverse include/extends edges, transitively.
fn requeue_dependents(
    worklist: &mut IndexSet<String>,
    dependents: &HashMap<String, Vec<String>>,
    changed: &str,
) {
    let mut stack = vec![changed.to_owned()];
    let mut seen: IndexSet<String> = IndexSet::new();
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        worklist.insert(id.clone());
        if let Some(deps) = dependents.get(&id) {
            stack.extend(deps.iter().cloned());
        }
    }
}

/// Overlay a resolved parent attribute under a `ref` child. The type and
/// id always come from the declaring occurrence; descriptive fields only
/// fill gaps the child left open.
fn merge_attribute(child: &mut Attribute, parent: &Attribute) {
    child.attr_type = parent.attr_type.clone();
    if child.brief.is_empty() {
        child.brief = parent.brief.clone();
    }
    if child.requirement_level.is_none() {
        child.requirement_level = parent.requirement_level;
        if child.requirement_level_msg.is_empty() {
            child.requirement_level_msg = parent.requirement_level_msg.clone();
        }
    }
    if child.note.is_empty() {
        child.note = parent.note.clone();
    }
    if child.examples.is_none() {
        child.examples = parent.examples.clone();
    }
    child.attr_id = parent.attr_id.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeType, PrimitiveType, RequirementLevel};
    use crate::group::GroupKind;

    fn resolved(sources: &[(&str, &str)]) -> ConventionSet {
        let mut set = ConventionSet::new(true);
        for (name, source) in sources {
            set.parse_str(name, source);
        }
        assert!(!set.has_error(), "unexpected parse error");
        set.finish().unwrap();
        set
    }

    const NETWORK: &str = "groups:\n  - id: network\n    type: attribute_group\n    prefix: net.peer\n    brief: network attributes\n    attributes:\n      - id: port\n        type: int\n        brief: 'Remote port'\n        note: 'The transport port'\n        examples: [80]\n      - id: name\n        type: string\n        brief: 'Remote hostname'\n        requirement_level: required\n        examples: ['example.com']\n";

    #[test]
    fn test_ref_resolution_merges_from_declaration() {
        let set = resolved(&[
            ("network.yaml", NETWORK),
            (
                "rpc.yaml",
                "groups:\n  - id: rpc\n    type: span\n    prefix: rpc\n    brief: RPC spans\n    attributes:\n      - ref: net.peer.port\n        brief: 'override brief'\n",
            ),
        ]);
        let rpc = set.get_group("rpc").unwrap();
        let attr = &rpc.attrs_by_name["net.peer.port"];
        assert_eq!(attr.reference.as_deref(), Some("net.peer.port"));
        assert_eq!(attr.attr_id.as_deref(), Some("port"));
        assert_eq!(
            attr.attr_type,
            Some(AttributeType::Primitive(PrimitiveType::Int))
        );
        assert_eq!(attr.brief, "override brief");
        assert_eq!(attr.note, "The transport port");
    }

    #[test]
    fn test_ref_without_override_copies_docs() {
        let set = resolved(&[
            ("network.yaml", NETWORK),
            (
                "rpc.yaml",
                "groups:\n  - id: rpc\n    type: span\n    brief: b\n    attributes:\n      - ref: net.peer.port\n",
            ),
        ]);
        let attr = &set.get_group("rpc").unwrap().attrs_by_name["net.peer.port"];
        assert_eq!(attr.attr_id.as_deref(), Some("port"));
        assert_eq!(
            attr.attr_type,
            Some(AttributeType::Primitive(PrimitiveType::Int))
        );
        assert_eq!(attr.brief, "Remote port");
        assert_eq!(attr.note, "The transport port");
    }

    #[test]
    fn test_ref_not_found() {
        let mut set = ConventionSet::new(true);
        set.parse_str(
            "rpc.yaml",
            "groups:\n  - id: rpc\n    type: span\n    brief: b\n    attributes:\n      - ref: does.not.exist\n",
        );
        let err = set.finish().unwrap_err();
        assert!(err
            .to_string()
            .contains("Semantic Convention rpc reference `does.not.exist` but it cannot be found!"));
    }

    #[test]
    fn test_include_imports_attributes_and_constraints() {
        let set = resolved(&[
            ("network.yaml", NETWORK),
            (
                "peer.yaml",
                "groups:\n  - id: peer\n    type: span\n    prefix: peer\n    brief: b\n    attributes:\n      - id: service\n        type: string\n        brief: s\n        examples: ['svc']\n    constraints:\n      - any_of:\n          - [net.peer.name]\n      - include: network\n",
            ),
        ]);
        let peer = set.get_group("peer").unwrap();
        let imported = &peer.attrs_by_name["net.peer.port"];
        assert!(imported.imported);
        assert!(!peer.attrs_by_name["peer.service"].imported);
        assert_eq!(peer.attributes_and_templates().len(), 3);
    }

    #[test]
    fn test_include_not_found() {
        let mut set = ConventionSet::new(true);
        set.parse_str(
            "peer.yaml",
            "groups:\n  - id: peer\n    type: span\n    brief: b\n    constraints:\n      - include: missing\n",
        );
        let err = set.finish().unwrap_err();
        assert!(err
            .to_string()
            .contains("Semantic Convention peer includes missing but the latter cannot be found!"));
    }

    #[test]
    fn test_extends_inherits_attributes_and_prefix() {
        let set = resolved(&[(
            "db.yaml",
            "groups:\n  - id: db\n    type: span\n    prefix: db\n    brief: base\n    attributes:\n      - id: system\n        type: string\n        brief: s\n        examples: ['mysql']\n  - id: db.redis\n    type: span\n    extends: db\n    brief: redis\n    attributes:\n      - id: redis.index\n        type: int\n        brief: i\n",
        )]);
        let redis = set.get_group("db.redis").unwrap();
        assert_eq!(redis.prefix, "db");
        let inherited = &redis.attrs_by_name["db.system"];
        assert!(inherited.inherited);
        assert!(redis.attrs_by_name.contains_key("db.redis.index"));
    }

    #[test]
    fn test_extends_chain_resolves_parent_first() {
        // The grandchild is declared before its ancestors.
        let set = resolved(&[(
            "chain.yaml",
            "groups:\n  - id: leaf\n    type: span\n    extends: middle\n    brief: b\n  - id: middle\n    type: span\n    extends: root\n    brief: b\n    attributes:\n      - id: mid.attr\n        type: int\n        brief: m\n  - id: root\n    type: span\n    prefix: root\n    brief: b\n    attributes:\n      - id: attr\n        type: int\n        brief: r\n",
        )]);
        let leaf = set.get_group("leaf").unwrap();
        assert!(leaf.attrs_by_name.contains_key("root.attr"));
        assert!(leaf.attrs_by_name.contains_key("mid.attr"));
        assert_eq!(leaf.prefix, "root");
    }

    #[test]
    fn test_include_of_extending_group_resolves_inherited_refs() {
        // Declaration order matters here: the includer runs before the
        // included group's parent has resolved its ref, so the inherited
        // placeholder must be revisited instead of surviving to the end.
        let set = resolved(&[(
            "chain.yaml",
            "groups:\n  - id: bb\n    type: span\n    extends: pp\n    brief: b\n  - id: aa\n    type: span\n    brief: b\n    constraints:\n      - include: bb\n  - id: pp\n    type: span\n    brief: b\n    attributes:\n      - ref: xx.yy\n  - id: nn\n    type: attribute_group\n    prefix: xx\n    brief: b\n    attributes:\n      - id: yy\n        type: int\n        brief: y\n",
        )]);
        for id in ["bb", "aa", "pp"] {
            let attr = &set.get_group(id).unwrap().attrs_by_name["xx.yy"];
            assert_eq!(attr.attr_id.as_deref(), Some("yy"), "group {}", id);
            assert_eq!(
                attr.attr_type,
                Some(AttributeType::Primitive(PrimitiveType::Int)),
                "group {}",
                id
            );
        }
        assert!(set.get_group("aa").unwrap().attrs_by_name["xx.yy"].imported);
        assert!(set.get_group("bb").unwrap().attrs_by_name["xx.yy"].inherited);
    }

    #[test]
    fn test_extends_not_found() {
        let mut set = ConventionSet::new(true);
        set.parse_str(
            "aa.yaml",
            "groups:\n  - id: aa\n    type: span\n    extends: ghost\n    brief: b\n",
        );
        let err = set.finish().unwrap_err();
        assert!(err
            .to_string()
            .contains("Semantic Convention aa extends ghost but the latter cannot be found!"));
    }

    #[test]
    fn test_extends_cycle_is_an_error() {
        let mut set = ConventionSet::new(true);
        set.parse_str(
            "cycle.yaml",
            "groups:\n  - id: aa\n    type: span\n    extends: bb\n    brief: b\n  - id: bb\n    type: span\n    extends: aa\n    brief: b\n",
        );
        let err = set.finish().unwrap_err();
        assert!(err.to_string().contains("cyclic extends chain"));
    }

    #[test]
    fn test_child_attribute_overrides_parent() {
        let set = resolved(&[(
            "o.yaml",
            "groups:\n  - id: base\n    type: span\n    prefix: base\n    brief: b\n    attributes:\n      - id: attr\n        type: int\n        brief: 'parent brief'\n  - id: child\n    type: span\n    extends: base\n    brief: b\n    attributes:\n      - ref: base.attr\n        brief: 'child brief'\n",
        )]);
        let child = set.get_group("child").unwrap();
        let attr = &child.attrs_by_name["base.attr"];
        assert_eq!(attr.brief, "child brief");
        assert!(!attr.inherited);
    }

    #[test]
    fn test_anyof_binding() {
        let set = resolved(&[
            ("network.yaml", NETWORK),
            (
                "span.yaml",
                "groups:\n  - id: client\n    type: span\n    brief: b\n    constraints:\n      - any_of:\n          - [net.peer.name]\n          - [net.peer.port]\n",
            ),
        ]);
        let client = set.get_group("client").unwrap();
        let any_of = client.any_of_constraints().next().unwrap();
        assert_eq!(any_of.choice_list_attributes.len(), 2);
        assert_eq!(any_of.choice_list_attributes[0][0].fqn, "net.peer.name");
        assert_eq!(
            any_of.choice_list_attributes[0][0].requirement_level,
            Some(RequirementLevel::Required)
        );
        let name_attr = set.lookup_attribute("net.peer.name").unwrap();
        assert!(client.has_attribute_constraint(name_attr));
    }

    #[test]
    fn test_anyof_unknown_attribute() {
        let mut set = ConventionSet::new(true);
        set.parse_str(
            "span.yaml",
            "groups:\n  - id: client\n    type: span\n    brief: b\n    constraints:\n      - any_of:\n          - [phantom.attr]\n",
        );
        let err = set.finish().unwrap_err();
        assert!(err.to_string().contains(
            "Any_of attribute 'phantom.attr' of semantic convention client does not exist!"
        ));
    }

    #[test]
    fn test_events_resolution() {
        let set = resolved(&[(
            "e.yaml",
            "groups:\n  - id: exception\n    type: event\n    prefix: exception\n    brief: b\n  - id: span.with.event\n    type: span\n    brief: b\n    events: [exception]\n",
        )]);
        let events = set.events_for("span.with.event");
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            GroupKind::Event {
                name: "exception".to_owned()
            }
        );
    }

    #[test]
    fn test_event_id_must_name_an_event_group() {
        let mut set = ConventionSet::new(true);
        set.parse_str(
            "e.yaml",
            "groups:\n  - id: not.an.event\n    type: span\n    brief: b\n  - id: sp\n    type: span\n    brief: b\n    events: [not.an.event]\n",
        );
        let err = set.finish().unwrap_err();
        assert!(err
            .to_string()
            .contains("is not a semantic convention for events!"));
    }

    #[test]
    fn test_event_id_not_found() {
        let mut set = ConventionSet::new(true);
        set.parse_str(
            "e.yaml",
            "groups:\n  - id: sp\n    type: span\n    brief: b\n    events: [ghost]\n",
        );
        let err = set.finish().unwrap_err();
        assert!(err
            .to_string()
            .contains("Semantic Convention sp has ghost as event but the latter cannot be found!"));
    }

    #[test]
    fn test_duplicate_fqn_across_files_flags_error() {
        let mut set = ConventionSet::new(true);
        set.parse_str(
            "one.yaml",
            "groups:\n  - id: one\n    type: attribute_group\n    prefix: db\n    brief: b\n    attributes:\n      - id: type\n        type: string\n        brief: b\n        examples: ['sql']\n",
        );
        set.parse_str(
            "two.yaml",
            "groups:\n  - id: two\n    type: attribute_group\n    prefix: db\n    brief: b\n    attributes:\n      - id: type\n        type: string\n        brief: b\n        examples: ['sql']\n",
        );
        set.finish().unwrap();
        assert!(set.has_error());
    }

    #[test]
    fn test_duplicate_group_id_flags_error() {
        let mut set = ConventionSet::new(true);
        set.parse_str("a.yaml", "groups:\n  - id: dup\n    type: span\n    brief: b\n");
        set.parse_str("b.yaml", "groups:\n  - id: dup\n    type: span\n    brief: b\n");
        assert!(set.has_error());
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut set = ConventionSet::new(true);
        set.parse_str("network.yaml", NETWORK);
        set.parse_str(
            "peer.yaml",
            "groups:\n  - id: peer\n    type: span\n    brief: b\n    constraints:\n      - include: network\n",
        );
        set.finish().unwrap();
        let first: Vec<String> = set
            .get_group("peer")
            .unwrap()
            .attributes_and_templates()
            .iter()
            .map(|a| a.fqn.clone())
            .collect();
        set.finish().unwrap();
        assert!(!set.has_error());
        let second: Vec<String> = set
            .get_group("peer")
            .unwrap()
            .attributes_and_templates()
            .iter()
            .map(|a| a.fqn.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_error_is_recorded_not_raised() {
        let mut set = ConventionSet::new(true);
        set.parse_str("broken.yaml", "groups:\n  - id: xx\n    type: nope\n    brief: b\n");
        assert!(set.has_error());
        assert!(set.is_empty());
    }
}
