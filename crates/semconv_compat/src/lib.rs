//! # semconv_compat
//!
//! Backward compatibility checks between two resolved convention sets.
//!
//! The checker walks the previous version and reports everything the
//! current version dropped or changed in a way consumers would notice:
//! removed attributes and metrics, stability downgrades, type changes,
//! removed enum members, and changed metric attribute sets.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use semconv_model::{
    Attribute, AttributeType, ConventionSet, EnumMember, Group, GroupKind, RequirementLevel,
    Stability,
};

/// The kind of definition a problem is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Attribute,
    Metric,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Attribute => write!(f, "attribute"),
            Signal::Metric => write!(f, "metric"),
        }
    }
}

/// One backward compatibility finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    pub signal: Signal,
    pub name: String,
    pub message: String,
    pub critical: bool,
}

impl Problem {
    fn critical(signal: Signal, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            signal,
            name: name.into(),
            message: message.into(),
            critical: true,
        }
    }

    fn warning(signal: Signal, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            signal,
            name: name.into(),
            message: message.into(),
            critical: false,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' {}", self.signal, self.name, self.message)
    }
}

/// Compares a current convention set against a previous one. Both sets
/// must be resolved.
pub struct CompatibilityChecker<'a> {
    current: &'a ConventionSet,
    previous: &'a ConventionSet,
}

impl<'a> CompatibilityChecker<'a> {
    pub fn new(current: &'a ConventionSet, previous: &'a ConventionSet) -> Self {
        Self { current, previous }
    }

    pub fn check(&self) -> Vec<Problem> {
        let mut problems = Vec::new();
        for group in self.previous.iter_groups() {
            for prev_attr in group.attributes_and_templates() {
                if prev_attr.is_local()
                    && prev_attr.attr_id.is_some()
                    && prev_attr.reference.is_none()
                {
                    self.check_attribute(prev_attr, &mut problems);
                }
            }
            if group.kind.is_metric() {
                self.check_metric(group, &mut problems);
            }
        }
        debug!("compatibility check found {} problems", problems.len());
        problems
    }

    fn check_attribute(&self, prev: &Attribute, problems: &mut Vec<Problem>) {
        let Some(cur) = self.current.lookup_attribute(&prev.fqn) else {
            problems.push(Problem::critical(Signal::Attribute, &prev.fqn, "was removed"));
            return;
        };

        if prev.stability != Stability::Stable {
            return;
        }
        if cur.stability != prev.stability {
            problems.push(Problem::critical(
                Signal::Attribute,
                &prev.fqn,
                format!(
                    "stability changed from '{}' to '{}'",
                    prev.stability, cur.stability
                ),
            ));
        }

        match (&prev.attr_type, &cur.attr_type) {
            (Some(AttributeType::Enum(prev_enum)), Some(AttributeType::Enum(cur_enum))) => {
                if cur_enum.value_type != prev_enum.value_type {
                    problems.push(Problem::critical(
                        Signal::Attribute,
                        &prev.fqn,
                        format!(
                            "enum type changed from '{}' to '{}'",
                            prev_enum.value_type, cur_enum.value_type
                        ),
                    ));
                }
                for member in &prev_enum.members {
                    check_member(&prev.fqn, member, &cur_enum.members, problems);
                }
            }
            (prev_type, cur_type) if prev_type != cur_type => {
                problems.push(Problem::critical(
                    Signal::Attribute,
                    &prev.fqn,
                    format!(
                        "type changed from '{}' to '{}'",
                        type_display(prev_type),
                        type_display(cur_type)
                    ),
                ));
            }
            _ => {}
        }
    }

    fn check_metric(&self, prev: &Group, problems: &mut Vec<Problem>) {
        let GroupKind::Metric {
            metric_name: prev_name,
            unit: prev_unit,
            instrument: prev_instrument,
        } = &prev.kind
        else {
            return;
        };

        let cur = self.current.iter_groups().find_map(|group| {
            match &group.kind {
                GroupKind::Metric {
                    metric_name,
                    unit,
                    instrument,
                } if metric_name == prev_name => Some((group, unit, instrument)),
                _ => None,
            }
        });
        let Some((cur, cur_unit, cur_instrument)) = cur else {
            problems.push(Problem::critical(Signal::Metric, prev_name, "was removed"));
            return;
        };

        if prev.stability != Some(Stability::Stable) {
            return;
        }
        if cur.stability != prev.stability {
            problems.push(Problem::critical(
                Signal::Metric,
                prev_name,
                format!(
                    "stability changed from '{}' to '{}'",
                    stability_display(prev.stability),
                    stability_display(cur.stability)
                ),
            ));
        }
        if cur_unit != prev_unit {
            problems.push(Problem::critical(
                Signal::Metric,
                prev_name,
                format!("unit changed from '{}' to '{}'", prev_unit, cur_unit),
            ));
        }
        if cur_instrument != prev_instrument {
            problems.push(Problem::critical(
                Signal::Metric,
                prev_name,
                format!(
                    "instrument changed from '{}' to '{}'",
                    prev_instrument, cur_instrument
                ),
            ));
        }
        self.check_metric_attributes(prev, cur, prev_name, problems);
    }

    /// Growing or shrinking a stable metric's default attribute set changes
    /// its time series, but additions can be benign, so this is reported as
    /// non-critical.
    fn check_metric_attributes(
        &self,
        prev: &Group,
        cur: &Group,
        metric_name: &str,
        problems: &mut Vec<Problem>,
    ) {
        let prev_attrs = default_attributes(prev);
        let cur_attrs = default_attributes(cur);
        if prev_attrs != cur_attrs {
            problems.push(Problem::warning(
                Signal::Metric,
                metric_name,
                format!(
                    "attributes changed from '[{}]' to '[{}]'",
                    prev_attrs.join(", "),
                    cur_attrs.join(", ")
                ),
            ));
        }
    }
}

fn check_member(fqn: &str, prev: &EnumMember, members: &[EnumMember], problems: &mut Vec<Problem>) {
    if members.iter().any(|member| member.value == prev.value) {
        return;
    }
    problems.push(Problem::critical(
        Signal::Attribute,
        fqn,
        format!("enum member with value '{}' was removed", prev.value),
    ));
}

fn default_attributes(group: &Group) -> Vec<String> {
    group
        .attributes()
        .into_iter()
        .filter(|attr| attr.requirement_level != Some(RequirementLevel::OptIn))
        .map(|attr| attr.fqn.clone())
        .collect()
}

fn type_display(attr_type: &Option<AttributeType>) -> String {
    attr_type
        .as_ref()
        .map(AttributeType::to_string)
        .unwrap_or_default()
}

fn stability_display(stability: Option<Stability>) -> String {
    stability.map(|s| s.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(sources: &[(&str, &str)]) -> ConventionSet {
        let mut set = ConventionSet::new(true);
        for (name, source) in sources {
            set.parse_str(name, source);
        }
        assert!(!set.has_error());
        set.finish().unwrap();
        set
    }

    fn check(previous: &str, current: &str) -> Vec<Problem> {
        let previous = resolved(&[("previous.yaml", previous)]);
        let current = resolved(&[("current.yaml", current)]);
        CompatibilityChecker::new(&current, &previous).check()
    }

    const STABLE_ATTR: &str = "groups:\n  - id: http\n    type: attribute_group\n    prefix: http\n    brief: b\n    attributes:\n      - id: method\n        type: string\n        stability: stable\n        brief: m\n        examples: ['GET']\n";

    const STABLE_METRIC: &str = "groups:\n  - id: metric.http.server.duration\n    type: metric\n    metric_name: http.server.duration\n    stability: stable\n    brief: b\n    unit: ms\n    instrument: histogram\n";

    #[test]
    fn test_no_problems_when_unchanged() {
        assert!(check(STABLE_ATTR, STABLE_ATTR).is_empty());
        assert!(check(STABLE_METRIC, STABLE_METRIC).is_empty());
    }

    #[test]
    fn test_removed_attribute() {
        let problems = check(
            STABLE_ATTR,
            "groups:\n  - id: http\n    type: attribute_group\n    prefix: http\n    brief: b\n",
        );
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].to_string(), "attribute 'http.method' was removed");
        assert!(problems[0].critical);
    }

    #[test]
    fn test_stability_downgrade() {
        let problems = check(
            STABLE_ATTR,
            "groups:\n  - id: http\n    type: attribute_group\n    prefix: http\n    brief: b\n    attributes:\n      - id: method\n        type: string\n        stability: experimental\n        brief: m\n        examples: ['GET']\n",
        );
        assert_eq!(problems.len(), 1);
        assert!(problems[0]
            .message
            .contains("stability changed from 'stable' to 'experimental'"));
    }

    #[test]
    fn test_type_change() {
        let problems = check(
            STABLE_ATTR,
            "groups:\n  - id: http\n    type: attribute_group\n    prefix: http\n    brief: b\n    attributes:\n      - id: method\n        type: int\n        stability: stable\n        brief: m\n",
        );
        assert_eq!(problems.len(), 1);
        assert!(problems[0]
            .message
            .contains("type changed from 'string' to 'int'"));
    }

    #[test]
    fn test_experimental_attribute_changes_are_allowed() {
        let previous = "groups:\n  - id: http\n    type: attribute_group\n    prefix: http\n    brief: b\n    attributes:\n      - id: method\n        type: string\n        stability: experimental\n        brief: m\n        examples: ['GET']\n";
        let current = "groups:\n  - id: http\n    type: attribute_group\n    prefix: http\n    brief: b\n    attributes:\n      - id: method\n        type: int\n        stability: experimental\n        brief: m\n";
        assert!(check(previous, current).is_empty());
    }

    #[test]
    fn test_removed_enum_member() {
        let previous = "groups:\n  - id: net\n    type: attribute_group\n    prefix: net\n    brief: b\n    attributes:\n      - id: transport\n        stability: stable\n        brief: t\n        type:\n          members:\n            - id: tcp\n              value: 'tcp'\n            - id: udp\n              value: 'udp'\n";
        let current = "groups:\n  - id: net\n    type: attribute_group\n    prefix: net\n    brief: b\n    attributes:\n      - id: transport\n        stability: stable\n        brief: t\n        type:\n          members:\n            - id: tcp\n              value: 'tcp'\n";
        let problems = check(previous, current);
        assert_eq!(problems.len(), 1);
        assert!(problems[0]
            .message
            .contains("enum member with value 'udp' was removed"));
    }

    #[test]
    fn test_enum_value_type_change() {
        let previous = "groups:\n  - id: net\n    type: attribute_group\n    prefix: net\n    brief: b\n    attributes:\n      - id: code\n        stability: stable\n        brief: c\n        type:\n          members:\n            - id: ok\n              value: 'ok'\n";
        let current = "groups:\n  - id: net\n    type: attribute_group\n    prefix: net\n    brief: b\n    attributes:\n      - id: code\n        stability: stable\n        brief: c\n        type:\n          members:\n            - id: ok\n              value: 1\n";
        let problems = check(previous, current);
        assert!(problems
            .iter()
            .any(|p| p.message.contains("enum type changed from 'string' to 'int'")));
    }

    #[test]
    fn test_removed_metric() {
        let problems = check(STABLE_METRIC, STABLE_ATTR);
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].to_string(),
            "metric 'http.server.duration' was removed"
        );
    }

    #[test]
    fn test_metric_unit_and_instrument_change() {
        let current = "groups:\n  - id: metric.http.server.duration\n    type: metric\n    metric_name: http.server.duration\n    stability: stable\n    brief: b\n    unit: s\n    instrument: counter\n";
        let problems = check(STABLE_METRIC, current);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].message.contains("unit changed from 'ms' to 's'"));
        assert!(problems[1]
            .message
            .contains("instrument changed from 'histogram' to 'counter'"));
    }

    #[test]
    fn test_metric_attribute_set_change_is_non_critical() {
        let previous = "groups:\n  - id: registry\n    type: attribute_group\n    prefix: http\n    brief: b\n    attributes:\n      - id: method\n        type: string\n        stability: stable\n        brief: m\n        examples: ['GET']\n  - id: metric.http.server.duration\n    type: metric\n    metric_name: http.server.duration\n    stability: stable\n    brief: b\n    unit: ms\n    instrument: histogram\n    attributes:\n      - ref: http.method\n";
        let current = "groups:\n  - id: registry\n    type: attribute_group\n    prefix: http\n    brief: b\n    attributes:\n      - id: method\n        type: string\n        stability: stable\n        brief: m\n        examples: ['GET']\n  - id: metric.http.server.duration\n    type: metric\n    metric_name: http.server.duration\n    stability: stable\n    brief: b\n    unit: ms\n    instrument: histogram\n";
        let problems = check(previous, current);
        assert_eq!(problems.len(), 1);
        assert!(!problems[0].critical);
        assert!(problems[0].message.contains("attributes changed"));
    }
}
