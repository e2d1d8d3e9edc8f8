//! Integration tests for parsing and resolving a multi-file conventions
//! corpus.

use std::fs;

use semconv_model::group::parse_groups;
use semconv_model::{doc, ConventionSet, ValidationContext};

const NETWORK_YAML: &str = "\
groups:
  - id: network
    type: attribute_group
    prefix: net.peer
    brief: Network attributes
    attributes:
      - id: ip
        type: string
        brief: 'Remote IP'
        examples: ['127.0.0.1']
      - id: port
        type: int
        brief: 'Remote port'
        note: 'Canonical note'
        examples: [80]
      - id: name
        type: string
        brief: 'Remote name'
        examples: ['example.com']
";

const HTTP_YAML: &str = "\
groups:
  - id: http
    type: span
    prefix: http
    brief: HTTP spans
    attributes:
      - id: method
        type: string
        brief: 'HTTP method'
        examples: ['GET']
";

const RPC_YAML: &str = "\
groups:
  - id: rpc
    type: span
    prefix: rpc
    brief: RPC spans
    attributes:
      - id: service
        type: string
        brief: 'Service name'
        examples: ['svc']
    constraints:
      - include: network
  - id: rpc.client
    type: span
    extends: rpc
    prefix: rpc.client
    brief: RPC client spans
    attributes:
      - ref: net.peer.port
        brief: 'Override brief'
        note: 'Not overridden by resolution'
      - id: name
        type: string
        brief: 'Client name'
        examples: ['client']
    constraints:
      - include: http
  - id: zz.rpc.client
    type: span
    extends: rpc.client
    prefix: zz
    brief: Deepest client spans
    attributes:
      - id: attr
        type: boolean
        brief: 'Extra flag'
    constraints:
      - include: zother
  - id: zother
    type: attribute_group
    prefix: zother
    brief: Other attributes
    attributes:
      - id: hostname
        type: string
        brief: 'Hostname'
        examples: ['host']
";

fn full_corpus() -> ConventionSet {
    let mut set = ConventionSet::new(true);
    set.parse_str("network.yaml", NETWORK_YAML);
    set.parse_str("http.yaml", HTTP_YAML);
    set.parse_str("rpc.yaml", RPC_YAML);
    assert!(!set.has_error());
    set.finish().unwrap();
    set
}

#[test]
fn test_include_and_extends_one_level() {
    let set = full_corpus();
    let client = set.get_group("rpc.client").unwrap();
    let fqns: Vec<&str> = client
        .attributes_and_templates()
        .iter()
        .map(|a| a.fqn.as_str())
        .collect();
    assert_eq!(
        fqns,
        vec![
            "http.method",
            "net.peer.ip",
            "net.peer.name",
            "net.peer.port",
            "rpc.client.name",
            "rpc.service",
        ]
    );

    // Propagated through include on the parent, then through extends.
    let ip = &client.attrs_by_name["net.peer.ip"];
    assert!(ip.imported);
    assert!(ip.inherited);

    // Declared on the parent, inherited by the child.
    let service = &client.attrs_by_name["rpc.service"];
    assert!(service.inherited);
    assert!(!service.imported);

    // Included directly into the child.
    let method = &client.attrs_by_name["http.method"];
    assert!(method.imported);
    assert!(!method.inherited);

    // Declared locally.
    assert!(client.attrs_by_name["rpc.client.name"].is_local());
}

#[test]
fn test_local_ref_overrides_inherited_copy() {
    let set = full_corpus();
    let client = set.get_group("rpc.client").unwrap();
    let port = &client.attrs_by_name["net.peer.port"];
    assert!(port.is_local());
    assert_eq!(port.attr_id.as_deref(), Some("port"));
    assert_eq!(port.brief, "Override brief");
    assert_eq!(port.note, "Not overridden by resolution");
    // The declaring occurrence keeps its own text.
    let canonical = set.lookup_attribute("net.peer.port").unwrap();
    assert_eq!(canonical.brief, "Remote port");
    assert_eq!(canonical.note, "Canonical note");
}

#[test]
fn test_two_level_extends_with_include() {
    let set = full_corpus();
    let deepest = set.get_group("zz.rpc.client").unwrap();
    let fqns: Vec<&str> = deepest
        .attributes_and_templates()
        .iter()
        .map(|a| a.fqn.as_str())
        .collect();
    assert_eq!(
        fqns,
        vec![
            "http.method",
            "net.peer.ip",
            "net.peer.name",
            "net.peer.port",
            "rpc.client.name",
            "rpc.service",
            "zother.hostname",
            "zz.attr",
        ]
    );

    let hostname = &deepest.attrs_by_name["zother.hostname"];
    assert!(hostname.imported);
    assert!(!hostname.inherited);

    // The grandchild sees the child's override, flagged as inherited.
    let port = &deepest.attrs_by_name["net.peer.port"];
    assert!(port.inherited);
    assert_eq!(port.brief, "Override brief");

    assert!(deepest.attrs_by_name["zz.attr"].is_local());
}

#[test]
fn test_ref_inherits_examples_from_declaration() {
    let set = full_corpus();
    let client = set.get_group("rpc.client").unwrap();
    let port = &client.attrs_by_name["net.peer.port"];
    assert!(port.examples.is_some());
}

#[test]
fn test_anyof_inherited_through_extends_and_bound() {
    let mut set = ConventionSet::new(true);
    set.parse_str(
        "base.yaml",
        "groups:\n  - id: base\n    type: span\n    prefix: base\n    brief: b\n    attributes:\n      - id: first\n        type: int\n        brief: f\n      - id: second\n        type: int\n        brief: s\n    constraints:\n      - any_of:\n          - [base.first]\n          - [base.second]\n  - id: child\n    type: span\n    extends: base\n    brief: c\n",
    );
    set.finish().unwrap();

    let child = set.get_group("child").unwrap();
    let any_of = child.any_of_constraints().next().unwrap();
    assert!(any_of.inherited);
    assert_eq!(any_of.choice_list_attributes.len(), 2);
    assert_eq!(any_of.choice_list_attributes[0][0].fqn, "base.first");

    let base = set.get_group("base").unwrap();
    assert!(!base.any_of_constraints().next().unwrap().inherited);
}

#[test]
fn test_repeated_finish_reaches_same_state() {
    let mut set = full_corpus();
    let before: Vec<String> = set
        .get_group("zz.rpc.client")
        .unwrap()
        .attributes_and_templates()
        .iter()
        .map(|a| a.fqn.clone())
        .collect();
    let constraints_before = set.get_group("zz.rpc.client").unwrap().constraints.len();

    set.finish().unwrap();
    assert!(!set.has_error());
    let after: Vec<String> = set
        .get_group("zz.rpc.client")
        .unwrap()
        .attributes_and_templates()
        .iter()
        .map(|a| a.fqn.clone())
        .collect();
    assert_eq!(before, after);
    assert_eq!(
        constraints_before,
        set.get_group("zz.rpc.client").unwrap().constraints.len()
    );
}

#[test]
fn test_lenient_mode_keeps_going() {
    let mut set = ConventionSet::new(false);
    set.parse_str(
        "sloppy.yaml",
        "groups:\n  - id: sloppy\n    type: span\n    brief: b\n    attributes:\n      - id: attr\n        type: int\n        brief: b\n        typo_key: oops\n",
    );
    assert!(!set.has_error());
    set.finish().unwrap();
    assert!(set.get_group("sloppy").is_some());
}

#[test]
fn test_strict_mode_pins_error_position() {
    let node = doc::load_str(
        "groups:\n  - id: sloppy\n    type: span\n    brief: b\n    attributes:\n      - id: attr\n        type: int\n        brief: b\n        typo_key: oops\n",
    )
    .unwrap();
    let ctx = ValidationContext::new("sloppy.yaml", true);
    let err = parse_groups(&node, &ctx).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Invalid keys: [typo_key]"), "{}", msg);
    assert!(msg.contains("@9:9"), "{}", msg);
    assert!(msg.contains("('attr')"), "{}", msg);
}

#[test]
fn test_parse_files_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("network.yaml"), NETWORK_YAML).unwrap();
    fs::write(dir.path().join("rpc.yaml"), RPC_YAML).unwrap();
    fs::write(dir.path().join("http.yaml"), HTTP_YAML).unwrap();

    let mut set = ConventionSet::new(true);
    for name in ["network.yaml", "http.yaml", "rpc.yaml"] {
        set.parse_file(dir.path().join(name)).unwrap();
    }
    set.finish().unwrap();
    assert_eq!(set.len(), 6);
    assert!(set.lookup_attribute("net.peer.ip").is_some());
}

#[test]
fn test_set_wide_accessors() {
    let set = full_corpus();
    let all = set.attributes();
    assert!(all.iter().any(|a| a.fqn == "rpc.service"));
    // Imported and inherited copies are present per owning group.
    assert!(all.iter().filter(|a| a.fqn == "net.peer.ip").count() > 1);
    assert!(set.attribute_templates().is_empty());
}

#[test]
fn test_missing_file_is_an_io_error() {
    let mut set = ConventionSet::new(true);
    assert!(set.parse_file("/no/such/file.yaml").is_err());
}
