//! Tests for the rule model.

use super::*;

#[test]
fn path_parsing_normalizes_separators() {
    assert_eq!(ResourcePath::new("/a//b/"), ResourcePath::new("a/b"));
    assert_eq!(ResourcePath::new(""), ResourcePath::root());
    assert_eq!(ResourcePath::new("/"), ResourcePath::root());
}

#[test]
fn path_display_round_trip() {
    assert_eq!(ResourcePath::root().to_string(), "/");
    assert_eq!(ResourcePath::new("/project/src").to_string(), "/project/src");

    let path = ResourcePath::new("/a/b/c");
    assert_eq!(ResourcePath::new(&path.to_string()), path);
}

#[test]
fn path_parent_and_join() {
    let file = ResourcePath::new("/project/src/main.rs");
    let src = file.parent().unwrap();
    assert_eq!(src, ResourcePath::new("/project/src"));
    assert_eq!(src.join("main.rs"), file);
    assert!(ResourcePath::root().parent().is_none());
}

#[test]
fn path_prefix_relation() {
    let root = ResourcePath::root();
    let project = ResourcePath::new("/project");
    let file = ResourcePath::new("/project/src/main.rs");
    let other = ResourcePath::new("/other");

    assert!(root.is_prefix_of(&file));
    assert!(project.is_prefix_of(&file));
    assert!(!file.is_prefix_of(&project));
    assert!(!project.is_prefix_of(&other));

    // A segment prefix is not a path prefix
    let pro = ResourcePath::new("/pro");
    assert!(!pro.is_prefix_of(&project));
}

#[test]
fn containment_is_reflexive() {
    let rules = [
        PathRule::root(),
        PathRule::new("/project"),
        PathRule::new("/project/src/main.rs"),
        PathRule::new("/a").combine(&PathRule::new("/b")),
    ];
    for rule in &rules {
        assert!(rule.contains(rule), "{} must contain itself", rule);
    }
}

#[test]
fn containment_is_transitive() {
    let root = PathRule::root();
    let project = PathRule::new("/project");
    let file = PathRule::new("/project/src/main.rs");

    assert!(root.contains(&project));
    assert!(project.contains(&file));
    assert!(root.contains(&file));
}

#[test]
fn root_contains_every_rule() {
    let root = PathRule::root();
    for rule in [
        PathRule::new("/project"),
        PathRule::new("/a/very/deep/path"),
        PathRule::new("/x").combine(&PathRule::new("/y")),
        PathRule::root(),
    ] {
        assert!(root.contains(&rule));
    }
}

#[test]
fn containment_implies_no_conflict_unless_equal() {
    let project = PathRule::new("/project");
    let file = PathRule::new("/project/src/main.rs");

    assert!(project.contains(&file));
    assert!(!project.conflicts(&file));
    assert!(!file.conflicts(&project));

    // Equal rules do conflict
    assert!(project.conflicts(&PathRule::new("/project")));
}

#[test]
fn conflicts_is_symmetric() {
    let pairs = [
        (PathRule::new("/p"), PathRule::new("/p")),
        (PathRule::new("/p"), PathRule::new("/p/f")),
        (PathRule::new("/p"), PathRule::new("/q")),
        (
            PathRule::new("/a").combine(&PathRule::new("/b")),
            PathRule::new("/b").combine(&PathRule::new("/c")),
        ),
    ];
    for (a, b) in &pairs {
        assert_eq!(a.conflicts(b), b.conflicts(a), "conflicts({}, {})", a, b);
    }
}

#[test]
fn disjoint_rules_are_independent() {
    let a = PathRule::new("/project-a");
    let b = PathRule::new("/project-b");

    assert!(a.is_independent(&b));
    assert!(b.is_independent(&a));
    assert!(!a.conflicts(&b));
}

#[test]
fn nested_rules_are_related_but_not_conflicting() {
    let parent = PathRule::new("/project");
    let child = PathRule::new("/project/folder/file.txt");

    assert!(!parent.is_independent(&child));
    assert!(!parent.conflicts(&child));
}

#[test]
fn overlap_without_containment_conflicts() {
    // Reachable once a rule covers several prefixes: the covered sets share
    // /b, but neither rule contains the other.
    let ab = PathRule::new("/a").combine(&PathRule::new("/b"));
    let bc = PathRule::new("/b").combine(&PathRule::new("/c"));

    assert!(!ab.contains(&bc));
    assert!(!bc.contains(&ab));
    assert!(ab.conflicts(&bc));
}

#[test]
fn combine_contains_both_operands() {
    let a = PathRule::new("/a");
    let b = PathRule::new("/b/c");
    let combined = a.combine(&b);

    assert!(combined.contains(&a));
    assert!(combined.contains(&b));
}

#[test]
fn combine_absorbs_nested_paths() {
    let parent = PathRule::new("/project");
    let child = PathRule::new("/project/src");

    let combined = parent.combine(&child);
    assert_eq!(combined, parent);
    assert_eq!(combined.covered_paths().len(), 1);
}

#[test]
fn combine_is_order_independent() {
    let a = PathRule::new("/a");
    let b = PathRule::new("/b");
    assert_eq!(a.combine(&b), b.combine(&a));
}

#[test]
fn rule_display() {
    assert_eq!(PathRule::root().to_string(), "/");
    assert_eq!(PathRule::new("/p/f").to_string(), "/p/f");
    assert_eq!(
        PathRule::new("/a").combine(&PathRule::new("/b")).to_string(),
        "[/a, /b]"
    );
}
