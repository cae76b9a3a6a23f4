//! Custom assertions for integration tests.

use stylekit_inspector::{InspectorSession, NodeId};

/// Assert the store's value for `(selector, property)`; `None` means absent.
#[track_caller]
pub fn assert_rule(session: &InspectorSession, selector: &str, property: &str, expected: Option<&str>) {
    let actual = session.store().get(selector, property);
    assert_eq!(
        actual.as_deref(),
        expected,
        "Rule mismatch for {} {{ {} }}: expected {:?}, got {:?}",
        selector,
        property,
        expected,
        actual
    );
}

/// Assert the selection holds exactly `nodes`, in order, with `nodes[0]` primary.
#[track_caller]
pub fn assert_selection(session: &InspectorSession, nodes: &[NodeId]) {
    let actual: Vec<NodeId> = session
        .selection()
        .selected_elements()
        .iter()
        .map(|h| h.node)
        .collect();
    assert_eq!(actual, nodes, "Selection members differ");
    assert_eq!(
        session.selection().primary_element().map(|h| h.node),
        nodes.first().copied(),
        "Primary node differs"
    );
}

/// Assert the computed value of `property` on `node`.
#[track_caller]
pub fn assert_computed(session: &InspectorSession, node: NodeId, property: &str, expected: Option<&str>) {
    let actual = session.computed_value(node, property).map(|v| v.value);
    assert_eq!(
        actual.as_deref(),
        expected,
        "Computed {} on {} differs",
        property,
        node
    );
}
