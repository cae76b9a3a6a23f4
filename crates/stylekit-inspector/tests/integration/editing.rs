//! Editing integration tests
//!
//! These tests verify that:
//! - Selector edits reach every node sharing the selector
//! - Undo/redo restores the store exactly
//! - Batch edits are one undo step
//! - Selection modes behave as panels expect

use std::cell::RefCell;
use std::rc::Rc;

use stylekit_inspector::{
    ChangeReason, HistoryManager, SelectOptions, SelectionMode, StyleChange, StyleRuleStore,
};

use crate::support::{assert_computed, assert_rule, assert_selection, TestPage};

#[test]
fn test_edit_applies_to_all_matching_nodes() {
    let mut page = TestPage::new();
    page.session.select(page.cards[0], SelectOptions::default());
    page.session.update_style("padding", "12px").expect("update");

    assert_rule(&page.session, ".card", "padding", Some("12px"));
    for card in &page.cards {
        assert_computed(&page.session, *card, "padding", Some("12px"));
    }
    assert_computed(&page.session, page.links[0], "padding", None);
}

#[test]
fn test_undo_redo_round_trip() {
    let mut store = StyleRuleStore::new();
    let mut history = HistoryManager::new();
    store.upsert(".btn", "color", "red").expect("upsert");
    history.record(StyleChange::class(".btn", "color", "", "red"));

    history.undo(&mut store);
    assert_eq!(store.get(".btn", "color"), None);
    history.redo(&mut store);
    assert_eq!(store.get(".btn", "color").as_deref(), Some("red"));
}

#[test]
fn test_undo_then_redo_is_exact() {
    let mut page = TestPage::new();
    page.session.select(page.links[0], SelectOptions::default());
    page.session.update_style("color", "navy").expect("update");
    page.session.update_style("color", "teal !important").expect("update");
    let before = page.session.store().css_text();

    assert!(page.session.undo());
    assert_rule(&page.session, ".link", "color", Some("navy"));
    assert!(page.session.redo());
    assert_eq!(page.session.store().css_text(), before);
}

#[test]
fn test_history_truncates_on_branch() {
    let mut page = TestPage::new();
    page.session.select(page.main, SelectOptions::default());
    for value in ["1px", "2px", "3px"] {
        page.session.update_style("margin", value).expect("update");
    }
    page.session.undo();
    page.session.undo();
    assert_eq!(page.session.history().cursor(), 0);

    page.session.update_style("margin", "9px").expect("update");
    assert_eq!(page.session.history().len(), 2);
    assert!(!page.session.can_redo());
    assert_rule(&page.session, "#content", "margin", Some("9px"));
}

#[test]
fn test_batch_edit_is_one_step() {
    let mut page = TestPage::new();
    page.session.select_multiple(&[page.header, page.cards[0], page.links[2]]);
    assert_eq!(page.session.update_style("opacity", "0.8").expect("update"), 3);

    assert!(page.session.undo());
    assert!(page.session.store().is_empty());
    assert!(!page.session.can_undo());

    assert!(page.session.redo());
    assert_rule(&page.session, ".site-header", "opacity", Some("0.8"));
    assert_rule(&page.session, ".card", "opacity", Some("0.8"));
    assert_rule(&page.session, ".link", "opacity", Some("0.8"));
}

#[test]
fn test_counter_tracks_mutations() {
    let mut page = TestPage::new();
    page.session.select(page.header, SelectOptions::default());
    assert_eq!(page.session.style_change_counter(), 0);
    page.session.update_style("color", "red").expect("update");
    page.session.undo();
    page.session.redo();
    assert_eq!(page.session.style_change_counter(), 3);
    assert!(!page.session.redo());
    assert_eq!(page.session.style_change_counter(), 3);
}

#[test]
fn test_preset_writes_inline_only() {
    let mut page = TestPage::new();
    page.session.select_multiple(&[page.cards[0], page.cards[1]]);
    let written = page
        .session
        .apply_preset_to_selection(&[("box-shadow", "0 1px 3px black")]);
    assert_eq!(written, 2);
    assert!(page.session.store().is_empty());
    assert_computed(&page.session, page.cards[1], "box-shadow", Some("0 1px 3px black"));
    assert_computed(&page.session, page.cards[2], "box-shadow", None);

    page.session.undo();
    assert_computed(&page.session, page.cards[0], "box-shadow", None);
}

#[test]
fn test_toggle_symmetry() {
    let mut page = TestPage::new();
    page.session.select(page.header, SelectOptions::default());
    page.session.select(page.header, SelectOptions::toggle());
    assert!(!page.session.selection().has_selection());
}

#[test]
fn test_single_mode_collapse() {
    let mut page = TestPage::new();
    page.session.set_selection_mode(SelectionMode::Multi);
    for link in page.links.clone() {
        page.session.select(link, SelectOptions::default());
    }
    assert_eq!(page.session.selection().len(), 3);

    page.session.set_selection_mode(SelectionMode::Single);
    assert_selection(&page.session, &[page.links[0]]);
}

#[test]
fn test_range_mode_extends_across_siblings() {
    let mut page = TestPage::new();
    page.session.set_selection_mode(SelectionMode::Range);
    page.session.select(page.links[0], SelectOptions::default());
    page.session.select(page.links[2], SelectOptions::default());
    assert_selection(&page.session, &page.links.clone());
}

#[test]
fn test_listeners_notified_synchronously() {
    let mut page = TestPage::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let id = page
        .session
        .selection_mut()
        .subscribe(move |change| sink.borrow_mut().push((change.reason, change.count)));

    page.session.select(page.cards[0], SelectOptions::default());
    page.session.select(page.cards[1], SelectOptions::add());
    page.session.apply_preset_to_selection(&[("outline", "none")]);
    page.session.clear_selection();

    assert_eq!(
        *seen.borrow(),
        vec![
            (ChangeReason::Replaced, 1),
            (ChangeReason::Selected, 2),
            (ChangeReason::StyleApplied, 2),
            (ChangeReason::Cleared, 0),
        ]
    );
    assert!(page.session.selection_mut().unsubscribe(id));
}
