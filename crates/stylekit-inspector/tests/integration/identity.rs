//! Identity integration tests
//!
//! These tests verify that element paths:
//! - Are deterministic and human-readable
//! - Resolve back to the node they were computed for
//! - Never mention inspector-owned nodes
//! - Degrade to identity misses, not errors, after the tree changes

use stylekit_inspector::{ChangeReason, SelectOptions, PATH_FORMAT_VERSION};

use crate::support::{assert_selection, TestPage};

#[test]
fn test_paths_are_readable() {
    let page = TestPage::new();
    assert_eq!(page.path_of(page.header), "body > header#top");
    assert_eq!(page.path_of(page.main), "body > main#content");
    assert_eq!(
        page.path_of(page.links[1]),
        "body > header#top > nav.menu > a.link:nth-of-type(2)"
    );
    assert_eq!(
        page.path_of(page.cards[0]),
        "body > main#content > div.card:nth-of-type(1)"
    );
    assert_eq!(
        page.path_of(page.cards[2]),
        "body > main#content > div.card.featured"
    );
}

#[test]
fn test_path_determinism() {
    let page = TestPage::new();
    for node in page.links.iter().chain(&page.cards) {
        assert_eq!(page.path_of(*node), page.path_of(*node));
    }
}

#[test]
fn test_every_path_resolves_to_its_node() {
    let page = TestPage::new();
    let resolver = page.session.selection().resolver();
    let doc = page.session.document();
    let nodes = [page.header, page.main, page.badge]
        .into_iter()
        .chain(page.links.iter().copied())
        .chain(page.cards.iter().copied());
    for node in nodes {
        let path = page.path_of(node);
        assert_eq!(resolver.resolve_path(doc, &path), Some(node), "path {}", path);
    }
}

#[test]
fn test_distinct_nodes_get_distinct_paths() {
    let page = TestPage::new();
    let mut paths: Vec<String> = page
        .links
        .iter()
        .chain(&page.cards)
        .map(|n| page.path_of(*n))
        .collect();
    let total = paths.len();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), total);
}

#[test]
fn test_tooling_subtree_is_never_addressed() {
    let mut page = TestPage::new();
    let resolver = page.session.selection().resolver();
    let doc = page.session.document();
    assert!(resolver.compute_path(doc, page.overlay_badge).is_none());
    assert_eq!(page.path_of(page.badge), "body > span.badge");
    assert_eq!(resolver.resolve_path(doc, "body span.badge"), Some(page.badge));

    assert!(!page.session.select(page.overlay, SelectOptions::default()));
    assert!(!page.session.select(page.overlay_badge, SelectOptions::default()));
    assert!(!page.session.selection().has_selection());
    assert_eq!(page.session.selector_for(page.overlay), None);
    assert_eq!(page.session.selector_for(page.overlay_badge), None);

    assert!(page.session.select(page.badge, SelectOptions::default()));
    assert_eq!(page.session.selector_for(page.badge).as_deref(), Some(".badge"));
}

#[test]
fn test_preset_undo_targets_page_node() {
    let mut page = TestPage::new();
    page.session.select(page.badge, SelectOptions::default());
    page.session.apply_preset_to_selection(&[("color", "red")]);
    page.session.undo();
    page.session.redo();

    let doc = page.session.document();
    assert_eq!(doc.inline_style(page.badge, "color"), Some("red"));
    assert_eq!(doc.inline_style(page.overlay_badge, "color"), None);
}

#[test]
fn test_refresh_drops_removed_members() {
    let mut page = TestPage::new();
    page.session
        .select_multiple(&[page.cards[0], page.cards[1], page.links[0]]);

    let reasons = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&reasons);
    page.session
        .selection_mut()
        .subscribe(move |change| sink.borrow_mut().push(change.reason));

    let card = page.cards[0];
    page.session.document_mut().detach(card).expect("detach card");
    assert_eq!(page.session.refresh_selection(), 1);
    assert_selection(&page.session, &[page.cards[1], page.links[0]]);
    assert_eq!(*reasons.borrow(), vec![ChangeReason::Refreshed]);
}

#[test]
fn test_refresh_recomputes_shifted_paths() {
    let mut page = TestPage::new();
    page.session.select(page.cards[1], SelectOptions::default());
    let before = page.path_of(page.cards[1]);

    let card = page.cards[0];
    page.session.document_mut().detach(card).expect("detach card");
    page.session.refresh_selection();

    let after = page.session.selection().primary_element().expect("primary").key().to_string();
    assert_eq!(before, "body > main#content > div.card:nth-of-type(2)");
    assert_eq!(after, "body > main#content > div.card:nth-of-type(1)");
}

#[test]
fn test_stale_path_is_identity_miss() {
    let mut page = TestPage::new();
    let path = page.path_of(page.cards[2]);
    let card = page.cards[2];
    page.session.document_mut().detach(card).expect("detach card");

    assert!(!page.session.select_by_path(&path, SelectOptions::default()));
    assert!(!page.session.selection().has_selection());
}

#[test]
fn test_persisted_paths_check_version() {
    let page = TestPage::new();
    let resolver = page.session.selection().resolver();
    let doc = page.session.document();
    let path = resolver.compute_path(doc, page.links[2]).expect("path");

    let stored = resolver.persist(&path);
    let json = serde_json::to_string(&stored).expect("serialize");
    let mut loaded: stylekit_inspector::PersistedPath = serde_json::from_str(&json).expect("parse");
    assert_eq!(loaded.version, PATH_FORMAT_VERSION);
    assert_eq!(resolver.resolve_persisted(doc, &loaded), Some(page.links[2]));

    loaded.version = 0;
    assert!(loaded.validate().is_err());
    assert_eq!(resolver.resolve_persisted(doc, &loaded), None);
}
