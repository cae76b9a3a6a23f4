//! Persistence integration tests
//!
//! These tests verify that:
//! - JSON export round-trips through import
//! - Saved sessions survive a reopen of the backing file
//! - Malformed input is reported, never propagated
//! - Token exports are derived from the current styles

use stylekit_inspector::export::TokenCategory;
use stylekit_inspector::{JsonFileBackend, MemoryBackend, SnapshotStore};

use crate::support::{assert_rule, TestPage};

fn styled_page() -> TestPage {
    let mut page = TestPage::new();
    page.session
        .update_style_for(".card", "background-color", "#fff")
        .expect("update");
    page.session
        .update_style_for(".card", "border-radius", "8px")
        .expect("update");
    page.session
        .update_style_for(".link", "color", "rgb(0, 0, 255)")
        .expect("update");
    page.session
        .update_style_for("#content", "padding", "16px 24px")
        .expect("update");
    page
}

#[test]
fn test_export_json_round_trip() {
    let source = styled_page();
    let json = source.session.export_json().expect("export");

    let mut target = TestPage::new();
    assert!(target.session.import_json(&json));
    assert_eq!(target.session.store().all_styles(), source.session.store().all_styles());
}

#[test]
fn test_import_is_undoable() {
    let mut page = TestPage::new();
    assert!(page.session.import_json(r#"{".card": {"margin": "0", "color": "red"}}"#));
    assert_rule(&page.session, ".card", "margin", Some("0"));
    page.session.undo();
    assert!(page.session.store().is_empty());
}

#[test]
fn test_malformed_import_changes_nothing() {
    let mut page = styled_page();
    let before = page.session.store().all_styles();
    assert!(!page.session.import_json("{\"unterminated"));
    assert!(!page.session.import_json("[]"));
    assert_eq!(page.session.store().all_styles(), before);
}

#[test]
fn test_export_css_blocks() {
    let page = styled_page();
    let css = page.session.export_css();
    assert!(css.starts_with(".card {\n  background-color: #fff;\n  border-radius: 8px;\n}\n"));
    assert!(css.contains("#content {\n  padding: 16px 24px;\n}\n"));
}

#[test]
fn test_snapshots_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    let mut page = styled_page();

    let saved = {
        let mut snapshots = SnapshotStore::open(JsonFileBackend::new(&path));
        page.session
            .save_snapshot(&mut snapshots, "Cards")
            .expect("save")
    };

    page.session.clear_styles();
    assert!(page.session.store().is_empty());

    let snapshots = SnapshotStore::open(JsonFileBackend::new(&path));
    let loaded = snapshots.load(&saved.id).expect("saved session");
    assert_eq!(loaded.name, "Cards");
    assert_eq!(page.session.restore_snapshot(loaded), 4);
    assert_rule(&page.session, ".link", "color", Some("rgb(0, 0, 255)"));
}

#[test]
fn test_corrupt_snapshot_file_opens_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    std::fs::write(&path, "not json at all").expect("write");

    let mut snapshots = SnapshotStore::open(JsonFileBackend::new(&path));
    assert!(snapshots.list().is_empty());
    assert!(!snapshots.import_json("{\"broken\""));
    assert!(snapshots.import_json(r#"{".a": {"color": "red"}}"#));
    assert_eq!(snapshots.list().len(), 1);
}

#[test]
fn test_snapshot_export_import_between_stores() {
    let page = styled_page();
    let mut first = SnapshotStore::open(MemoryBackend::new());
    page.session.save_snapshot(&mut first, "A").expect("save");
    page.session.save_snapshot(&mut first, "B").expect("save");

    let mut second = SnapshotStore::open(MemoryBackend::new());
    assert!(second.import_json(&first.export_json().expect("export")));
    assert_eq!(second.list(), first.list());
}

#[test]
fn test_design_tokens_and_tailwind() {
    let page = styled_page();
    let tokens = page.session.export_design_tokens();
    let colors: Vec<&str> = tokens
        .iter()
        .filter(|t| t.category == TokenCategory::Color)
        .map(|t| t.value.as_str())
        .collect();
    assert_eq!(colors, vec!["#ffffff", "#0000ff"]);
    let spacing = tokens
        .iter()
        .find(|t| t.category == TokenCategory::Spacing)
        .expect("spacing token");
    assert_eq!(spacing.value, "16px 24px");
    assert_eq!(spacing.description, "Used by #content (padding)");

    let config = serde_json::to_value(page.session.export_tailwind_config()).expect("json");
    let extend = &config["theme"]["extend"];
    assert_eq!(extend["colors"]["color-2"], "#0000ff");
    assert_eq!(extend["borderRadius"]["radius-1"], "8px");
    assert_eq!(extend["spacing"]["spacing-1"], "16px 24px");
}
