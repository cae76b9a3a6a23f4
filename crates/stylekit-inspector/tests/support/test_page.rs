//! Fixture page wrapped in an inspector session.

use stylekit_inspector::{Document, InspectorSession, NodeId};

/// Install a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// ```text
/// body
///   header#top.site-header
///     nav.menu
///       a.link  (x3)
///   main#content
///     div.card  (x2)
///     div.card.featured
///   span.badge
///   div[data-stylekit]
///     span.badge.stylekit-hover
/// ```
pub struct TestPage {
    pub session: InspectorSession,
    pub header: NodeId,
    pub links: Vec<NodeId>,
    pub main: NodeId,
    pub cards: Vec<NodeId>,
    pub badge: NodeId,
    pub overlay: NodeId,
    pub overlay_badge: NodeId,
}

impl TestPage {
    pub fn new() -> Self {
        init_tracing();

        let mut doc = Document::new();
        let body = doc.body();

        let header = doc.create_element_with("header", &[("id", "top"), ("class", "site-header")]);
        let nav = doc.create_element_with("nav", &[("class", "menu")]);
        doc.append_child(body, header).expect("append header");
        doc.append_child(header, nav).expect("append nav");
        let links = (0..3)
            .map(|_| {
                let link = doc.create_element_with("a", &[("class", "link")]);
                doc.append_child(nav, link).expect("append link");
                link
            })
            .collect();

        let main = doc.create_element_with("main", &[("id", "content")]);
        doc.append_child(body, main).expect("append main");
        let cards = ["card", "card", "card featured"]
            .into_iter()
            .map(|class| {
                let card = doc.create_element_with("div", &[("class", class)]);
                doc.append_child(main, card).expect("append card");
                card
            })
            .collect();

        let badge = doc.create_element_with("span", &[("class", "badge")]);
        doc.append_child(body, badge).expect("append badge");

        let overlay = doc.create_element_with("div", &[("data-stylekit", "overlay")]);
        let overlay_badge = doc.create_element_with("span", &[("class", "badge stylekit-hover")]);
        doc.append_child(body, overlay).expect("append overlay");
        doc.append_child(overlay, overlay_badge).expect("append overlay badge");

        Self {
            session: InspectorSession::new(doc),
            header,
            links,
            main,
            cards,
            badge,
            overlay,
            overlay_badge,
        }
    }

    /// Path string for `node`, which must be addressable.
    #[track_caller]
    pub fn path_of(&self, node: NodeId) -> String {
        self.session
            .selection()
            .resolver()
            .compute_path(self.session.document(), node)
            .expect("node should be addressable")
            .to_string()
    }
}
