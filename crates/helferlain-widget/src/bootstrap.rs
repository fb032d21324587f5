//! Declarative auto-discovery.
//!
//! Elements carrying `data-bot-id` are turned into widgets, once each:
//! the init marker is written before initialization is attempted, so a
//! rescan (or overlapping watcher polls) can never double-instantiate.

use helferlain_config::WidgetOptions;
use helferlain_view::{Document, DocumentWatcher, NodeId};

/// Marker attribute guaranteeing at-most-once instantiation per element.
pub const INIT_MARKER: &str = "data-helferlain-initialized";

/// Watches the document for inserted embed elements. Discovery only
/// happens while a watcher is started, and polling is explicit, so the
/// whole mechanism is deterministic under test.
#[derive(Default)]
pub struct Bootstrapper {
    watcher: Option<DocumentWatcher>,
}

impl Bootstrapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, doc: &Document) {
        if self.watcher.is_none() {
            self.watcher = Some(doc.watch());
        }
    }

    pub fn stop(&mut self) {
        self.watcher = None;
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    /// True when insertions happened since the last poll and a rescan is
    /// warranted.
    pub fn poll(&mut self, doc: &Document) -> bool {
        match &mut self.watcher {
            Some(watcher) => !watcher.poll(doc).is_empty(),
            None => false,
        }
    }
}

/// Collect unmarked embed elements, mark them, and derive their widget
/// options. The element itself becomes the mount target.
pub fn discover(doc: &mut Document) -> Vec<WidgetOptions> {
    let candidates: Vec<NodeId> = doc
        .elements_with_attr("data-bot-id")
        .into_iter()
        .filter(|&id| doc.attr(id, INIT_MARKER).is_none())
        .collect();

    let mut found = Vec::new();
    for node in candidates {
        doc.set_attr(node, INIT_MARKER, "true");

        let attrs = doc
            .node(node)
            .map(|n| n.attrs.clone())
            .unwrap_or_default();
        let mut options = WidgetOptions::from_attrs(&attrs);

        let element_id = match doc.attr(node, "id") {
            Some(existing) => existing.to_string(),
            None => {
                let derived = format!("helferlain-embed-{node}");
                doc.set_attr(node, "id", &derived);
                derived
            }
        };
        options.target = Some(element_id);
        found.push(options);
    }
    found
}
