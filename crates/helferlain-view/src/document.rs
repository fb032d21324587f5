//! Typed element-tree model of the host page.
//!
//! A [`Document`] is a flat map of nodes addressed by id, with a `body`
//! subtree for content and a `head` subtree for stylesheets. It carries
//! the pieces of page state the widget interacts with: a color-scheme
//! hint, a custom-event log, document-level listeners, an input focus,
//! an insertion journal consumed by [`DocumentWatcher`], and an optional
//! prompt handler standing in for a blocking user dialog.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::format::{escape_attr, escape_html};

pub type NodeId = u64;
pub type ListenerId = u64;

/// Host color-scheme hint, used when the widget theme is `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Container,
    Text { content: String },
    Link { href: String, label: String },
    LineBreak,
    Image { src: String, alt: String },
    Button { label: String },
    Input { value: String, placeholder: String, disabled: bool },
    Style { css: String },
    StyleLink { href: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    #[serde(skip)]
    pub parent: Option<NodeId>,
}

/// Kinds of document-level listeners a widget can install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Click,
    Key,
}

/// Entry in the document's custom-event log, the native-event-bus side
/// of the widget's event bridge.
#[derive(Debug, Clone)]
pub struct CustomEvent {
    pub name: String,
    pub detail: serde_json::Value,
}

type PromptHandler = Box<dyn FnMut(&str) -> Option<String>>;

pub struct Document {
    nodes: BTreeMap<NodeId, Node>,
    next_node: NodeId,
    body: NodeId,
    head: NodeId,
    color_scheme: ColorScheme,
    events: Vec<CustomEvent>,
    listeners: Vec<(ListenerId, ListenerKind)>,
    next_listener: ListenerId,
    insertions: Vec<NodeId>,
    focus: Option<NodeId>,
    prompt_handler: Option<PromptHandler>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: BTreeMap::new(),
            next_node: 1,
            body: 0,
            head: 0,
            color_scheme: ColorScheme::Light,
            events: Vec::new(),
            listeners: Vec::new(),
            next_listener: 1,
            insertions: Vec::new(),
            focus: None,
            prompt_handler: None,
        };
        doc.head = doc.create(NodeKind::Container);
        doc.body = doc.create(NodeKind::Container);
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Create a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                kind,
                attrs: BTreeMap::new(),
                classes: Vec::new(),
                children: Vec::new(),
                parent: None,
            },
        );
        id
    }

    /// Append `child` under `parent`. Appending into an attached parent
    /// records the subtree root in the insertion journal, which is what
    /// [`DocumentWatcher`] observes.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            tracing::warn!(parent, child, "append on missing node ignored");
            return;
        }
        if let Some(old_parent) = self.nodes.get(&child).and_then(|n| n.parent) {
            if let Some(node) = self.nodes.get_mut(&old_parent) {
                node.children.retain(|&c| c != child);
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if self.is_attached(parent) {
            self.insertions.push(child);
        }
    }

    /// Remove a node and its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.retain(|&c| c != id);
            }
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
                if self.focus == Some(current) {
                    self.focus = None;
                }
            }
        }
    }

    /// True if walking `id`'s parents reaches body or head.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.body || node_id == self.head {
                return true;
            }
            current = self.nodes.get(&node_id).and_then(|n| n.parent);
        }
        false
    }

    /// True if `node` is `ancestor` or lies in its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.nodes.get(&node_id).and_then(|n| n.parent);
        }
        false
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(&id).and_then(|n| n.attrs.get(name)).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attrs.remove(name);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes
            .get(&id)
            .map(|n| n.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.classes.retain(|c| c != class);
        }
    }

    /// Find an element by its `id` attribute.
    pub fn element_by_id(&self, dom_id: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.attrs.get("id").map(String::as_str) == Some(dom_id))
            .map(|n| n.id)
    }

    /// All attached elements carrying the given attribute, in creation order.
    pub fn elements_with_attr(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.attrs.contains_key(name))
            .filter(|n| self.is_attached(n.id))
            .map(|n| n.id)
            .collect()
    }

    /// Nodes under `root` (inclusive) carrying `class`.
    pub fn descendants_with_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                if node.classes.iter().any(|c| c == class) {
                    found.push(current);
                }
                stack.extend(node.children.iter().rev());
            }
        }
        found
    }

    /// Concatenated text of a subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                match &node.kind {
                    NodeKind::Text { content } => out.push_str(content),
                    NodeKind::Link { label, .. } => out.push_str(label),
                    NodeKind::Button { label } => out.push_str(label),
                    NodeKind::LineBreak => out.push('\n'),
                    _ => {}
                }
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    // ----- input elements -----

    pub fn input_value(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Input { value, .. }) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn set_input_value(&mut self, id: NodeId, new_value: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if let NodeKind::Input { value, .. } = &mut node.kind {
                *value = new_value.into();
            }
        }
    }

    pub fn set_input_disabled(&mut self, id: NodeId, is_disabled: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if let NodeKind::Input { disabled, .. } = &mut node.kind {
                *disabled = is_disabled;
            }
        }
    }

    pub fn input_disabled(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(&id).map(|n| &n.kind),
            Some(NodeKind::Input { disabled: true, .. })
        )
    }

    pub fn set_focus(&mut self, id: Option<NodeId>) {
        self.focus = id;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focus
    }

    // ----- head stylesheets -----

    /// Insert a style element with the given id attribute, once. Returns
    /// true if this call inserted it.
    pub fn ensure_head_style(&mut self, style_id: &str, css: &str) -> bool {
        if self.element_by_id(style_id).is_some() {
            return false;
        }
        let style = self.create(NodeKind::Style { css: css.to_string() });
        self.set_attr(style, "id", style_id);
        let head = self.head;
        self.append(head, style);
        true
    }

    pub fn has_head_style(&self, style_id: &str) -> bool {
        self.element_by_id(style_id).is_some()
    }

    pub fn remove_head_style(&mut self, style_id: &str) {
        if let Some(id) = self.element_by_id(style_id) {
            self.remove(id);
        }
    }

    // ----- color scheme -----

    pub fn set_color_scheme(&mut self, scheme: ColorScheme) {
        self.color_scheme = scheme;
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.color_scheme
    }

    // ----- listeners & events -----

    pub fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, kind));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|(lid, _)| *lid == id)
    }

    pub fn listener_count(&self, kind: ListenerKind) -> usize {
        self.listeners.iter().filter(|(_, k)| *k == kind).count()
    }

    pub fn dispatch_custom_event(&mut self, name: &str, detail: serde_json::Value) {
        self.events.push(CustomEvent {
            name: name.to_string(),
            detail,
        });
    }

    pub fn events(&self) -> &[CustomEvent] {
        &self.events
    }

    pub fn events_named(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name == name).count()
    }

    // ----- prompt -----

    /// Install the host's blocking-dialog handler. Without one, prompts
    /// resolve to `None`.
    pub fn set_prompt_handler(&mut self, handler: impl FnMut(&str) -> Option<String> + 'static) {
        self.prompt_handler = Some(Box::new(handler));
    }

    pub fn prompt(&mut self, message: &str) -> Option<String> {
        match &mut self.prompt_handler {
            Some(handler) => handler(message),
            None => None,
        }
    }

    // ----- watcher -----

    /// Start observing insertions from the current journal position.
    pub fn watch(&self) -> DocumentWatcher {
        DocumentWatcher {
            cursor: self.insertions.len(),
        }
    }

    fn insertions_since(&self, cursor: usize) -> &[NodeId] {
        &self.insertions[cursor.min(self.insertions.len())..]
    }

    // ----- rendering -----

    /// Serialize a subtree to HTML with all text and attribute values
    /// escaped. Used for demos and snapshot-style assertions.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };

        let mut attrs = String::new();
        if !node.classes.is_empty() {
            attrs.push_str(&format!(" class=\"{}\"", escape_attr(&node.classes.join(" "))));
        }
        for (name, value) in &node.attrs {
            attrs.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
        }

        match &node.kind {
            NodeKind::Container => {
                out.push_str(&format!("<div{attrs}>"));
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</div>");
            }
            NodeKind::Text { content } => out.push_str(&escape_html(content)),
            NodeKind::Link { href, label } => out.push_str(&format!(
                "<a{attrs} href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                escape_attr(href),
                escape_html(label)
            )),
            NodeKind::LineBreak => out.push_str("<br>"),
            NodeKind::Image { src, alt } => out.push_str(&format!(
                "<img{attrs} src=\"{}\" alt=\"{}\">",
                escape_attr(src),
                escape_attr(alt)
            )),
            NodeKind::Button { label } => {
                out.push_str(&format!("<button{attrs}>{}</button>", escape_html(label)));
            }
            NodeKind::Input {
                value,
                placeholder,
                disabled,
            } => {
                let disabled_attr = if *disabled { " disabled" } else { "" };
                out.push_str(&format!(
                    "<input{attrs} value=\"{}\" placeholder=\"{}\"{disabled_attr}>",
                    escape_attr(value),
                    escape_attr(placeholder)
                ));
            }
            NodeKind::Style { css } => {
                out.push_str(&format!("<style{attrs}>{css}</style>"));
            }
            NodeKind::StyleLink { href } => {
                out.push_str(&format!(
                    "<link{attrs} rel=\"stylesheet\" href=\"{}\">",
                    escape_attr(href)
                ));
            }
        }
    }
}

/// Cursor over the document's insertion journal. The declarative
/// bootstrapper polls this instead of relying on callback timing, so
/// dynamic-embed discovery is deterministic and can be switched off by
/// dropping the watcher.
#[derive(Debug)]
pub struct DocumentWatcher {
    cursor: usize,
}

impl DocumentWatcher {
    /// Subtree roots inserted since the last poll.
    pub fn poll(&mut self, doc: &Document) -> Vec<NodeId> {
        let new: Vec<NodeId> = doc.insertions_since(self.cursor).to_vec();
        self.cursor += new.len();
        new
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_remove_subtree() {
        let mut doc = Document::new();
        let outer = doc.create(NodeKind::Container);
        let inner = doc.create(NodeKind::Text {
            content: "hi".into(),
        });
        doc.append(outer, inner);
        let body = doc.body();
        doc.append(body, outer);

        assert!(doc.contains(outer, inner));
        assert!(doc.is_attached(inner));

        doc.remove(outer);
        assert!(doc.node(outer).is_none());
        assert!(doc.node(inner).is_none());
    }

    #[test]
    fn watcher_sees_attached_insertions_only() {
        let mut doc = Document::new();
        let mut watcher = doc.watch();

        // Building a detached subtree is invisible.
        let detached = doc.create(NodeKind::Container);
        let child = doc.create(NodeKind::Container);
        doc.append(detached, child);
        assert!(watcher.poll(&doc).is_empty());

        // Mounting it journals the subtree root once.
        let body = doc.body();
        doc.append(body, detached);
        assert_eq!(watcher.poll(&doc), vec![detached]);
        assert!(watcher.poll(&doc).is_empty());
    }

    #[test]
    fn head_style_is_idempotent() {
        let mut doc = Document::new();
        assert!(doc.ensure_head_style("styles", "body{}"));
        assert!(!doc.ensure_head_style("styles", "body{}"));
        assert!(doc.has_head_style("styles"));

        doc.remove_head_style("styles");
        assert!(!doc.has_head_style("styles"));
        assert!(doc.ensure_head_style("styles", "body{}"));
    }

    #[test]
    fn element_lookup_by_id_and_attr() {
        let mut doc = Document::new();
        let node = doc.create(NodeKind::Container);
        doc.set_attr(node, "id", "my-widget");
        doc.set_attr(node, "data-bot-id", "abc");
        let body = doc.body();
        doc.append(body, node);

        assert_eq!(doc.element_by_id("my-widget"), Some(node));
        assert_eq!(doc.elements_with_attr("data-bot-id"), vec![node]);
        assert_eq!(doc.element_by_id("other"), None);
    }

    #[test]
    fn detached_elements_not_discoverable() {
        let mut doc = Document::new();
        let node = doc.create(NodeKind::Container);
        doc.set_attr(node, "data-bot-id", "abc");
        assert!(doc.elements_with_attr("data-bot-id").is_empty());
    }

    #[test]
    fn listeners_add_remove() {
        let mut doc = Document::new();
        let click = doc.add_listener(ListenerKind::Click);
        assert!(doc.has_listener(click));
        assert_eq!(doc.listener_count(ListenerKind::Click), 1);
        doc.remove_listener(click);
        assert!(!doc.has_listener(click));
    }

    #[test]
    fn to_html_escapes_content() {
        let mut doc = Document::new();
        let node = doc.create(NodeKind::Text {
            content: "<script>alert(1)</script>".into(),
        });
        let html = doc.to_html(node);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn to_html_renders_input_state() {
        let mut doc = Document::new();
        let input = doc.create(NodeKind::Input {
            value: String::new(),
            placeholder: "Nachricht schreiben...".into(),
            disabled: true,
        });
        let html = doc.to_html(input);
        assert!(html.contains("placeholder=\"Nachricht schreiben...\""));
        assert!(html.ends_with(" disabled>"));
    }

    #[test]
    fn prompt_defaults_to_none() {
        let mut doc = Document::new();
        assert_eq!(doc.prompt("email?"), None);

        doc.set_prompt_handler(|_| Some("a@b.de".into()));
        assert_eq!(doc.prompt("email?"), Some("a@b.de".into()));
    }

    #[test]
    fn focus_cleared_when_node_removed() {
        let mut doc = Document::new();
        let node = doc.create(NodeKind::Container);
        let body = doc.body();
        doc.append(body, node);
        doc.set_focus(Some(node));
        doc.remove(node);
        assert_eq!(doc.focused(), None);
    }
}
