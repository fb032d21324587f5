//! View layer of the HelferLain widget.
//!
//! Widgets never write markup strings; they build typed node trees in a
//! [`document::Document`] that stands in for the host page. The chat
//! interface is assembled by builder functions in [`chat`], styled by the
//! generated stylesheet in [`theme`], and message text goes through the
//! escape/autolink/linebreak pipeline in [`format`].

pub mod chat;
pub mod document;
pub mod format;
pub mod theme;

pub use chat::{ChatShell, MessageRole, MessageView, ShellParams, SourceView, widget_element_id};
pub use document::{
    ColorScheme, CustomEvent, Document, DocumentWatcher, ListenerId, ListenerKind, Node, NodeId,
    NodeKind,
};
pub use theme::{ResolvedTheme, SHARED_STYLE_ID, ThemeTokens};
