//! Chat interface construction.
//!
//! Builder functions assemble the widget subtree for one of the three
//! presentation modes. The subtree is built detached; the runtime mounts
//! it at the caller-supplied target or the document body.

use helferlain_config::{Mode, WidgetConfig};

use crate::document::{Document, NodeId, NodeKind};
use crate::format::{Inline, message_inlines};
use crate::theme::ThemeTokens;

/// Derived element id of a widget root.
pub fn widget_element_id(bot_id: &str) -> String {
    format!("helferlain-widget-{bot_id}")
}

/// Ids of the interactive parts of one widget's subtree.
#[derive(Debug, Clone)]
pub struct ChatShell {
    pub root: NodeId,
    /// Floating trigger, bubble mode only.
    pub trigger: Option<NodeId>,
    pub badge: Option<NodeId>,
    /// Background scrim, modal mode only.
    pub overlay: Option<NodeId>,
    pub window: NodeId,
    pub header: NodeId,
    pub close_button: Option<NodeId>,
    pub messages: NodeId,
    pub typing: NodeId,
    pub input: NodeId,
    pub send_button: NodeId,
    pub branding: Option<NodeId>,
}

pub struct ShellParams<'a> {
    pub config: &'a WidgetConfig,
    pub bot_name: &'a str,
    pub logo_url: Option<&'a str>,
    pub tokens: &'a ThemeTokens,
}

/// Build the widget subtree for the configured mode. The chat window
/// itself is identical across modes; what differs is how it is reached.
pub fn build_shell(doc: &mut Document, params: &ShellParams) -> ChatShell {
    let config = params.config;

    let root = doc.create(NodeKind::Container);
    doc.set_attr(root, "id", widget_element_id(&config.bot_id));
    doc.set_attr(root, "style", params.tokens.custom_properties());
    doc.add_class(root, "helferlain-widget");
    doc.add_class(root, &format!("helferlain-mode-{}", config.mode.as_str()));
    if config.mode != Mode::Inline {
        doc.add_class(root, &format!("helferlain-pos-{}", config.position.as_str()));
    }

    let window_parts = build_window(doc, params);

    let (trigger, badge, overlay) = match config.mode {
        Mode::Bubble => {
            let trigger = doc.create(NodeKind::Button {
                label: "Chat".to_string(),
            });
            doc.add_class(trigger, "helferlain-trigger");
            let badge = doc.create(NodeKind::Container);
            doc.add_class(badge, "helferlain-unread-badge");
            doc.add_class(badge, "helferlain-hidden");
            doc.append(trigger, badge);
            doc.append(root, trigger);

            // Window starts hidden behind the trigger.
            doc.add_class(window_parts.window, "helferlain-hidden");
            doc.append(root, window_parts.window);
            (Some(trigger), Some(badge), None)
        }
        Mode::Inline => {
            doc.append(root, window_parts.window);
            (None, None, None)
        }
        Mode::Modal => {
            let overlay = doc.create(NodeKind::Container);
            doc.add_class(overlay, "helferlain-overlay");
            doc.add_class(overlay, "helferlain-hidden");
            doc.append(overlay, window_parts.window);
            doc.append(root, overlay);
            (None, None, Some(overlay))
        }
    };

    ChatShell {
        root,
        trigger,
        badge,
        overlay,
        window: window_parts.window,
        header: window_parts.header,
        close_button: window_parts.close_button,
        messages: window_parts.messages,
        typing: window_parts.typing,
        input: window_parts.input,
        send_button: window_parts.send_button,
        branding: window_parts.branding,
    }
}

struct WindowParts {
    window: NodeId,
    header: NodeId,
    close_button: Option<NodeId>,
    messages: NodeId,
    typing: NodeId,
    input: NodeId,
    send_button: NodeId,
    branding: Option<NodeId>,
}

fn build_window(doc: &mut Document, params: &ShellParams) -> WindowParts {
    let config = params.config;
    let german = config.language.starts_with("de");

    let window = doc.create(NodeKind::Container);
    doc.add_class(window, "helferlain-window");

    // Header: avatar, name, online indicator, close (except inline).
    let header = doc.create(NodeKind::Container);
    doc.add_class(header, "helferlain-header");
    if let Some(logo_url) = params.logo_url {
        let logo = doc.create(NodeKind::Image {
            src: logo_url.to_string(),
            alt: params.bot_name.to_string(),
        });
        doc.add_class(logo, "helferlain-logo");
        doc.append(header, logo);
    }
    let title = doc.create(NodeKind::Text {
        content: params.bot_name.to_string(),
    });
    let title_wrap = doc.create(NodeKind::Container);
    doc.add_class(title_wrap, "helferlain-title");
    doc.append(title_wrap, title);
    doc.append(header, title_wrap);

    let online = doc.create(NodeKind::Container);
    doc.add_class(online, "helferlain-online-dot");
    doc.append(header, online);

    let close_button = if config.mode != Mode::Inline {
        let close = doc.create(NodeKind::Button {
            label: "×".to_string(),
        });
        doc.add_class(close, "helferlain-close");
        doc.append(header, close);
        Some(close)
    } else {
        None
    };
    doc.append(window, header);

    // Scrollable transcript.
    let messages = doc.create(NodeKind::Container);
    doc.add_class(messages, "helferlain-messages");
    doc.append(window, messages);

    // Typing indicator, hidden until a request is in flight.
    let typing = doc.create(NodeKind::Container);
    doc.add_class(typing, "helferlain-typing");
    doc.add_class(typing, "helferlain-hidden");
    for _ in 0..3 {
        let dot = doc.create(NodeKind::Container);
        doc.add_class(dot, "helferlain-typing-dot");
        doc.append(typing, dot);
    }
    doc.append(window, typing);

    // Input row.
    let input_row = doc.create(NodeKind::Container);
    doc.add_class(input_row, "helferlain-input-row");
    let input = doc.create(NodeKind::Input {
        value: String::new(),
        placeholder: config.resolved_placeholder(),
        disabled: false,
    });
    doc.add_class(input, "helferlain-input");
    doc.append(input_row, input);
    let send_button = doc.create(NodeKind::Button {
        label: if german { "Senden" } else { "Send" }.to_string(),
    });
    doc.add_class(send_button, "helferlain-send");
    doc.append(input_row, send_button);
    doc.append(window, input_row);

    let branding = if config.show_branding {
        let branding = doc.create(NodeKind::Container);
        doc.add_class(branding, "helferlain-branding");
        let prefix = doc.create(NodeKind::Text {
            content: "Powered by ".to_string(),
        });
        doc.append(branding, prefix);
        let link = doc.create(NodeKind::Link {
            href: "https://helferlain.app".to_string(),
            label: "HelferLain".to_string(),
        });
        doc.append(branding, link);
        doc.append(window, branding);
        Some(branding)
    } else {
        None
    };

    WindowParts {
        window,
        header,
        close_button,
        messages,
        typing,
        input,
        send_button,
        branding,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

pub struct SourceView<'a> {
    pub title: &'a str,
    pub url: Option<&'a str>,
}

pub struct MessageView<'a> {
    pub role: MessageRole,
    pub content: &'a str,
    pub sources: Vec<SourceView<'a>>,
    pub is_error: bool,
}

/// Render one message into the transcript and scroll it into view.
/// Content goes through the inline pipeline, so markup in message text
/// ends up as inert text nodes and URLs as typed links.
pub fn append_message_node(doc: &mut Document, list: NodeId, view: &MessageView) -> NodeId {
    let node = doc.create(NodeKind::Container);
    doc.add_class(node, "helferlain-message");
    doc.add_class(
        node,
        match view.role {
            MessageRole::User => "helferlain-user",
            MessageRole::Assistant => "helferlain-assistant",
        },
    );
    if view.is_error {
        doc.add_class(node, "helferlain-message-error");
    }

    for inline in message_inlines(view.content) {
        let child = match inline {
            Inline::Text(content) => doc.create(NodeKind::Text { content }),
            Inline::Link(url) => doc.create(NodeKind::Link {
                href: url.clone(),
                label: url,
            }),
            Inline::Break => doc.create(NodeKind::LineBreak),
        };
        doc.append(node, child);
    }

    if !view.sources.is_empty() {
        let sources = doc.create(NodeKind::Container);
        doc.add_class(sources, "helferlain-sources");
        for source in &view.sources {
            let entry = match source.url {
                Some(url) => doc.create(NodeKind::Link {
                    href: url.to_string(),
                    label: source.title.to_string(),
                }),
                None => doc.create(NodeKind::Text {
                    content: source.title.to_string(),
                }),
            };
            doc.append(sources, entry);
        }
        doc.append(node, sources);
    }

    doc.append(list, node);
    scroll_to_bottom(doc, list);
    node
}

/// Track the scroll anchor on the transcript container.
pub fn scroll_to_bottom(doc: &mut Document, list: NodeId) {
    let count = doc.children(list).len();
    doc.set_attr(list, "data-scroll", count.to_string());
}

/// Minimal inline note shown in a supplied target when init fails.
pub fn build_error_note(doc: &mut Document, text: &str) -> NodeId {
    let note = doc.create(NodeKind::Container);
    doc.add_class(note, "helferlain-error-note");
    let content = doc.create(NodeKind::Text {
        content: text.to_string(),
    });
    doc.append(note, content);
    note
}
