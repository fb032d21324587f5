//! Message text formatting.
//!
//! The transformation order is fixed: HTML-escape first, then autolink
//! URL tokens, then convert newlines to breaks. Escaping must precede
//! link insertion, otherwise the generated anchor markup would itself be
//! escaped.

/// Escape `&`, `<` and `>`.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escaping for attribute values adds the quote character.
pub fn escape_attr(input: &str) -> String {
    escape_html(input).replace('"', "&quot;")
}

/// A run of plain text or a URL token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Url(&'a str),
}

/// Split on `http://` / `https://` tokens. A URL token extends to the
/// next whitespace character.
pub fn split_links(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let start = match find_url_start(rest) {
            Some(pos) => pos,
            None => {
                segments.push(Segment::Text(rest));
                break;
            }
        };
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }
        let tail = &rest[start..];
        let end = tail
            .find(|c: char| c.is_whitespace())
            .unwrap_or(tail.len());
        segments.push(Segment::Url(&tail[..end]));
        rest = &tail[end..];
    }

    segments
}

fn find_url_start(input: &str) -> Option<usize> {
    let http = input.find("http://");
    let https = input.find("https://");
    match (http, https) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Typed inline content of one message, ready for node construction.
/// Text segments stay raw here; escaping happens at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Link(String),
    Break,
}

pub fn message_inlines(raw: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for (index, line) in raw.split('\n').enumerate() {
        if index > 0 {
            inlines.push(Inline::Break);
        }
        for segment in split_links(line) {
            match segment {
                Segment::Text(text) if !text.is_empty() => {
                    inlines.push(Inline::Text(text.to_string()));
                }
                Segment::Text(_) => {}
                Segment::Url(url) => inlines.push(Inline::Link(url.to_string())),
            }
        }
    }
    inlines
}

/// The full pipeline as one pure function: escape, autolink, linebreaks.
pub fn format_message(raw: &str) -> String {
    let escaped = escape_html(raw);
    let mut linked = String::with_capacity(escaped.len());
    for segment in split_links(&escaped) {
        match segment {
            Segment::Text(text) => linked.push_str(text),
            Segment::Url(url) => linked.push_str(&format!(
                "<a href=\"{url}\" target=\"_blank\" rel=\"noopener noreferrer\">{url}</a>"
            )),
        }
    }
    linked.replace('\n', "<br>")
}
