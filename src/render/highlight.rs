// src/render/highlight.rs
// =============================================================================
// This module turns (note text + status table) into a display tree.
//
// How it works:
// 1. Split the text on '\n'
// 2. In each line, find the URLs and cut the line into text and link pieces
// 3. Every link gets a highlight class based on its status
// 4. Put an explicit Break node between lines
//
// The whole tree is rebuilt every time something changes. Notes are short, so
// throwing the old tree away is simpler than patching it.
//
// Rust concepts:
// - Enums with data: Node is either text, a link, or a line break
// - Iterators: chars().count() so caret offsets work with non-ASCII text
// =============================================================================

use serde::Serialize;

use crate::checker::{extract_spans, LinkState, LinkStatus, StatusTable};

/// The four ways a URL can be painted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightClass {
    /// No record yet (the default look)
    Unchecked,
    Checking,
    Reachable,
    Unreachable,
}

impl HighlightClass {
    pub fn of(status: Option<&LinkStatus>) -> Self {
        match status.map(|s| s.state) {
            None => HighlightClass::Unchecked,
            Some(LinkState::Checking) => HighlightClass::Checking,
            Some(LinkState::Reachable) => HighlightClass::Reachable,
            Some(LinkState::Unreachable) => HighlightClass::Unreachable,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HighlightClass::Unchecked => "unchecked",
            HighlightClass::Checking => "checking",
            HighlightClass::Reachable => "reachable",
            HighlightClass::Unreachable => "unreachable",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            HighlightClass::Unchecked => "link-unchecked",
            HighlightClass::Checking => "link-checking",
            HighlightClass::Reachable => "link-reachable",
            HighlightClass::Unreachable => "link-unreachable",
        }
    }
}

/// A clickable, highlighted URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkNode {
    pub url: String,
    pub class: HighlightClass,
    /// Tooltip: what clicking does, plus the failure reason if there is one
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Text { text: String },
    Link(LinkNode),
    Break,
}

impl Node {
    /// How many characters of visible text this node stands for
    pub fn char_len(&self) -> usize {
        match self {
            Node::Text { text } => text.chars().count(),
            Node::Link(link) => link.url.chars().count(),
            Node::Break => 1,
        }
    }
}

/// The rebuilt display of a note
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rendered {
    nodes: Vec<Node>,
}

impl Rendered {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkNode> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Link(link) => Some(link),
            _ => None,
        })
    }

    /// Reads the text back out of the display, breaks included
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text { text } => out.push_str(text),
                Node::Link(link) => out.push_str(&link.url),
                Node::Break => out.push('\n'),
            }
        }
        out
    }

    // Serializes the display as HTML
    //
    // Links open in a new tab with no way back to this page
    // (rel="noopener noreferrer")
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text { text } => out.push_str(&html_escape(text)),
                Node::Link(link) => {
                    out.push_str(&format!(
                        r#"<a class="link {}" href="{}" target="_blank" rel="noopener noreferrer" title="{}">{}</a>"#,
                        link.class.css_class(),
                        html_escape(&link.url),
                        html_escape(&link.title),
                        html_escape(&link.url),
                    ));
                }
                Node::Break => out.push_str("<br>"),
            }
        }
        out
    }

    /// Plain-text view for terminals: every URL followed by its status in brackets.
    pub fn to_annotated_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text { text } => out.push_str(text),
                Node::Link(link) => {
                    out.push_str(&format!("{} [{}]", link.url, link.class.label()));
                }
                Node::Break => out.push('\n'),
            }
        }
        out
    }
}

// Builds the display tree for a note
//
// Parameters:
//   text: the current note text (always the source of truth for positions)
//   table: statuses by URL; URLs without a record render as unchecked
//
// Returns: a fresh Rendered tree
pub fn render(text: &str, table: &StatusTable) -> Rendered {
    let mut nodes = Vec::new();

    for (line_index, line) in text.split('\n').enumerate() {
        if line_index > 0 {
            nodes.push(Node::Break);
        }

        let mut last = 0;
        for span in extract_spans(line) {
            if span.start > last {
                nodes.push(Node::Text {
                    text: line[last..span.start].to_string(),
                });
            }

            let status = table.get(span.url);
            nodes.push(Node::Link(LinkNode {
                url: span.url.to_string(),
                class: HighlightClass::of(status),
                title: link_title(span.url, status),
            }));

            last = span.end;
        }

        if last < line.len() {
            nodes.push(Node::Text {
                text: line[last..].to_string(),
            });
        }
    }

    Rendered { nodes }
}

fn link_title(url: &str, status: Option<&LinkStatus>) -> String {
    match status.and_then(|s| s.error.as_deref()) {
        Some(error) => format!("Click to open {} ({})", url, error),
        None => format!("Click to open {}", url),
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
