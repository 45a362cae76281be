//! Minimal HTML fragment handling.
//!
//! The section collapser and note summary work on the top-level nodes of rendered stage HTML.
//! That HTML comes from our own markdown renderer, so a small tag scanner is enough: it tracks
//! nesting depth, knows the void elements, and closes an open top-level `<p>` when a block
//! element starts inside it, the same way a browser would. Stray end tags at the top level are
//! dropped.

/// A top-level node of an HTML fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    /// Serialised form of the node.
    pub fn html(&self) -> &str {
        match self {
            Node::Element(el) => &el.html,
            Node::Text(text) => text,
        }
    }
}

/// A top-level element with its complete outer HTML.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Outer HTML, with any implied end tags made explicit.
    pub html: String,
}

impl Element {
    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Concatenated text of the element with tags removed.
    pub fn text_content(&self) -> String {
        text_content(&self.html)
    }
}

const VOID_ELEMENTS: &[&str] = &["area", "br", "col", "embed", "hr", "img", "input", "meta", "source", "wbr"];

const P_CLOSING_ELEMENTS: &[&str] = &[
    "blockquote", "div", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "ol", "p", "pre", "table", "ul",
];

enum Tag<'a> {
    Start { name: String, self_closing: bool, raw: &'a str },
    End { name: String },
}

/// Reads the tag starting at `html[start]` (which must be `<`). Returns the tag and the index
/// just past its closing `>`, or `None` if this `<` does not open a tag.
fn read_tag(html: &str, start: usize) -> Option<(Tag<'_>, usize)> {
    let rest = &html[start + 1..];
    let (is_end, name_start) = match *rest.as_bytes().first()? {
        b'/' => (true, 1),
        b if b.is_ascii_alphabetic() => (false, 0),
        _ => return None,
    };

    let close = rest.find('>')?;
    let inner = &rest[name_start..close];
    let name_len = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .unwrap_or(inner.len());
    if name_len == 0 {
        return None;
    }
    let name = inner[..name_len].to_ascii_lowercase();
    let end = start + 1 + close + 1;

    if is_end {
        Some((Tag::End { name }, end))
    } else {
        let self_closing = inner.trim_end().ends_with('/');
        Some((
            Tag::Start {
                name,
                self_closing,
                raw: &html[start..end],
            },
            end,
        ))
    }
}

/// Splits an HTML fragment into its top-level nodes.
pub fn top_level_nodes(html: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < html.len() {
        let Some(offset) = html[pos..].find('<') else {
            break;
        };
        let lt = pos + offset;

        let Some((tag, after)) = read_tag(html, lt) else {
            pos = lt + 1;
            continue;
        };

        if lt > text_start {
            nodes.push(Node::Text(html[text_start..lt].to_string()));
        }

        match tag {
            Tag::End { .. } => {
                // Stray end tag at top level.
                pos = after;
                text_start = after;
            }
            Tag::Start {
                name,
                self_closing,
                raw,
            } => {
                if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
                    nodes.push(Node::Element(Element {
                        tag: name,
                        html: raw.to_string(),
                    }));
                    pos = after;
                } else {
                    let (element, next) = read_element(html, lt, name, after);
                    nodes.push(Node::Element(element));
                    pos = next;
                }
                text_start = pos;
            }
        }
    }

    if text_start < html.len() {
        nodes.push(Node::Text(html[text_start..].to_string()));
    }

    nodes
}

/// Reads a non-void element whose start tag spans `html[start..content_start]`.
fn read_element(html: &str, start: usize, tag: String, content_start: usize) -> (Element, usize) {
    let mut stack: Vec<String> = vec![tag.clone()];
    let mut pos = content_start;

    while pos < html.len() {
        let Some(offset) = html[pos..].find('<') else {
            break;
        };
        let lt = pos + offset;
        let Some((inner, after)) = read_tag(html, lt) else {
            pos = lt + 1;
            continue;
        };

        match inner {
            Tag::Start {
                name, self_closing, ..
            } => {
                if tag == "p" && P_CLOSING_ELEMENTS.contains(&name.as_str()) {
                    let mut outer = html[start..lt].to_string();
                    close_all(&mut outer, &stack);
                    return (Element { tag, html: outer }, lt);
                }
                if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
                    stack.push(name);
                }
            }
            Tag::End { name } => {
                if let Some(depth) = stack.iter().rposition(|open| *open == name) {
                    if depth == 0 {
                        let mut outer = html[start..lt].to_string();
                        close_all(&mut outer, &stack[1..]);
                        outer.push_str(&html[lt..after]);
                        return (Element { tag, html: outer }, after);
                    }
                    stack.truncate(depth);
                }
            }
        }
        pos = after;
    }

    let mut outer = html[start..].to_string();
    close_all(&mut outer, &stack);
    (Element { tag, html: outer }, html.len())
}

fn close_all(outer: &mut String, open: &[String]) {
    for name in open.iter().rev() {
        outer.push_str("</");
        outer.push_str(name);
        outer.push('>');
    }
}

/// Text of an HTML fragment with all tags removed and the basic entities decoded.
pub fn text_content(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut pos = 0;

    while pos < html.len() {
        let Some(offset) = html[pos..].find('<') else {
            text.push_str(&html[pos..]);
            break;
        };
        let lt = pos + offset;
        text.push_str(&html[pos..lt]);
        match read_tag(html, lt) {
            Some((_, after)) => pos = after,
            None => {
                text.push('<');
                pos = lt + 1;
            }
        }
    }

    unescape_html(&text)
}

/// Escapes text for safe insertion into HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
