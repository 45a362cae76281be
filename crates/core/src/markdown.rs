//! Markdown to HTML conversion for agent stage output.
//!
//! Agent output uses a small, fixed markdown subset: `##`/`###` headers, bold and italic,
//! checklists, bullet and numbered lists, `---` rules and three acuity emoji. Conversion is a
//! fixed pipeline of text rewrites applied in a set order; later steps rely on the output of
//! earlier ones (list wrapping matches the `<li>` lines produced by the bullet step, paragraph
//! cleanup matches the block tags produced by the header and list steps).
//!
//! Anything outside the subset passes through untouched. There are no parse errors.
//!
//! Numbered list lines become bare `<li>` elements and are not wrapped in an `<ol>`; the fixtures
//! rely on this output and it is kept as is.

use once_cell::sync::Lazy;
use regex::Regex;

static H3: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^### (.+)$"));
static H2: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^## (.+)$"));
static BOLD: Lazy<Regex> = Lazy::new(|| compile(r"\*\*(.+?)\*\*"));
static CHECK_OPEN: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^- \[ \] (.+)$"));
static CHECK_DONE: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^- \[x\] (.+)$"));
static BULLET: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^- (.+)$"));
static LIST_RUN: Lazy<Regex> = Lazy::new(|| compile(r"((?:<li>.*</li>\n?)+)"));
static NUMBERED: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^[0-9]+\. (.+)$"));
static EMPTY_P: Lazy<Regex> = Lazy::new(|| compile(r"<p>\s*</p>"));
static P_BEFORE_BLOCK: Lazy<Regex> = Lazy::new(|| compile(r"<p>\s*(<[hul])"));
static P_AFTER_BLOCK: Lazy<Regex> = Lazy::new(|| compile(r"(</[hul].*?>)\s*</p>"));
static RULE_LINE: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^---$"));

/// Acuity emoji and the colour each is wrapped in.
const ACUITY_EMOJI: [(&str, &str); 3] = [
    ("\u{1F534}", "#f85149"),
    ("\u{1F7E1}", "#d29922"),
    ("\u{1F7E2}", "#3fb950"),
];

const UNCHECKED_BOX: char = '\u{2610}';
const CHECKED_BOX: char = '\u{2611}';

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("invalid built-in pattern {pattern:?}: {e}"),
    }
}

/// Converts agent markdown into HTML fragments.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    /// Creates a new `MarkdownRenderer` instance.
    pub fn new() -> Self {
        Self
    }

    /// Renders `markdown` to an HTML fragment.
    ///
    /// The function is pure: the same input always yields the same output.
    ///
    /// Rule order:
    /// 1. `### ` and `## ` line headers
    /// 2. `**bold**`, then single-asterisk `*italic*`
    /// 3. checklist items (`- [ ]`, `- [x]`) and plain bullets to `<li>`
    /// 4. runs of consecutive `<li>` lines wrapped in one `<ul>`
    /// 5. numbered lines (`1. text`) to bare `<li>`
    /// 6. blank-line separated blocks to paragraphs, then cleanup of empty paragraphs and
    ///    paragraphs around headers and lists
    /// 7. lone `---` to `<hr>`
    /// 8. acuity emoji wrapped in coloured spans
    ///
    /// `\r\n` line endings are normalised to `\n` first.
    pub fn render(&self, markdown: &str) -> String {
        let markdown = markdown.replace("\r\n", "\n");
        let mut html = self.headers(&markdown);
        html = self.emphasis(&html);
        html = self.lists(&html);
        html = self.paragraphs(&html);
        html = self.rules(&html);
        self.acuity_emoji(&html)
    }

    fn headers(&self, text: &str) -> String {
        let html = H3.replace_all(text, "<h3>${1}</h3>");
        H2.replace_all(&html, "<h2>${1}</h2>").into_owned()
    }

    fn emphasis(&self, text: &str) -> String {
        let html = BOLD.replace_all(text, "<strong>${1}</strong>");
        italicize(&html)
    }

    fn lists(&self, text: &str) -> String {
        let html = CHECK_OPEN.replace_all(text, format!("<li>{UNCHECKED_BOX} ${{1}}</li>").as_str());
        let html = CHECK_DONE.replace_all(&html, format!("<li>{CHECKED_BOX} ${{1}}</li>").as_str());
        let html = BULLET.replace_all(&html, "<li>${1}</li>");
        let html = LIST_RUN.replace_all(&html, "<ul>${1}</ul>");
        NUMBERED.replace_all(&html, "<li>${1}</li>").into_owned()
    }

    fn paragraphs(&self, text: &str) -> String {
        let html = format!("<p>{}</p>", text.replace("\n\n", "</p><p>"));
        let html = EMPTY_P.replace_all(&html, "");
        let html = P_BEFORE_BLOCK.replace_all(&html, "${1}");
        P_AFTER_BLOCK.replace_all(&html, "${1}").into_owned()
    }

    fn rules(&self, text: &str) -> String {
        let html = text.replace("<p>---</p>", "<hr>");
        RULE_LINE.replace_all(&html, "<hr>").into_owned()
    }

    fn acuity_emoji(&self, text: &str) -> String {
        let mut html = text.to_string();
        for (emoji, colour) in ACUITY_EMOJI {
            if html.contains(emoji) {
                html = html.replace(
                    emoji,
                    &format!("<span style=\"color: {colour};\">{emoji}</span>"),
                );
            }
        }
        html
    }
}

/// Renders `markdown` with a default [`MarkdownRenderer`].
pub fn markdown_to_html(markdown: &str) -> String {
    MarkdownRenderer::new().render(markdown)
}

/// Wraps `*text*` in `<em>`.
///
/// An opening or closing asterisk must not touch another asterisk on either side, the content
/// is at least one character, and a match never crosses a line break. Matching is
/// shortest-first and scans left to right, resuming after each match.
fn italicize(text: &str) -> String {
    let bytes = text.as_bytes();
    let lone_star = |i: usize| {
        bytes[i] == b'*'
            && (i == 0 || bytes[i - 1] != b'*')
            && bytes.get(i + 1) != Some(&b'*')
    };

    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !lone_star(i) || matches!(bytes.get(i + 1), None | Some(b'\n')) {
            i += 1;
            continue;
        }

        let mut close = None;
        let mut j = i + 2;
        while j < bytes.len() && bytes[j - 1] != b'\n' {
            if lone_star(j) {
                close = Some(j);
                break;
            }
            j += 1;
        }

        match close {
            Some(j) => {
                out.push_str(&text[copied..i]);
                out.push_str("<em>");
                out.push_str(&text[i + 1..j]);
                out.push_str("</em>");
                copied = j + 1;
                i = j + 1;
            }
            None => i += 1,
        }
    }

    out.push_str(&text[copied..]);
    out
}
