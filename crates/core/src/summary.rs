//! Summary view of the consult note.
//!
//! The note stage can be shown in full or reduced to its "Assessment & Plan" and "Staffing
//! Summary" sections. Switching views re-renders from the stored full HTML and never restarts
//! the typing animation.

use crate::html::{self, Node};

/// Display mode of the note stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteView {
    /// Assessment and staffing sections only.
    #[default]
    Summary,
    /// The whole note.
    Full,
}

impl NoteView {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteView::Summary => "summary",
            NoteView::Full => "full",
        }
    }
}

impl std::str::FromStr for NoteView {
    type Err = crate::ConsultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(NoteView::Summary),
            "full" => Ok(NoteView::Full),
            other => Err(crate::ConsultError::InvalidInput(format!(
                "unknown note view: {other}"
            ))),
        }
    }
}

/// Separator emitted where capturing stops.
const SEPARATOR: &str = "<hr>";

fn is_summary_header(upper: &str) -> bool {
    upper.contains("ASSESSMENT") || upper.contains("STAFFING")
}

/// Reduces the full note HTML to its assessment and staffing sections.
///
/// Capturing starts at an `<h2>` mentioning ASSESSMENT or STAFFING. While capturing, a further
/// `<h2>` that mentions neither (nor PLAN) ends the capture and emits a `<hr>` separator;
/// everything else, loose text included, is kept. Returns `full_html` unchanged when nothing
/// qualifies. Loose text would be lost by a walk over element children only; it is kept here.
pub fn extract_note_summary(full_html: &str) -> String {
    let mut summary = String::new();
    let mut capturing = false;

    for node in html::top_level_nodes(full_html) {
        if matches!(&node, Node::Text(text) if text.trim().is_empty()) {
            continue;
        }
        if let Node::Element(el) = &node {
            if el.is("h2") {
                let upper = el.text_content().to_uppercase();
                if is_summary_header(&upper) {
                    capturing = true;
                    summary.push_str(&el.html);
                } else if capturing {
                    if upper.contains("PLAN") {
                        summary.push_str(&el.html);
                    } else {
                        capturing = false;
                        summary.push_str(SEPARATOR);
                    }
                }
                continue;
            }
        }

        if capturing {
            summary.push_str(node.html());
        }
    }

    if summary.is_empty() {
        full_html.to_string()
    } else {
        summary
    }
}

/// HTML to display for `view`.
pub fn note_view_html(full_html: &str, view: NoteView) -> String {
    match view {
        NoteView::Summary => extract_note_summary(full_html),
        NoteView::Full => full_html.to_string(),
    }
}
