//! Collapsible sections for completed stage output.
//!
//! Rendered stage HTML is regrouped by `<h2>`: each header owns the top-level nodes that follow
//! it up to the next `<h2>`. The first section starts open, the rest collapsed, and each one
//! toggles independently.

use crate::html::{self, Node};

/// Colour category of a section, chosen from its title.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionColor {
    RedFlag,
    Assessment,
    Imaging,
    Gaps,
    Plan,
    Uncategorized,
}

/// Keyword lists in priority order; the first list with a hit decides the colour.
const COLOR_KEYWORDS: [(SectionColor, &[&str]); 5] = [
    (SectionColor::RedFlag, &["RED FLAG"]),
    (SectionColor::Assessment, &["TRIAGE", "ASSESSMENT"]),
    (SectionColor::Imaging, &["IMAGING"]),
    (
        SectionColor::Gaps,
        &["GAP", "MISSING", "CURRENT MANAGEMENT"],
    ),
    (
        SectionColor::Plan,
        &["PLAN", "RECOMMEND", "WORKUP", "GUIDELINE", "ADDITIONAL"],
    ),
];

impl SectionColor {
    /// Classifies a section title, case-insensitively.
    pub fn classify(title: &str) -> Self {
        let upper = title.to_uppercase();
        COLOR_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k)))
            .map(|(color, _)| *color)
            .unwrap_or(SectionColor::Uncategorized)
    }

    /// CSS class applied to the section header. Empty for uncategorised sections.
    pub fn css_class(self) -> &'static str {
        match self {
            SectionColor::RedFlag => "red-flag",
            SectionColor::Assessment => "assessment",
            SectionColor::Imaging => "imaging",
            SectionColor::Gaps => "gaps",
            SectionColor::Plan => "plan-section",
            SectionColor::Uncategorized => "",
        }
    }
}

/// One header and the content that follows it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// Header text with markup removed.
    pub title: String,
    /// Inner HTML of the header, keeping any emoji spans.
    pub title_html: String,
    pub color: SectionColor,
    /// Content nodes up to the next header, concatenated.
    pub body: String,
    pub open: bool,
}

/// The sections of one completed stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sections {
    /// Content before the first header.
    pub lead: String,
    pub sections: Vec<Section>,
}

impl Sections {
    /// Groups rendered stage HTML by `<h2>`.
    ///
    /// Returns an empty set when the HTML has no `<h2>`; callers then keep the flat HTML.
    ///
    /// Content before the first header is kept in `lead` and loose text is kept in the bodies.
    /// A DOM walk over element children would drop both; do not reintroduce that.
    pub fn from_html(rendered: &str) -> Self {
        let mut lead = String::new();
        let mut sections: Vec<Section> = Vec::new();

        for node in html::top_level_nodes(rendered) {
            match &node {
                Node::Element(el) if el.is("h2") => {
                    let title = el.text_content();
                    sections.push(Section {
                        color: SectionColor::classify(&title),
                        title,
                        title_html: inner_html(&el.html).to_string(),
                        body: String::new(),
                        open: sections.is_empty(),
                    });
                }
                Node::Text(text) if text.trim().is_empty() => {}
                _ => match sections.last_mut() {
                    Some(current) => current.body.push_str(node.html()),
                    None => lead.push_str(node.html()),
                },
            }
        }

        if sections.is_empty() {
            return Self::default();
        }
        Self { lead, sections }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    /// Flips the open state of one section and returns the new state.
    ///
    /// Other sections are untouched. Returns `None` for an out-of-range index.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let section = self.sections.get_mut(index)?;
        section.open = !section.open;
        Some(section.open)
    }

    /// HTML for the collapsible layout, using `<details>` so the page works without scripts.
    pub fn to_html(&self) -> String {
        let mut out = self.lead.clone();
        for section in &self.sections {
            let open = if section.open { " open" } else { "" };
            out.push_str(&format!(
                "<details class=\"collapsible-section\"{open}><summary class=\"collapsible-header {}\"><span class=\"collapsible-title\">{}</span></summary><div class=\"collapsible-body\">{}</div></details>",
                section.color.css_class(),
                section.title_html,
                section.body
            ));
        }
        out
    }
}

fn inner_html(outer: &str) -> &str {
    let start = outer.find('>').map(|i| i + 1).unwrap_or(0);
    let end = outer.rfind("</").filter(|&e| e >= start).unwrap_or(outer.len());
    &outer[start..end]
}
