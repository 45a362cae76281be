//! Presentation surface.
//!
//! The controller pushes every visible change through [`RenderSurface`]; it never formats
//! pages itself. [`PageSurface`] keeps the latest state of each panel in memory and renders it
//! as one static HTML page, using `<details>` for the collapsible sections.

use crate::case::Case;
use crate::chart::{
    render_chart_html, render_consult_banner, render_key_findings, render_resident_input,
};
use crate::html::escape_html;
use crate::playback::Tick;
use crate::sections::Sections;
use crate::session::Session;
use crate::stage::Stage;
use crate::summary::NoteView;
use crate::{ConsultError, ConsultResult};
use consult_types::CaseName;
use std::path::Path;

/// Hooks for everything the demo displays.
pub trait RenderSurface {
    /// A case finished loading and is now current.
    fn case_loaded(&mut self, name: &CaseName, case: &Case);
    /// A case could not be loaded. The previous case, if any, stays current.
    fn case_load_failed(&mut self, name: &CaseName, error: &ConsultError);
    /// All stage panels were cleared.
    fn stages_reset(&mut self);
    /// `stage` became the visible tab.
    fn stage_shown(&mut self, stage: Stage);
    /// More of `stage` is visible. `html` is everything revealed so far.
    fn stage_revealed(&mut self, stage: Stage, html: &str);
    /// `stage` is fully revealed.
    fn stage_completed(&mut self, stage: Stage);
    /// A completed non-note stage was split into collapsible sections.
    fn sections_ready(&mut self, stage: Stage, sections: &Sections);
    /// The user toggled one section.
    fn section_toggled(&mut self, stage: Stage, index: usize, open: bool);
    /// The note panel should now show `html` in `view` mode.
    fn note_view_changed(&mut self, view: NoteView, html: &str);
}

#[derive(Clone, Debug, Default)]
struct StagePanel {
    html: String,
    sections: Option<Sections>,
    completed: bool,
}

/// In-memory page model.
#[derive(Clone, Debug, Default)]
pub struct PageSurface {
    case_name: Option<CaseName>,
    header_html: String,
    chart_html: String,
    panels: [StagePanel; 4],
    shown: Option<Stage>,
    note_view: NoteView,
    error: Option<String>,
}

impl PageSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_name(&self) -> Option<&CaseName> {
        self.case_name.as_ref()
    }

    /// HTML currently shown in the panel for `stage`.
    pub fn stage_html(&self, stage: Stage) -> &str {
        &self.panels[stage.index()].html
    }

    pub fn sections(&self, stage: Stage) -> Option<&Sections> {
        self.panels[stage.index()].sections.as_ref()
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.panels[stage.index()].completed
    }

    pub fn shown_stage(&self) -> Option<Stage> {
        self.shown
    }

    pub fn note_view(&self) -> NoteView {
        self.note_view
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn stage_body(&self, stage: Stage) -> String {
        let panel = &self.panels[stage.index()];
        match &panel.sections {
            Some(sections) if !sections.is_empty() => sections.to_html(),
            _ => panel.html.clone(),
        }
    }

    /// Renders the whole page.
    pub fn render_page(&self) -> String {
        let title = self
            .case_name
            .as_ref()
            .map(|n| format!("Surgical Consult: {}", escape_html(n.as_str())))
            .unwrap_or_else(|| "Surgical Consult".to_string());

        let mut tabs = String::new();
        let mut panels = String::new();
        for stage in Stage::ALL {
            let mut class = String::from("stage-tab");
            if self.shown == Some(stage) {
                class.push_str(" active");
            }
            if self.is_completed(stage) {
                class.push_str(" completed");
            }
            tabs.push_str(&format!(
                "<span class=\"{class}\" data-stage=\"{stage}\">{}</span>",
                stage.label()
            ));

            let display = if self.shown == Some(stage) { "block" } else { "none" };
            let toggle = if stage.is_note() && self.is_completed(stage) {
                format!(
                    "<div id=\"note-view-toggle\" data-view=\"{}\"></div>",
                    self.note_view.as_str()
                )
            } else {
                String::new()
            };
            panels.push_str(&format!(
                "<div class=\"stage-content\" id=\"stage-{stage}\" style=\"display: {display}\">{toggle}{}</div>\n",
                self.stage_body(stage)
            ));
        }

        let error = self
            .error
            .as_ref()
            .map(|e| format!("<div class=\"load-error\">{}</div>\n", escape_html(e)))
            .unwrap_or_default();

        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n{error}{}\n<div id=\"chart-content\">\n{}\n</div>\n<div class=\"stage-tabs\">{tabs}</div>\n{panels}</body>\n</html>\n",
            self.header_html, self.chart_html
        )
    }

    /// Writes the rendered page to `path`.
    pub fn write_page(&self, path: &Path) -> ConsultResult<()> {
        std::fs::write(path, self.render_page()).map_err(ConsultError::FileWrite)
    }
}

impl RenderSurface for PageSurface {
    fn case_loaded(&mut self, name: &CaseName, case: &Case) {
        self.case_name = Some(name.clone());
        self.error = None;
        self.header_html = [
            render_consult_banner(&case.consult_message),
            render_key_findings(case.key_findings.as_ref()),
            render_resident_input(&case.resident_input),
        ]
        .join("\n");
        self.chart_html = render_chart_html(&case.chart);
    }

    fn case_load_failed(&mut self, name: &CaseName, error: &ConsultError) {
        self.error = Some(format!("Could not load case {name}: {error}"));
    }

    fn stages_reset(&mut self) {
        self.panels = Default::default();
        self.note_view = NoteView::Summary;
        self.shown = None;
    }

    fn stage_shown(&mut self, stage: Stage) {
        self.shown = Some(stage);
    }

    fn stage_revealed(&mut self, stage: Stage, html: &str) {
        self.panels[stage.index()].html = html.to_string();
    }

    fn stage_completed(&mut self, stage: Stage) {
        self.panels[stage.index()].completed = true;
    }

    fn sections_ready(&mut self, stage: Stage, sections: &Sections) {
        self.panels[stage.index()].sections = Some(sections.clone());
    }

    fn section_toggled(&mut self, stage: Stage, index: usize, open: bool) {
        if let Some(section) = self.panels[stage.index()]
            .sections
            .as_mut()
            .and_then(|s| s.sections.get_mut(index))
        {
            section.open = open;
        }
    }

    fn note_view_changed(&mut self, view: NoteView, html: &str) {
        self.note_view = view;
        self.panels[Stage::Note.index()].html = html.to_string();
    }
}

/// Renders `case` as a page with every stage already completed, without any timers.
///
/// The first stage is shown and the note is in summary view.
pub fn render_completed_page(name: &CaseName, case: Case) -> ConsultResult<PageSurface> {
    let mut page = PageSurface::new();
    let mut session = Session::new(usize::MAX);
    let ticket = session.begin_load(name.clone());
    page.case_loaded(name, &case);
    session.install_case(&ticket, case)?;
    page.stages_reset();

    for stage in Stage::ALL {
        session.start_stage(stage)?;
        while let Tick::Revealed { .. } = session.tick() {}
        page.stage_revealed(stage, session.playback().full_html(stage));
        if stage.is_note() {
            if let Some(html) = session.note_html() {
                page.note_view_changed(session.note_view(), &html);
            }
        } else {
            page.sections_ready(stage, session.sections(stage));
        }
        page.stage_completed(stage);
    }

    page.stage_shown(Stage::Triage);
    Ok(page)
}
