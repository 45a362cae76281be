//! Per-viewer session state.
//!
//! Everything that changes while a case plays lives in one [`Session`]: the loaded case, the
//! playback state, derived sections, the note view and the case-load sequence. The controller
//! owns the session; nothing is held in globals, so loading a new case resets exactly this
//! record and nothing from the previous case can leak through.

use crate::case::Case;
use crate::markdown::MarkdownRenderer;
use crate::playback::{Playback, Tick};
use crate::sections::Sections;
use crate::stage::{Stage, StageStatus};
use crate::summary::{note_view_html, NoteView};
use crate::{ConsultError, ConsultResult};
use consult_types::CaseName;

/// Identifies one case-load request.
///
/// Only the ticket from the most recent [`Session::begin_load`] is accepted; results for older
/// tickets are stale and must be discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    name: CaseName,
}

impl LoadTicket {
    pub fn name(&self) -> &CaseName {
        &self.name
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug)]
pub struct Session {
    renderer: MarkdownRenderer,
    case: Option<(CaseName, Case)>,
    playback: Playback,
    sections: [Sections; 4],
    note_view: NoteView,
    shown: Stage,
    load_seq: u64,
}

impl Session {
    /// Creates an empty session revealing `reveal_chunk` characters per tick.
    pub fn new(reveal_chunk: usize) -> Self {
        Self {
            renderer: MarkdownRenderer::new(),
            case: None,
            playback: Playback::new(reveal_chunk),
            sections: Default::default(),
            note_view: NoteView::default(),
            shown: Stage::Triage,
            load_seq: 0,
        }
    }

    /// Registers a new load request, superseding any earlier one.
    pub fn begin_load(&mut self, name: CaseName) -> LoadTicket {
        self.load_seq += 1;
        LoadTicket {
            seq: self.load_seq,
            name,
        }
    }

    /// Whether `ticket` belongs to the most recent load request.
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.seq == self.load_seq
    }

    /// Installs a loaded case and resets all stage state.
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::InvalidInput` if the ticket is stale; the session is unchanged.
    pub fn install_case(&mut self, ticket: &LoadTicket, case: Case) -> ConsultResult<()> {
        if !self.is_current(ticket) {
            return Err(ConsultError::InvalidInput(format!(
                "stale load of {} (request {} superseded by {})",
                ticket.name, ticket.seq, self.load_seq
            )));
        }

        self.case = Some((ticket.name.clone(), case));
        self.reset_stages();
        Ok(())
    }

    fn reset_stages(&mut self) {
        self.playback.reset();
        self.sections = Default::default();
        self.note_view = NoteView::Summary;
        self.shown = Stage::Triage;
    }

    pub fn case(&self) -> Option<&Case> {
        self.case.as_ref().map(|(_, case)| case)
    }

    pub fn case_name(&self) -> Option<&CaseName> {
        self.case.as_ref().map(|(name, _)| name)
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.playback.status(stage)
    }

    /// Renders `stage` from the loaded case and starts typing it.
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::InvalidInput` if no case is loaded or the stage is out of turn.
    pub fn start_stage(&mut self, stage: Stage) -> ConsultResult<()> {
        let Some((_, case)) = &self.case else {
            return Err(ConsultError::InvalidInput("no case loaded".into()));
        };
        let rendered = self.renderer.render(case.stages.get(stage));
        self.playback.begin(stage, rendered)?;
        self.shown = stage;
        tracing::debug!("stage {} started typing", stage);
        Ok(())
    }

    /// Advances the typing stage by one tick, running completion work when it finishes.
    ///
    /// Non-note stages are split into collapsible sections; the note resets to summary view.
    pub fn tick(&mut self) -> Tick {
        let tick = self.playback.tick();
        if let Tick::Completed { stage, .. } = tick {
            if stage.is_note() {
                self.note_view = NoteView::Summary;
            } else {
                self.sections[stage.index()] = Sections::from_html(self.playback.full_html(stage));
            }
            tracing::debug!("stage {} completed", stage);
        }
        tick
    }

    /// Sections of a completed non-note stage. Empty otherwise.
    pub fn sections(&self, stage: Stage) -> &Sections {
        &self.sections[stage.index()]
    }

    /// Toggles one collapsible section and returns its new open state.
    pub fn toggle_section(&mut self, stage: Stage, index: usize) -> Option<bool> {
        self.sections[stage.index()].toggle(index)
    }

    pub fn shown_stage(&self) -> Stage {
        self.shown
    }

    pub fn show_stage(&mut self, stage: Stage) {
        self.shown = stage;
    }

    pub fn note_view(&self) -> NoteView {
        self.note_view
    }

    /// Selects the note view and returns the HTML to display.
    ///
    /// Returns `None` while the note is still typing or not started; the preference is kept
    /// but nothing is rendered.
    pub fn set_note_view(&mut self, view: NoteView) -> Option<String> {
        self.note_view = view;
        self.note_html()
    }

    /// Note HTML for the current view, once the note has completed.
    pub fn note_html(&self) -> Option<String> {
        if self.playback.status(Stage::Note) != StageStatus::Completed {
            return None;
        }
        Some(note_view_html(
            self.playback.full_html(Stage::Note),
            self.note_view,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::fixtures::sample_case;

    fn loaded(tag: &str) -> Session {
        let mut session = Session::new(64);
        let ticket = session.begin_load(CaseName::new(tag).unwrap());
        session.install_case(&ticket, sample_case(tag)).unwrap();
        session
    }

    fn finish(session: &mut Session) -> Tick {
        loop {
            let tick = session.tick();
            if !matches!(tick, Tick::Revealed { .. }) {
                return tick;
            }
        }
    }

    #[test]
    fn test_stale_ticket_rejected() {
        let mut session = Session::new(5);
        let first = session.begin_load(CaseName::new("first").unwrap());
        let second = session.begin_load(CaseName::new("second").unwrap());

        assert!(session.install_case(&first, sample_case("first")).is_err());
        assert!(session.case().is_none());

        session.install_case(&second, sample_case("second")).unwrap();
        assert_eq!(session.case_name().unwrap().as_str(), "second");
    }

    #[test]
    fn test_completed_stage_gets_sections() {
        let mut session = loaded("a");
        session.start_stage(Stage::Triage).unwrap();
        assert_eq!(
            finish(&mut session),
            Tick::Completed {
                stage: Stage::Triage,
                next: Some(Stage::Context)
            }
        );

        let sections = session.sections(Stage::Triage);
        assert_eq!(sections.len(), 2);
        assert!(sections.get(0).unwrap().open);
        assert!(!sections.get(1).unwrap().open);
        assert_eq!(session.toggle_section(Stage::Triage, 1), Some(true));
    }

    #[test]
    fn test_note_view_only_renders_after_completion() {
        let mut session = loaded("a");
        for stage in [Stage::Triage, Stage::Context, Stage::Plan] {
            session.start_stage(stage).unwrap();
            finish(&mut session);
        }

        session.start_stage(Stage::Note).unwrap();
        assert_eq!(session.set_note_view(NoteView::Full), None);
        assert_eq!(session.note_view(), NoteView::Full);

        assert_eq!(
            finish(&mut session),
            Tick::Completed {
                stage: Stage::Note,
                next: None
            }
        );
        // Completion resets to summary.
        assert_eq!(session.note_view(), NoteView::Summary);
        let summary = session.note_html().unwrap();
        assert!(summary.contains("a assessment"));
        assert!(!summary.contains("a history"));

        let full = session.set_note_view(NoteView::Full).unwrap();
        assert!(full.contains("a history"));
        assert!(session.sections(Stage::Note).is_empty());
    }

    #[test]
    fn test_new_case_resets_stages() {
        let mut session = loaded("a");
        session.start_stage(Stage::Triage).unwrap();
        finish(&mut session);

        let ticket = session.begin_load(CaseName::new("b").unwrap());
        session.install_case(&ticket, sample_case("b")).unwrap();
        for stage in Stage::ALL {
            assert_eq!(session.status(stage), StageStatus::Empty);
            assert!(session.sections(stage).is_empty());
        }
        assert_eq!(session.shown_stage(), Stage::Triage);
    }

    #[test]
    fn test_start_without_case_fails() {
        let mut session = Session::new(5);
        assert!(session.start_stage(Stage::Triage).is_err());
    }
}
