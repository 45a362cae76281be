//! Timer-driven playback controller.
//!
//! Runs the demo as a single-threaded event loop. User actions arrive as [`ViewEvent`]s on a
//! channel; reveal ticks and stage advances come from one timer slot. Arming the slot drops
//! whatever timer was pending, so there is never more than one outstanding timer and a new case
//! can never receive output scheduled for the previous one.
//!
//! Case loads are asynchronous. A new load request drops the in-flight load future and bumps
//! the session's load sequence; a completion carrying an older ticket is discarded.
//! A load that fails leaves the current case in place and re-arms the timer it cancelled.

use crate::case::{Case, CaseFuture, CaseSource};
use crate::config::PlaybackTiming;
use crate::playback::Tick;
use crate::session::{LoadTicket, Session};
use crate::stage::Stage;
use crate::summary::NoteView;
use crate::surface::RenderSurface;
use crate::ConsultResult;
use consult_types::CaseName;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Sleep};

/// A user action on the demo page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    /// Select a case. Cancels any playback in progress.
    LoadCase(CaseName),
    /// Switch the visible stage tab. Does not affect typing.
    ShowStage(Stage),
    /// Open or close one collapsible section of a completed stage.
    ToggleSection { stage: Stage, index: usize },
    /// Switch the note between summary and full view.
    SetNoteView(NoteView),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerAction {
    Reveal,
    StartStage(Stage),
}

/// The single timer slot.
#[derive(Default)]
struct TimerSlot {
    pending: Option<(Pin<Box<Sleep>>, TimerAction)>,
}

impl TimerSlot {
    fn arm(&mut self, after: Duration, action: TimerAction) {
        if let Some((_, previous)) = self.pending.take() {
            tracing::debug!("replacing pending timer {:?}", previous);
        }
        self.pending = Some((Box::pin(sleep(after)), action));
    }

    /// Disarms the slot and returns the action that was pending, if any.
    fn cancel(&mut self) -> Option<TimerAction> {
        let (_, action) = self.pending.take()?;
        tracing::debug!("cancelled pending timer {:?}", action);
        Some(action)
    }

    fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Waits for the pending timer and disarms the slot. Never resolves when disarmed.
    async fn fired(&mut self) -> TimerAction {
        match self.pending.as_mut() {
            Some((timer, action)) => {
                let action = *action;
                timer.as_mut().await;
                self.pending = None;
                action
            }
            None => std::future::pending().await,
        }
    }
}

struct PendingLoad {
    ticket: LoadTicket,
    future: CaseFuture,
}

async fn load_finished(slot: &mut Option<PendingLoad>) -> (LoadTicket, ConsultResult<Case>) {
    match slot.as_mut() {
        Some(load) => {
            let result = load.future.as_mut().await;
            let ticket = load.ticket.clone();
            *slot = None;
            (ticket, result)
        }
        None => std::future::pending().await,
    }
}

/// Drives one viewer's session.
pub struct Controller<L, S> {
    source: L,
    surface: S,
    session: Session,
    timing: PlaybackTiming,
    timer: TimerSlot,
    load: Option<PendingLoad>,
    /// Timer cancelled by a pending load, re-armed if that load fails.
    suspended: Option<TimerAction>,
}

impl<L: CaseSource, S: RenderSurface> Controller<L, S> {
    pub fn new(source: L, surface: S, timing: PlaybackTiming) -> Self {
        Self {
            source,
            surface,
            session: Session::new(timing.reveal_chunk),
            timing,
            timer: TimerSlot::default(),
            load: None,
            suspended: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Whether a timer or case load is outstanding.
    pub fn is_busy(&self) -> bool {
        self.timer.is_armed() || self.load.is_some()
    }

    /// Processes events until the channel is closed and no work is pending, then returns the
    /// surface.
    pub async fn run(mut self, mut events: mpsc::Receiver<ViewEvent>) -> S {
        let mut events_open = true;

        loop {
            if !events_open && !self.is_busy() {
                break;
            }

            tokio::select! {
                biased;

                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => events_open = false,
                },
                (ticket, result) = load_finished(&mut self.load), if self.load.is_some() => {
                    self.on_loaded(ticket, result);
                }
                action = self.timer.fired(), if self.timer.is_armed() => {
                    self.on_timer(action);
                }
            }
        }

        self.surface
    }

    /// Applies one user action.
    pub fn handle_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::LoadCase(name) => self.request_load(name),
            ViewEvent::ShowStage(stage) => {
                self.session.show_stage(stage);
                self.surface.stage_shown(stage);
            }
            ViewEvent::ToggleSection { stage, index } => {
                if let Some(open) = self.session.toggle_section(stage, index) {
                    self.surface.section_toggled(stage, index, open);
                }
            }
            ViewEvent::SetNoteView(view) => {
                if let Some(html) = self.session.set_note_view(view) {
                    self.surface.note_view_changed(view, &html);
                }
            }
        }
    }

    fn request_load(&mut self, name: CaseName) {
        if let Some(action) = self.timer.cancel() {
            self.suspended = Some(action);
        }
        if let Some(previous) = self.load.take() {
            tracing::debug!("dropping in-flight load of {}", previous.ticket.name());
        }

        let ticket = self.session.begin_load(name);
        tracing::info!("loading case {} (request {})", ticket.name(), ticket.seq());
        let future = self.source.load(ticket.name());
        self.load = Some(PendingLoad { ticket, future });
    }

    fn on_loaded(&mut self, ticket: LoadTicket, result: ConsultResult<Case>) {
        if !self.session.is_current(&ticket) {
            tracing::warn!("discarding stale load of {}", ticket.name());
            return;
        }

        let case = match result {
            Ok(case) => case,
            Err(e) => {
                tracing::error!("failed to load case {}: {}", ticket.name(), e);
                self.surface.case_load_failed(ticket.name(), &e);
                self.resume_suspended();
                return;
            }
        };

        self.surface.case_loaded(ticket.name(), &case);
        if let Err(e) = self.session.install_case(&ticket, case) {
            tracing::warn!("{}", e);
            return;
        }
        self.suspended = None;
        tracing::info!("case {} loaded", ticket.name());

        self.surface.stages_reset();
        self.start_stage(Stage::Triage);
    }

    /// Picks the current case back up where the failed load interrupted it.
    fn resume_suspended(&mut self) {
        let Some(action) = self.suspended.take() else {
            return;
        };
        let after = match action {
            TimerAction::Reveal => self.timing.tick_interval,
            TimerAction::StartStage(_) => self.timing.stage_delay,
        };
        tracing::debug!("resuming {:?} after failed load", action);
        self.timer.arm(after, action);
    }

    fn on_timer(&mut self, action: TimerAction) {
        match action {
            TimerAction::Reveal => self.reveal(),
            TimerAction::StartStage(stage) => self.start_stage(stage),
        }
    }

    fn start_stage(&mut self, stage: Stage) {
        if let Err(e) = self.session.start_stage(stage) {
            tracing::warn!("could not start stage {}: {}", stage, e);
            return;
        }
        self.surface.stage_shown(stage);
        self.reveal();
    }

    fn reveal(&mut self) {
        match self.session.tick() {
            Tick::Revealed { stage } => {
                self.surface
                    .stage_revealed(stage, self.session.playback().revealed_html(stage));
                self.timer.arm(self.timing.tick_interval, TimerAction::Reveal);
            }
            Tick::Completed { stage, next } => {
                let full = self.session.playback().full_html(stage);
                self.surface.stage_revealed(stage, full);

                if stage.is_note() {
                    if let Some(html) = self.session.note_html() {
                        self.surface.note_view_changed(self.session.note_view(), &html);
                    }
                } else {
                    let sections = self.session.sections(stage);
                    if !sections.is_empty() {
                        self.surface.sections_ready(stage, sections);
                    }
                }
                self.surface.stage_completed(stage);

                if let Some(next) = next {
                    self.timer
                        .arm(self.timing.stage_delay, TimerAction::StartStage(next));
                }
            }
            Tick::Idle => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::fixtures::sample_case;
    use crate::sections::Sections;
    use crate::stage::StageStatus;
    use crate::ConsultError;
    use std::collections::HashMap;
    use tokio::time::Instant;

    /// In-memory cases with a per-case load latency.
    struct MemoryCaseSource {
        cases: HashMap<String, (Case, Duration)>,
    }

    impl MemoryCaseSource {
        fn new(entries: &[(&str, u64)]) -> Self {
            let cases = entries
                .iter()
                .map(|(name, latency_ms)| {
                    (
                        name.to_string(),
                        (sample_case(name), Duration::from_millis(*latency_ms)),
                    )
                })
                .collect();
            Self { cases }
        }
    }

    impl CaseSource for MemoryCaseSource {
        fn load(&self, name: &CaseName) -> CaseFuture {
            let entry = self.cases.get(name.as_str()).cloned();
            let name = name.clone();
            Box::pin(async move {
                match entry {
                    Some((case, latency)) => {
                        sleep(latency).await;
                        Ok(case)
                    }
                    None => Err(ConsultError::CaseNotFound(name)),
                }
            })
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Loaded(String),
        LoadFailed(String),
        Reset,
        Shown(Stage),
        Revealed(Stage, String),
        Completed(Stage, Instant),
        Sections(Stage, Vec<bool>),
        Toggled(Stage, usize, bool),
        NoteView(NoteView, String),
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<Call>,
    }

    impl RecordingSurface {
        fn completed(&self) -> Vec<Stage> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Completed(stage, _) => Some(*stage),
                    _ => None,
                })
                .collect()
        }
    }

    impl RenderSurface for RecordingSurface {
        fn case_loaded(&mut self, name: &CaseName, _case: &Case) {
            self.calls.push(Call::Loaded(name.to_string()));
        }
        fn case_load_failed(&mut self, name: &CaseName, _error: &ConsultError) {
            self.calls.push(Call::LoadFailed(name.to_string()));
        }
        fn stages_reset(&mut self) {
            self.calls.push(Call::Reset);
        }
        fn stage_shown(&mut self, stage: Stage) {
            self.calls.push(Call::Shown(stage));
        }
        fn stage_revealed(&mut self, stage: Stage, html: &str) {
            self.calls.push(Call::Revealed(stage, html.to_string()));
        }
        fn stage_completed(&mut self, stage: Stage) {
            self.calls.push(Call::Completed(stage, Instant::now()));
        }
        fn sections_ready(&mut self, stage: Stage, sections: &Sections) {
            self.calls
                .push(Call::Sections(stage, sections.iter().map(|s| s.open).collect()));
        }
        fn section_toggled(&mut self, stage: Stage, index: usize, open: bool) {
            self.calls.push(Call::Toggled(stage, index, open));
        }
        fn note_view_changed(&mut self, view: NoteView, html: &str) {
            self.calls.push(Call::NoteView(view, html.to_string()));
        }
    }

    fn timing() -> PlaybackTiming {
        PlaybackTiming {
            reveal_chunk: 5,
            tick_interval: Duration::from_millis(3),
            stage_delay: Duration::from_millis(800),
        }
    }

    fn name(s: &str) -> CaseName {
        CaseName::new(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_starts_triage_typing() {
        let mut controller = Controller::new(
            MemoryCaseSource::new(&[("alpha", 0)]),
            RecordingSurface::default(),
            timing(),
        );
        controller.handle_event(ViewEvent::LoadCase(name("alpha")));
        let load = controller.load.take().unwrap();
        let result = load.future.await;
        controller.on_loaded(load.ticket, result);

        let session = controller.session();
        assert_eq!(session.status(Stage::Triage), StageStatus::Typing);
        for stage in [Stage::Context, Stage::Plan, Stage::Note] {
            assert_eq!(session.status(stage), StageStatus::Empty);
        }
        assert!(controller.timer.is_armed());
        assert_eq!(
            &controller.surface().calls[..3],
            &[
                Call::Loaded("alpha".into()),
                Call::Reset,
                Call::Shown(Stage::Triage)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_all_stages_in_order_with_delay() {
        let (tx, rx) = mpsc::channel(8);
        let controller = Controller::new(
            MemoryCaseSource::new(&[("alpha", 0)]),
            RecordingSurface::default(),
            timing(),
        );
        tx.send(ViewEvent::LoadCase(name("alpha"))).await.unwrap();
        drop(tx);

        let surface = controller.run(rx).await;
        assert_eq!(surface.completed(), Stage::ALL.to_vec());

        let times: Vec<Instant> = surface
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Completed(_, at) => Some(*at),
                _ => None,
            })
            .collect();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(800));
        }

        // Nothing happens after the note completes.
        let last_completed = surface
            .calls
            .iter()
            .rposition(|c| matches!(c, Call::Completed(Stage::Note, _)))
            .unwrap();
        assert_eq!(last_completed, surface.calls.len() - 1);

        // Non-note stages with headers are sectioned, first open.
        assert!(surface
            .calls
            .contains(&Call::Sections(Stage::Triage, vec![true, false])));

        // The note defaults to summary view.
        let note = surface
            .calls
            .iter()
            .find_map(|c| match c {
                Call::NoteView(view, html) => Some((*view, html.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(note.0, NoteView::Summary);
        assert!(note.1.contains("alpha assessment"));
        assert!(!note.1.contains("alpha history"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_cases_cancels_previous_output() {
        let (tx, rx) = mpsc::channel(8);
        let controller = Controller::new(
            MemoryCaseSource::new(&[("alpha", 0), ("bravo", 50)]),
            RecordingSurface::default(),
            timing(),
        );

        let script = async move {
            tx.send(ViewEvent::LoadCase(name("alpha"))).await.unwrap();
            // Mid-way through the first stage of alpha.
            sleep(Duration::from_millis(10)).await;
            tx.send(ViewEvent::LoadCase(name("bravo"))).await.unwrap();
        };
        let (surface, ()) = tokio::join!(controller.run(rx), script);

        let bravo_loaded = surface
            .calls
            .iter()
            .position(|c| *c == Call::Loaded("bravo".into()))
            .unwrap();
        let switch_at = surface
            .calls
            .iter()
            .position(|c| matches!(c, Call::Revealed(_, html) if html.contains("bravo")))
            .unwrap();
        assert!(bravo_loaded < switch_at);

        // Alpha never completed anything and none of its text appears after bravo loaded.
        assert!(!surface.calls[bravo_loaded..].iter().any(|c| match c {
            Call::Revealed(_, html) | Call::NoteView(_, html) => html.contains("alpha"),
            _ => false,
        }));
        assert!(!surface.calls[..bravo_loaded]
            .iter()
            .any(|c| matches!(c, Call::Completed(..))));
        assert_eq!(surface.completed(), Stage::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_during_stage_delay_cancels_next_stage() {
        let (tx, rx) = mpsc::channel(8);
        let controller = Controller::new(
            MemoryCaseSource::new(&[("alpha", 0), ("bravo", 0)]),
            RecordingSurface::default(),
            timing(),
        );

        let script = async move {
            tx.send(ViewEvent::LoadCase(name("alpha"))).await.unwrap();
            // Triage is done well before this; context is due 800ms after it.
            sleep(Duration::from_millis(400)).await;
            tx.send(ViewEvent::LoadCase(name("bravo"))).await.unwrap();
        };
        let (surface, ()) = tokio::join!(controller.run(rx), script);

        let bravo_loaded = surface
            .calls
            .iter()
            .position(|c| *c == Call::Loaded("bravo".into()))
            .unwrap();
        let before = &surface.calls[..bravo_loaded];
        assert!(before
            .iter()
            .any(|c| matches!(c, Call::Completed(Stage::Triage, _))));
        assert!(!before
            .iter()
            .any(|c| matches!(c, Call::Shown(Stage::Context) | Call::Revealed(Stage::Context, _))));

        assert!(!surface.calls[bravo_loaded..].iter().any(|c| match c {
            Call::Revealed(_, html) | Call::NoteView(_, html) => html.contains("alpha"),
            _ => false,
        }));
        assert_eq!(
            surface.completed(),
            vec![Stage::Triage, Stage::Triage, Stage::Context, Stage::Plan, Stage::Note]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_switch_resumes_current_case() {
        let (tx, rx) = mpsc::channel(8);
        let controller = Controller::new(
            MemoryCaseSource::new(&[("alpha", 0)]),
            RecordingSurface::default(),
            timing(),
        );

        let script = async move {
            tx.send(ViewEvent::LoadCase(name("alpha"))).await.unwrap();
            // A few reveal ticks into triage.
            sleep(Duration::from_millis(10)).await;
            tx.send(ViewEvent::LoadCase(name("ghost"))).await.unwrap();
        };
        let (surface, ()) = tokio::join!(controller.run(rx), script);

        let failed = surface
            .calls
            .iter()
            .position(|c| *c == Call::LoadFailed("ghost".into()))
            .unwrap();
        assert!(!surface.calls[..failed]
            .iter()
            .any(|c| matches!(c, Call::Completed(..))));
        assert!(!surface.calls[failed..].contains(&Call::Reset));
        assert_eq!(surface.completed(), Stage::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_switch_during_stage_delay_resumes_next_stage() {
        let (tx, rx) = mpsc::channel(8);
        let controller = Controller::new(
            MemoryCaseSource::new(&[("alpha", 0)]),
            RecordingSurface::default(),
            timing(),
        );

        let script = async move {
            tx.send(ViewEvent::LoadCase(name("alpha"))).await.unwrap();
            sleep(Duration::from_millis(400)).await;
            tx.send(ViewEvent::LoadCase(name("ghost"))).await.unwrap();
        };
        let (surface, ()) = tokio::join!(controller.run(rx), script);

        assert!(surface.calls.contains(&Call::LoadFailed("ghost".into())));
        assert_eq!(surface.completed(), Stage::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_switch_discards_superseded_load() {
        let (tx, rx) = mpsc::channel(8);
        let controller = Controller::new(
            MemoryCaseSource::new(&[("slow", 500), ("fast", 10)]),
            RecordingSurface::default(),
            timing(),
        );
        tx.send(ViewEvent::LoadCase(name("slow"))).await.unwrap();
        tx.send(ViewEvent::LoadCase(name("fast"))).await.unwrap();
        drop(tx);

        let surface = controller.run(rx).await;
        assert!(!surface.calls.contains(&Call::Loaded("slow".into())));
        assert!(surface.calls.contains(&Call::Loaded("fast".into())));
        assert!(!surface.calls.iter().any(|c| match c {
            Call::Revealed(_, html) => html.contains("slow"),
            _ => false,
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_case_reports_failure() {
        let (tx, rx) = mpsc::channel(8);
        let controller = Controller::new(
            MemoryCaseSource::new(&[]),
            RecordingSurface::default(),
            timing(),
        );
        tx.send(ViewEvent::LoadCase(name("ghost"))).await.unwrap();
        drop(tx);

        let surface = controller.run(rx).await;
        assert_eq!(surface.calls, vec![Call::LoadFailed("ghost".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggles_and_note_view_after_playback() {
        let (tx, rx) = mpsc::channel(8);
        let controller = Controller::new(
            MemoryCaseSource::new(&[("alpha", 0)]),
            RecordingSurface::default(),
            timing(),
        );

        let script = async move {
            tx.send(ViewEvent::LoadCase(name("alpha"))).await.unwrap();
            sleep(Duration::from_secs(60)).await;
            tx.send(ViewEvent::ToggleSection {
                stage: Stage::Triage,
                index: 1,
            })
            .await
            .unwrap();
            tx.send(ViewEvent::SetNoteView(NoteView::Full)).await.unwrap();
            tx.send(ViewEvent::ShowStage(Stage::Context)).await.unwrap();
        };
        let (surface, ()) = tokio::join!(controller.run(rx), script);

        let tail = &surface.calls[surface.calls.len() - 3..];
        assert_eq!(tail[0], Call::Toggled(Stage::Triage, 1, true));
        match &tail[1] {
            Call::NoteView(NoteView::Full, html) => assert!(html.contains("alpha history")),
            other => panic!("unexpected call {other:?}"),
        }
        assert_eq!(tail[2], Call::Shown(Stage::Context));
        // Switching the note view did not restart typing.
        assert_eq!(surface.completed(), Stage::ALL.to_vec());
    }

    #[test]
    fn test_timer_slot_holds_one_timer() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        rt.block_on(async {
            let mut slot = TimerSlot::default();
            slot.arm(Duration::from_millis(5), TimerAction::Reveal);
            slot.arm(
                Duration::from_millis(800),
                TimerAction::StartStage(Stage::Context),
            );
            assert_eq!(slot.fired().await, TimerAction::StartStage(Stage::Context));
            assert!(!slot.is_armed());

            slot.arm(Duration::from_millis(5), TimerAction::Reveal);
            assert_eq!(slot.cancel(), Some(TimerAction::Reveal));
            assert!(!slot.is_armed());
            assert_eq!(slot.cancel(), None);
        });
    }
}
