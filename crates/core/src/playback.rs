//! Staged typing playback.
//!
//! A pure state machine over the four stages. Each stage is `Empty`, `Typing` or `Completed`.
//! At most one stage types at a time and stages complete strictly in order. The machine has no
//! notion of time: the controller calls [`Playback::tick`] from its single timer and decides
//! how long to wait between ticks and between stages.

use crate::stage::{Stage, StageStatus};
use crate::{ConsultError, ConsultResult};

#[derive(Clone, Debug, Default)]
struct StageSlot {
    status: StageStatus,
    html: String,
    revealed: usize,
}

/// Outcome of one reveal tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// More of `stage` is visible; the full text may now be showing.
    Revealed { stage: Stage },
    /// `stage` finished. `next` is the stage to start after the inter-stage delay.
    Completed { stage: Stage, next: Option<Stage> },
    /// No stage is typing.
    Idle,
}

/// Reveal state of all stages for the current case.
#[derive(Clone, Debug)]
pub struct Playback {
    slots: [StageSlot; 4],
    active: Option<Stage>,
    chunk: usize,
}

impl Playback {
    /// Creates an empty playback revealing `chunk` characters per tick.
    pub fn new(chunk: usize) -> Self {
        Self {
            slots: Default::default(),
            active: None,
            chunk: chunk.max(1),
        }
    }

    /// Returns every stage to `Empty`.
    pub fn reset(&mut self) {
        self.slots = Default::default();
        self.active = None;
    }

    /// Stage that should type next: the first one not yet completed.
    pub fn next_pending(&self) -> Option<Stage> {
        Stage::ALL
            .into_iter()
            .find(|s| self.slots[s.index()].status != StageStatus::Completed)
    }

    /// Starts typing `stage` with its rendered HTML.
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::InvalidInput` if another stage is typing or `stage` is not the
    /// next one in sequence.
    pub fn begin(&mut self, stage: Stage, rendered: String) -> ConsultResult<()> {
        if let Some(active) = self.active {
            return Err(ConsultError::InvalidInput(format!(
                "cannot start {stage} while {active} is typing"
            )));
        }
        if self.next_pending() != Some(stage) {
            return Err(ConsultError::InvalidInput(format!(
                "stage {stage} is out of sequence"
            )));
        }

        self.slots[stage.index()] = StageSlot {
            status: StageStatus::Typing,
            html: rendered,
            revealed: 0,
        };
        self.active = Some(stage);
        Ok(())
    }

    /// Reveals the next chunk of the typing stage, or completes it once everything is showing.
    pub fn tick(&mut self) -> Tick {
        let Some(stage) = self.active else {
            return Tick::Idle;
        };
        let slot = &mut self.slots[stage.index()];

        if slot.revealed < slot.html.len() {
            slot.revealed = slot.html[slot.revealed..]
                .char_indices()
                .nth(self.chunk)
                .map(|(offset, _)| slot.revealed + offset)
                .unwrap_or(slot.html.len());
            return Tick::Revealed { stage };
        }

        slot.status = StageStatus::Completed;
        self.active = None;
        Tick::Completed {
            stage,
            next: stage.next(),
        }
    }

    pub fn active(&self) -> Option<Stage> {
        self.active
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.slots[stage.index()].status
    }

    /// The part of `stage` revealed so far.
    pub fn revealed_html(&self, stage: Stage) -> &str {
        let slot = &self.slots[stage.index()];
        &slot.html[..slot.revealed]
    }

    /// Full rendered HTML of `stage`; empty until the stage has started.
    pub fn full_html(&self, stage: Stage) -> &str {
        &self.slots[stage.index()].html
    }

    /// Whether the terminal stage has completed.
    pub fn is_finished(&self) -> bool {
        self.status(Stage::Note) == StageStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_completion(playback: &mut Playback) -> (usize, Tick) {
        let mut reveals = 0;
        loop {
            match playback.tick() {
                Tick::Revealed { .. } => reveals += 1,
                other => return (reveals, other),
            }
        }
    }

    #[test]
    fn test_reveals_in_chunks() {
        let mut playback = Playback::new(5);
        playback.begin(Stage::Triage, "<p>abcdefgh</p>".into()).unwrap();

        assert_eq!(playback.tick(), Tick::Revealed { stage: Stage::Triage });
        assert_eq!(playback.revealed_html(Stage::Triage), "<p>ab");
        assert_eq!(playback.tick(), Tick::Revealed { stage: Stage::Triage });
        assert_eq!(playback.revealed_html(Stage::Triage), "<p>abcdefg");
        assert_eq!(playback.tick(), Tick::Revealed { stage: Stage::Triage });
        assert_eq!(playback.revealed_html(Stage::Triage), "<p>abcdefgh</p>");
        assert_eq!(playback.status(Stage::Triage), StageStatus::Typing);

        assert_eq!(
            playback.tick(),
            Tick::Completed {
                stage: Stage::Triage,
                next: Some(Stage::Context)
            }
        );
        assert_eq!(playback.status(Stage::Triage), StageStatus::Completed);
        assert_eq!(playback.tick(), Tick::Idle);
    }

    #[test]
    fn test_reveal_respects_char_boundaries() {
        let mut playback = Playback::new(2);
        playback.begin(Stage::Triage, "\u{1F534}é\u{2611}x".into()).unwrap();
        playback.tick();
        assert_eq!(playback.revealed_html(Stage::Triage), "\u{1F534}é");
        playback.tick();
        assert_eq!(playback.revealed_html(Stage::Triage), "\u{1F534}é\u{2611}x");
    }

    #[test]
    fn test_empty_stage_completes_on_first_tick() {
        let mut playback = Playback::new(5);
        playback.begin(Stage::Triage, String::new()).unwrap();
        assert!(matches!(playback.tick(), Tick::Completed { .. }));
    }

    #[test]
    fn test_stages_complete_in_sequence() {
        let mut playback = Playback::new(5);
        assert!(playback.begin(Stage::Context, "x".into()).is_err());

        for stage in Stage::ALL {
            playback.begin(stage, format!("<p>{stage}</p>")).unwrap();
            let (_, end) = run_to_completion(&mut playback);
            assert_eq!(
                end,
                Tick::Completed {
                    stage,
                    next: stage.next()
                }
            );
        }
        assert!(playback.is_finished());
        assert_eq!(playback.next_pending(), None);
    }

    #[test]
    fn test_only_one_stage_types() {
        let mut playback = Playback::new(5);
        playback.begin(Stage::Triage, "abc".into()).unwrap();
        assert!(playback.begin(Stage::Triage, "abc".into()).is_err());
        assert_eq!(playback.active(), Some(Stage::Triage));
        let typing = Stage::ALL
            .iter()
            .filter(|s| playback.status(**s) == StageStatus::Typing)
            .count();
        assert_eq!(typing, 1);
    }

    #[test]
    fn test_reset_empties_everything() {
        let mut playback = Playback::new(5);
        playback.begin(Stage::Triage, "abc".into()).unwrap();
        playback.tick();
        playback.reset();
        for stage in Stage::ALL {
            assert_eq!(playback.status(stage), StageStatus::Empty);
            assert_eq!(playback.revealed_html(stage), "");
        }
        assert_eq!(playback.active(), None);
        assert_eq!(playback.next_pending(), Some(Stage::Triage));
    }
}
