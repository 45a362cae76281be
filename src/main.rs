use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use consult_core::case::Case;
use consult_core::config::{duration_from_env_value, resolve_cases_dir, reveal_chunk_from_env_value};
use consult_core::constants::{DEFAULT_STAGE_DELAY, DEFAULT_TICK_INTERVAL};
use consult_core::html::text_content;
use consult_core::{
    ConsultError, Controller, CoreConfig, DirCaseSource, NoteView, PageSurface, PlaybackTiming,
    RenderSurface, Sections, Stage, ViewEvent,
};
use consult_types::CaseName;

/// Page surface that also echoes progress to the terminal.
///
/// Stage text is printed once per stage, on completion, as plain text. `finished` is signalled
/// when a case has played through or failed to load.
struct TerminalSurface {
    page: PageSurface,
    finished: mpsc::UnboundedSender<()>,
}

impl RenderSurface for TerminalSurface {
    fn case_loaded(&mut self, name: &CaseName, case: &Case) {
        println!("\n=== {} ===\n{}", name, case.consult_message);
        self.page.case_loaded(name, case);
    }

    fn case_load_failed(&mut self, name: &CaseName, error: &ConsultError) {
        eprintln!("could not load case {}: {}", name, error);
        self.page.case_load_failed(name, error);
        self.finished.send(()).ok();
    }

    fn stages_reset(&mut self) {
        self.page.stages_reset();
    }

    fn stage_shown(&mut self, stage: Stage) {
        self.page.stage_shown(stage);
    }

    fn stage_revealed(&mut self, stage: Stage, html: &str) {
        self.page.stage_revealed(stage, html);
    }

    fn stage_completed(&mut self, stage: Stage) {
        println!("\n--- {} ---\n{}", stage.label(), text_content(self.page.stage_html(stage)));
        self.page.stage_completed(stage);
        if stage.is_note() {
            self.finished.send(()).ok();
        }
    }

    fn sections_ready(&mut self, stage: Stage, sections: &Sections) {
        self.page.sections_ready(stage, sections);
    }

    fn section_toggled(&mut self, stage: Stage, index: usize, open: bool) {
        self.page.section_toggled(stage, index, open);
    }

    fn note_view_changed(&mut self, view: NoteView, html: &str) {
        self.page.note_view_changed(view, html);
    }
}

/// Main entry point for the consult demo runner
///
/// Plays each requested case through the staged typing controller in turn, echoing finished
/// stages to the terminal, then writes the final page as static HTML.
///
/// # Environment Variables
/// - `CONSULT_CASES_DIR`: Directory of case fixtures (default: `cases/`)
/// - `CONSULT_CASES`: Comma-separated case names to play (default: every case found)
/// - `CONSULT_OUTPUT`: Where to write the final page (default: "consult.html")
/// - `CONSULT_REVEAL_CHUNK`: Characters revealed per tick (default: 5)
/// - `CONSULT_TICK_MS`: Milliseconds between reveal ticks (default: 3)
/// - `CONSULT_STAGE_DELAY_MS`: Milliseconds between stages (default: 800)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("consult=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cases_dir = resolve_cases_dir(std::env::var("CONSULT_CASES_DIR").ok().map(PathBuf::from))?;
    let timing = PlaybackTiming {
        reveal_chunk: reveal_chunk_from_env_value(std::env::var("CONSULT_REVEAL_CHUNK").ok())?,
        tick_interval: duration_from_env_value(
            std::env::var("CONSULT_TICK_MS").ok(),
            DEFAULT_TICK_INTERVAL,
        )?,
        stage_delay: duration_from_env_value(
            std::env::var("CONSULT_STAGE_DELAY_MS").ok(),
            DEFAULT_STAGE_DELAY,
        )?,
    };
    let config = CoreConfig::new(cases_dir, timing)?;
    let output =
        PathBuf::from(std::env::var("CONSULT_OUTPUT").unwrap_or_else(|_| "consult.html".into()));

    let cases = match std::env::var("CONSULT_CASES") {
        Ok(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(CaseName::new)
            .collect::<Result<Vec<_>, _>>()?,
        Err(_) => consult_core::case::list_cases(config.cases_dir())?,
    };
    if cases.is_empty() {
        anyhow::bail!("no cases to play in {}", config.cases_dir().display());
    }

    tracing::info!("++ Playing {} case(s) from {}", cases.len(), config.cases_dir().display());

    let (finished_tx, mut finished_rx) = mpsc::unbounded_channel();
    let controller = Controller::new(
        DirCaseSource::new(config.cases_dir()),
        TerminalSurface {
            page: PageSurface::new(),
            finished: finished_tx,
        },
        config.timing(),
    );

    // Each load is sent once the previous case has played through, so no case is cut short.
    let (tx, rx) = mpsc::channel(1);
    let feeder = async move {
        for name in cases {
            if tx.send(ViewEvent::LoadCase(name)).await.is_err() {
                break;
            }
            if finished_rx.recv().await.is_none() {
                break;
            }
        }
    };

    let (surface, ()) = tokio::join!(controller.run(rx), feeder);

    surface.page.write_page(&output)?;
    tracing::info!("++ Wrote {}", output.display());

    Ok(())
}
