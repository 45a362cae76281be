//! # Consult Core
//!
//! Core logic for the surgical consult demo.
//!
//! This crate contains the content pipeline and the playback engine:
//! - Case fixtures loaded from a `cases/` directory of JSON files
//! - Markdown to HTML rendering for agent output
//! - Lab abnormality flagging and chart panel rendering
//! - Staged typing playback with collapsible sections and a note summary view
//!
//! **No presentation concerns**: the controller reports every visible change through
//! [`surface::RenderSurface`]. Binaries decide how to show it.

pub mod case;
pub mod chart;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod html;
pub mod labs;
pub mod markdown;
pub mod playback;
pub mod sections;
pub mod session;
pub mod stage;
pub mod summary;
pub mod surface;

pub use case::{Case, CaseSource, DirCaseSource};
pub use config::{CoreConfig, PlaybackTiming};
pub use controller::{Controller, ViewEvent};
pub use error::{ConsultError, ConsultResult};
pub use markdown::{markdown_to_html, MarkdownRenderer};
pub use sections::Sections;
pub use session::Session;
pub use stage::{Stage, StageStatus};
pub use summary::NoteView;
pub use surface::{PageSurface, RenderSurface};
