//! Case fixtures and the case catalogue.
//!
//! A case bundles chart data with the four canned agent outputs. Fixtures live as
//! `<cases_dir>/<name>.json` and are loaded whole; a case is never mutated after loading.
//!
//! Loading fails fast: a fixture missing a required field is rejected with the JSON path of the
//! offending field rather than being patched with defaults. List-valued chart fields are the
//! exception and default to empty.

use crate::constants::CASE_FILE_EXTENSION;
use crate::stage::Stage;
use crate::{ConsultError, ConsultResult};
use consult_types::CaseName;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// One complete demo fixture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    /// Consult page text as received by the resident.
    pub consult_message: String,
    /// Structured chart shown in the EHR panel.
    pub chart: Chart,
    /// Pre-formatted chart text. Generated from `chart` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_text: Option<String>,
    /// Headline acuity banner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_findings: Option<KeyFindings>,
    /// Resident's bedside input.
    pub resident_input: String,
    /// Raw markdown per stage.
    pub stages: StageTexts,
}

/// Raw markdown source for each stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTexts {
    pub triage: String,
    pub context: String,
    pub plan: String,
    pub note: String,
}

impl StageTexts {
    pub fn get(&self, stage: Stage) -> &str {
        match stage {
            Stage::Triage => &self.triage,
            Stage::Context => &self.context,
            Stage::Plan => &self.plan,
            Stage::Note => &self.note,
        }
    }
}

/// Patient chart as shown in the EHR panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub patient: PatientInfo,
    pub encounter: Encounter,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub vitals: Vec<String>,
    /// Free-text lab lines, for example `"WBC: 18.2 x10^3/uL"`.
    #[serde(default)]
    pub labs: Vec<String>,
    #[serde(default)]
    pub medications: Medications,
    #[serde(default)]
    pub imaging: Vec<ImagingStudy>,
    #[serde(default)]
    pub notes: Vec<ClinicalNote>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub name: String,
    pub mrn: String,
    pub dob: String,
    pub gender: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medications {
    #[serde(default)]
    pub home: Vec<String>,
    #[serde(default)]
    pub inpatient: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagingStudy {
    pub study: String,
    /// Report status, for example `final` or `preliminary`.
    pub status: String,
    pub findings: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalNote {
    #[serde(rename = "type")]
    pub note_type: String,
    pub text: String,
}

/// Headline banner summarising acuity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFindings {
    pub acuity: String,
    /// CSS class for the acuity badge, for example `red`.
    pub acuity_color: String,
    pub vitals_summary: String,
    pub impression: String,
}

impl Case {
    /// Parse a case from fixture JSON.
    ///
    /// Uses `serde_path_to_error` so a schema mismatch reports the failing field path
    /// (e.g. `chart.patient.mrn`).
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::CaseSchema` if the JSON does not match the fixture schema.
    pub fn parse(label: &str, json: &str) -> ConsultResult<Case> {
        let mut deserializer = serde_json::Deserializer::from_str(json);

        let case = match serde_path_to_error::deserialize::<_, Case>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>".to_string()
                } else {
                    path
                };
                return Err(ConsultError::CaseSchema {
                    case: label.to_string(),
                    path,
                    message: source.to_string(),
                });
            }
        };

        deserializer.end().map_err(ConsultError::Deserialization)?;
        Ok(case)
    }

    /// Chart text for display: the fixture's own text when present, otherwise formatted from
    /// the structured chart.
    pub fn chart_text(&self) -> String {
        match &self.chart_text {
            Some(text) => text.clone(),
            None => crate::chart::format_chart_text(&self.chart),
        }
    }
}

/// Lists the cases available in `dir`, sorted by name.
///
/// Files that are not `.json` or whose stem is not a valid [`CaseName`] are skipped.
pub fn list_cases(dir: &Path) -> ConsultResult<Vec<CaseName>> {
    let mut names = Vec::new();

    for entry in std::fs::read_dir(dir).map_err(ConsultError::DirRead)? {
        let entry = entry.map_err(ConsultError::DirRead)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(CASE_FILE_EXTENSION) {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match CaseName::new(stem) {
            Ok(name) => names.push(name),
            Err(e) => tracing::warn!("skipping case file {}: {}", path.display(), e),
        }
    }

    names.sort();
    Ok(names)
}

/// Loads `<dir>/<name>.json` synchronously.
pub fn load_case(dir: &Path, name: &CaseName) -> ConsultResult<Case> {
    let path = dir.join(name.file_name());
    let json = std::fs::read_to_string(&path).map_err(|e| read_error(name, e))?;
    Case::parse(name.as_str(), &json)
}

fn read_error(name: &CaseName, err: std::io::Error) -> ConsultError {
    if err.kind() == ErrorKind::NotFound {
        ConsultError::CaseNotFound(name.clone())
    } else {
        ConsultError::FileRead(err)
    }
}

/// Future returned by a [`CaseSource`].
pub type CaseFuture = Pin<Box<dyn Future<Output = ConsultResult<Case>>>>;

/// Retrieves cases by name.
///
/// The returned future owns everything it needs, so the controller can hold it across events
/// and drop it when a newer load supersedes it.
pub trait CaseSource {
    fn load(&self, name: &CaseName) -> CaseFuture;
}

/// Loads fixtures from a directory with non-blocking file reads.
#[derive(Clone, Debug)]
pub struct DirCaseSource {
    dir: PathBuf,
}

impl DirCaseSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CaseSource for DirCaseSource {
    fn load(&self, name: &CaseName) -> CaseFuture {
        let path = self.dir.join(name.file_name());
        let name = name.clone();
        Box::pin(async move {
            let json = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| read_error(&name, e))?;
            Case::parse(name.as_str(), &json)
        })
    }
}
