//! Chart panel rendering.
//!
//! Turns a case's chart into the EHR panel HTML, the plain-text chart dump and the banner
//! fragments shown above the agent output. All fixture text is escaped before insertion.

use crate::case::{Chart, KeyFindings};
use crate::html::escape_html;
use crate::labs;

const ABNORMAL_LAB_STYLE: &str = "color: #f85149; font-weight: 600;";

fn section(title: &str, content: &str) -> String {
    format!(
        "<div class=\"chart-section\">\n<div class=\"chart-section-header\">{}</div>\n{}\n</div>",
        escape_html(title),
        content
    )
}

fn row(label: &str, value: &str) -> String {
    format!(
        "<div class=\"chart-row\"><span class=\"chart-label\">{}</span><span class=\"chart-value\">{}</span></div>",
        escape_html(label),
        escape_html(value)
    )
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        return "<span style=\"color: var(--text-dim)\">None</span>".to_string();
    }
    let items: String = items
        .iter()
        .map(|item| format!("<li>{}</li>", escape_html(item)))
        .collect();
    format!("<ul class=\"chart-list\">{items}</ul>")
}

fn lab_list(labs: &[String]) -> String {
    let items: String = labs
        .iter()
        .map(|lab| {
            if labs::is_abnormal(lab) {
                format!(
                    "<li class=\"abnormal\" style=\"{ABNORMAL_LAB_STYLE}\">{}</li>",
                    escape_html(lab)
                )
            } else {
                format!("<li>{}</li>", escape_html(lab))
            }
        })
        .collect();
    format!("<ul class=\"chart-list\">{items}</ul>")
}

/// Renders the chart panel.
///
/// Sections, in order: Patient, Allergies, Problem List, Vitals, Labs (abnormal lines
/// flagged), Home Medications, Current Orders, one Imaging section per study and one section
/// per clinical note.
pub fn render_chart_html(chart: &Chart) -> String {
    let patient = &chart.patient;
    let mut parts = vec![
        section(
            "Patient",
            &[
                row("Name", &patient.name),
                row("MRN", &patient.mrn),
                row("DOB", &patient.dob),
                row("Sex", &patient.gender),
                row("Location", &chart.encounter.location),
            ]
            .join("\n"),
        ),
        section("Allergies", &list(&chart.allergies)),
        section("Problem List", &list(&chart.conditions)),
        section("Vitals", &list(&chart.vitals)),
        section("Labs", &lab_list(&chart.labs)),
        section("Home Medications", &list(&chart.medications.home)),
        section("Current Orders", &list(&chart.medications.inpatient)),
    ];

    for study in &chart.imaging {
        parts.push(section(
            "Imaging",
            &format!(
                "<div class=\"imaging-study\">[{}] {}</div>\n<div class=\"chart-note\">{}</div>",
                escape_html(&study.status.to_uppercase()),
                escape_html(&study.study),
                escape_html(&study.findings)
            ),
        ));
    }

    for note in &chart.notes {
        parts.push(section(
            &note.note_type,
            &format!("<div class=\"chart-note\">{}</div>", escape_html(&note.text)),
        ));
    }

    parts.join("\n")
}

/// Formats the chart as plain text with banner headings.
pub fn format_chart_text(chart: &Chart) -> String {
    fn bullets(lines: &mut Vec<String>, items: &[String]) {
        lines.extend(items.iter().map(|item| format!("  • {item}")));
    }

    let mut lines = Vec::new();
    let patient = &chart.patient;

    lines.push("═══ PATIENT ═══".to_string());
    lines.push(format!("Name: {}", patient.name));
    lines.push(format!("MRN: {}", patient.mrn));
    lines.push(format!("DOB: {}  |  Sex: {}", patient.dob, patient.gender));
    lines.push(format!("Location: {}", chart.encounter.location));
    if let Some(reason) = &chart.encounter.reason {
        lines.push(format!("Reason for Visit: {reason}"));
    }

    lines.push(format!("\nAllergies: {}", chart.allergies.join(", ")));

    lines.push("\n═══ PROBLEM LIST ═══".to_string());
    bullets(&mut lines, &chart.conditions);

    lines.push("\n═══ VITALS ═══".to_string());
    bullets(&mut lines, &chart.vitals);

    lines.push("\n═══ LABS ═══".to_string());
    bullets(&mut lines, &chart.labs);

    lines.push("\n═══ HOME MEDICATIONS ═══".to_string());
    bullets(&mut lines, &chart.medications.home);

    lines.push("\n═══ CURRENT ORDERS ═══".to_string());
    bullets(&mut lines, &chart.medications.inpatient);

    lines.push("\n═══ IMAGING ═══".to_string());
    for study in &chart.imaging {
        lines.push(format!("  [{}] {}", study.status.to_uppercase(), study.study));
        lines.push(format!("  {}", study.findings));
    }

    lines.push("\n═══ CLINICAL NOTES ═══".to_string());
    for note in &chart.notes {
        lines.push(format!("--- {} ---", note.note_type));
        lines.push(note.text.clone());
    }

    lines.join("\n")
}

/// Renders the key findings banner, or nothing when the case has none.
pub fn render_key_findings(key_findings: Option<&KeyFindings>) -> String {
    let Some(kf) = key_findings else {
        return String::new();
    };
    format!(
        "<div class=\"key-findings-banner\"><span class=\"kf-acuity {}\">{}</span><span class=\"kf-divider\"></span><span class=\"kf-vitals\">{}</span><span class=\"kf-divider\"></span><span class=\"kf-impression\">{}</span></div>",
        escape_html(&kf.acuity_color),
        escape_html(&kf.acuity),
        escape_html(&kf.vitals_summary),
        escape_html(&kf.impression)
    )
}

/// Renders the consult banner with the consult message.
pub fn render_consult_banner(consult_message: &str) -> String {
    format!(
        "<div class=\"consult-banner\"><span class=\"consult-message\">{}</span></div>",
        escape_html(consult_message)
    )
}

/// Renders the resident input panel.
pub fn render_resident_input(resident_input: &str) -> String {
    format!(
        "<div class=\"resident-section\"><div class=\"resident-text\">{}</div></div>",
        escape_html(resident_input)
    )
}
