//! Lab abnormality flagging for the chart panel.
//!
//! Lab lines are free text (`"WBC: 18.2 x10^3/uL"`). Each recognised test has one pattern that
//! matches the digit shapes expected above (or below) its threshold; a line is abnormal if any
//! pattern matches.
//!
//! This is a display heuristic, not a numeric parser. Known gaps are deliberate and kept:
//! - only the tests in [`LAB_RULES`] are checked, anything else is never flagged
//! - values are matched by leading digits, so e.g. `Lactate: 3.0` is flagged and
//!   `Lactate: 100` is flagged through its first two digits
//! - `CO2`/`HCO3` need whitespace after the value, so `CO2: 15` at end of line is missed
//! - names are matched as substrings (`PCO2: 12 mmHg` also trips the CO2 rule)

use once_cell::sync::Lazy;
use regex::Regex;

/// One threshold check.
#[derive(Debug)]
pub struct LabRule {
    /// Test name as it appears before the colon.
    pub test: &'static str,
    /// Human-readable threshold, for example `> 15`.
    pub threshold: &'static str,
    pattern: Regex,
}

impl LabRule {
    fn new(test: &'static str, threshold: &'static str, pattern: &str) -> Self {
        let pattern = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => panic!("invalid lab pattern for {test}: {e}"),
        };
        Self {
            test,
            threshold,
            pattern,
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

/// Recognised tests, checked in order.
pub static LAB_RULES: Lazy<Vec<LabRule>> = Lazy::new(|| {
    vec![
        LabRule::new("WBC", "> 15", r"WBC:\s*(1[5-9]|[2-9][0-9])"),
        LabRule::new("Lactate", "> 3", r"Lactate:\s*([3-9]|[1-9][0-9])"),
        LabRule::new("Creatinine", "> 1.5", r"Creatinine:\s*(1\.[5-9]|[2-9])"),
        LabRule::new("pH", "< 7.3", r"pH:\s*7\.[012]"),
        LabRule::new("Potassium", "> 5.2", r"Potassium:\s*(5\.[2-9]|[6-9])"),
        LabRule::new("BUN", "> 30", r"BUN:\s*([3-9][0-9]|[1-9][0-9][0-9])"),
        LabRule::new("CO2", "< 19", r"CO2:\s*(1[0-8]|[0-9])\s"),
        LabRule::new("HCO3", "< 19", r"HCO3:\s*(1[0-8]|[0-9])\s"),
        LabRule::new("INR", "> 1.4", r"INR:\s*(1\.[4-9]|[2-9])"),
        LabRule::new("Hemoglobin", "< 12", r"Hemoglobin:\s*([0-9]|1[01])\."),
    ]
});

/// First rule that flags `line`, if any.
pub fn abnormal_rule(line: &str) -> Option<&'static LabRule> {
    LAB_RULES.iter().find(|rule| rule.matches(line))
}

/// Whether `line` should be shown as abnormal.
pub fn is_abnormal(line: &str) -> bool {
    abnormal_rule(line).is_some()
}
