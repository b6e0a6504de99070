use crate::{config::Config, sample::SampleSeries};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    Alert,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub message: String,
    pub matched_samples: usize,
    pub first_match_index: Option<usize>,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Static threshold rule: high engine speed with low oil pressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationRule {
    pub rpm_above: f64,
    pub oil_pressure_below: f64,
}

impl DeviationRule {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            rpm_above: cfg.detection.rpm_above,
            oil_pressure_below: cfg.detection.oil_pressure_below,
        }
    }

    pub fn matches(&self, rpm: f64, oil_pressure: f64) -> bool {
        rpm > self.rpm_above && oil_pressure < self.oil_pressure_below
    }
}

/// Reports the condition class once: a single alert if any sample matches
/// the rule, otherwise a single stable finding.
pub fn detect(rule: &DeviationRule, series: &SampleSeries) -> Vec<Finding> {
    let mut matched = series
        .iter()
        .enumerate()
        .filter(|(_, s)| rule.matches(s.rpm, s.oil_pressure))
        .map(|(i, _)| i);

    let finding = match matched.next() {
        Some(first) => Finding {
            kind: FindingKind::Alert,
            message: format!(
                "ALERT: Process deviation detected! Oil pressure dropped below {:.1} bar during high-RPM operation (RPM > {:.0}).",
                rule.oil_pressure_below, rule.rpm_above
            ),
            matched_samples: 1 + matched.count(),
            first_match_index: Some(first),
        },
        None => Finding {
            kind: FindingKind::Stable,
            message: "Process is stable.".to_string(),
            matched_samples: 0,
            first_match_index: None,
        },
    };

    vec![finding]
}
