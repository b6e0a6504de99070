use crate::{
    chart,
    config::Config,
    detector::Finding,
    util::{ensure_parent, now_rfc3339},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub generated_at: String,
    pub findings: Vec<Finding>,
    pub chart_ref: String,
    pub chart_caption: String,
    pub chart_legend: Vec<String>,
    pub data_source: Option<DataSource>,
}

/// Provenance of the analysed log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub path: String,
    pub samples: usize,
    pub sha256: String,
}

impl Report {
    pub fn new(
        cfg: &Config,
        findings: Vec<Finding>,
        chart_ref: impl Into<String>,
        data_source: Option<DataSource>,
    ) -> Self {
        Self {
            title: cfg.report.title.clone(),
            generated_at: now_rfc3339(),
            findings,
            chart_ref: chart_ref.into(),
            chart_caption: chart::TITLE.to_string(),
            chart_legend: chart::legend(cfg),
            data_source: data_source.filter(|_| cfg.report.include_data_source),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        // writeln! into a String cannot fail
        let _ = writeln!(md, "# {}", self.title);
        let _ = writeln!(md, "**Date:** {}", self.generated_at);
        md.push('\n');
        md.push_str("## 1. Process Analytics Findings\n");
        for f in &self.findings {
            let _ = writeln!(md, "- {f}");
        }
        md.push('\n');
        md.push_str("## 2. Visual Evidence\n");
        let _ = writeln!(md, "![Chart]({})", self.chart_ref);
        md.push('\n');
        let _ = writeln!(md, "*{}*", self.chart_caption);
        md.push('\n');
        for entry in &self.chart_legend {
            let _ = writeln!(md, "- {entry}");
        }
        if let Some(src) = &self.data_source {
            md.push('\n');
            md.push_str("## 3. Data Source\n");
            let _ = writeln!(md, "- File: `{}`", src.path);
            let _ = writeln!(md, "- Samples: {}", src.samples);
            let _ = writeln!(md, "- SHA-256: `{}`", src.sha256);
        }
        md
    }

    /// Writes the Markdown report, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        std::fs::write(path, self.to_markdown())
            .with_context(|| format!("write report: {}", path.display()))?;
        info!(
            "report written findings={} path={}",
            self.findings.len(),
            path.display()
        );
        Ok(())
    }
}

/// How the report should point at the chart: by file name when both sit in
/// the same directory, otherwise by full path.
pub fn chart_reference(report: &Path, chart: &Path) -> String {
    let same_dir = report.parent().unwrap_or(Path::new(""))
        == chart.parent().unwrap_or(Path::new(""));
    match chart.file_name() {
        Some(name) if same_dir => name.to_string_lossy().into_owned(),
        _ => chart.display().to_string(),
    }
}
