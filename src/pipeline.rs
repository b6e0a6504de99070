use crate::{
    chart,
    config::Config,
    dataset,
    detector::{DeviationRule, Finding, FindingKind, detect},
    producer,
    report::{DataSource, Report, chart_reference},
    util::hash_file,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Where the samples come from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Generate a synthetic run and persist it to the data artifact.
    Synthetic { seed: u64 },
    /// Load an existing bench log. The data artifact is not written.
    File(PathBuf),
}

/// Output paths of one run.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub data: PathBuf,
    pub chart: PathBuf,
    pub report: PathBuf,
}

pub struct RunOutput {
    pub samples: usize,
    pub data: PathBuf,
    pub data_sha256: String,
    pub findings: Vec<Finding>,
    pub report: Report,
}

pub struct Pipeline {
    cfg: Config,
}

impl Pipeline {
    pub fn new(cfg: &Config) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn artifacts(&self, out_dir: &Path) -> Artifacts {
        Artifacts {
            data: out_dir.join(&self.cfg.paths.data_filename),
            chart: out_dir.join(&self.cfg.paths.chart_filename),
            report: out_dir.join(&self.cfg.paths.report_filename),
        }
    }

    /// Produce, detect, render, report. Every stage runs; the first error
    /// aborts the rest.
    pub fn run(&self, source: &Source, artifacts: &Artifacts) -> Result<RunOutput> {
        let started = Instant::now();

        let (series, data) = match source {
            Source::Synthetic { seed } => {
                let series = producer::generate(&self.cfg, *seed)?;
                dataset::write_csv(&series, &artifacts.data)?;
                (series, artifacts.data.clone())
            }
            Source::File(path) => (dataset::read_csv(path)?, path.clone()),
        };
        info!("series samples={} source={}", series.len(), data.display());

        let rule = DeviationRule::from_config(&self.cfg);
        let findings = detect(&rule, &series);
        for f in &findings {
            match f.kind {
                FindingKind::Alert => warn!(
                    matched = f.matched_samples,
                    first = ?f.first_match_index,
                    "{f}"
                ),
                FindingKind::Stable => info!("{f}"),
            }
        }

        chart::render(&self.cfg, &series, &artifacts.chart)?;

        let data_sha256 = hash_file(&data)?;
        let report = Report::new(
            &self.cfg,
            findings.clone(),
            chart_reference(&artifacts.report, &artifacts.chart),
            Some(DataSource {
                path: data.display().to_string(),
                samples: series.len(),
                sha256: data_sha256.clone(),
            }),
        );
        report.write(&artifacts.report)?;

        info!("pipeline finished in {:?}", started.elapsed());

        Ok(RunOutput {
            samples: series.len(),
            data,
            data_sha256,
            findings,
            report,
        })
    }
}
