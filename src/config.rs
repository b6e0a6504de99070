use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub generator: Generator,
    #[serde(default)]
    pub fault: Fault,
    #[serde(default)]
    pub detection: Detection,
    #[serde(default)]
    pub chart: Chart,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
    /// Fixed noise seed. A random one is drawn (and logged) when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub out_dir: String,
    pub data_filename: String,
    pub chart_filename: String,
    pub report_filename: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: ".".into(),
            data_filename: "test_bench_log.csv".into(),
            chart_filename: "analysis_chart.png".into(),
            report_filename: "agent_report.md".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Generator {
    pub samples: usize,
    /// First timestamp, `YYYY-MM-DD HH:MM:SS`.
    pub start: String,
    pub interval_seconds: i64,
    pub rpm_start: f64,
    pub rpm_end: f64,
    pub rpm_noise_std_dev: f64,
    pub oil_pressure_base: f64,
    pub rpm_per_bar: f64,
}
impl Default for Generator {
    fn default() -> Self {
        Self {
            samples: 600,
            start: "2025-01-01 08:00:00".into(),
            interval_seconds: 1,
            rpm_start: 1000.0,
            rpm_end: 6000.0,
            rpm_noise_std_dev: 50.0,
            oil_pressure_base: 5.0,
            rpm_per_bar: 2000.0,
        }
    }
}

/// Synthetic fault injected into the trailing samples. The chart shades the
/// same window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Fault {
    pub window_samples: usize,
    pub pressure_drop_bar: f64,
}
impl Default for Fault {
    fn default() -> Self {
        Self {
            window_samples: 100,
            pressure_drop_bar: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Detection {
    pub rpm_above: f64,
    pub oil_pressure_below: f64,
}
impl Default for Detection {
    fn default() -> Self {
        Self {
            rpm_above: 5000.0,
            oil_pressure_below: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Chart {
    pub width: u32,
    pub height: u32,
}
impl Default for Chart {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub title: String,
    pub include_data_source: bool,
}
impl Default for Report {
    fn default() -> Self {
        Self {
            title: "Test Bench Analysis Report".into(),
            include_data_source: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
