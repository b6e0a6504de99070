use crate::{
    config::Config,
    dataset,
    detector::{DeviationRule, detect},
    pipeline::{Artifacts, Pipeline, RunOutput, Source},
    util::{ensure_dir, ensure_parent, hash_file, now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bench-agent")]
#[command(about = "Test bench log analyzer (synthetic data + deviation rule + chart + report)")]
pub struct Args {
    /// Defaults to `run` with no overrides.
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Path to config TOML. If omitted, uses ./bench-agent.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a synthetic run, then detect, chart and report.
    Run {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Analyze an existing CSV log.
    Analyze {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Load a CSV log and print the findings as JSON.
    Detect {
        #[arg(long)]
        input: PathBuf,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref())? {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let default_cmd = Command::Run {
        seed: None,
        samples: None,
        out_dir: None,
    };
    let cmd = args.cmd.as_ref().unwrap_or(&default_cmd);

    match cmd {
        Command::Run {
            seed,
            samples,
            out_dir,
        } => {
            let mut cfg = cfg;
            if let Some(n) = samples {
                cfg.generator.samples = *n;
            }
            let out_dir = resolve_out_dir(&cfg, out_dir.as_deref());
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, &out_dir).as_deref())?;
            let seed = seed.or(cfg.global.seed).unwrap_or_else(rand::random::<u64>);
            info!("seed={seed}");
            let provenance = format!("seed:{seed}");
            run(&cfg, &Source::Synthetic { seed }, &out_dir, &provenance)
        }
        Command::Analyze { input, out_dir } => {
            let out_dir = resolve_out_dir(&cfg, out_dir.as_deref());
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, &out_dir).as_deref())?;
            let input_hash = hash_file(input)
                .with_context(|| format!("hashing input: {}", input.display()))?;
            let provenance = format!("file:{input_hash}");
            run(&cfg, &Source::File(input.clone()), &out_dir, &provenance)
        }
        Command::Detect { input } => {
            let _guard = init_logging(&args, &cfg, None)?;
            detect_only(&cfg, input)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = user {
        if !p.exists() {
            return Err(anyhow!("config does not exist: {}", p.display()));
        }
        return Ok(Some(p.to_path_buf()));
    }
    let default = PathBuf::from("bench-agent.toml");
    Ok(default.exists().then_some(default))
}

fn resolve_out_dir(cfg: &Config, user: Option<&Path>) -> PathBuf {
    user.map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir))
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the JSON output of `detect` and the run summary.
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        ensure_parent(path)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn run(cfg: &Config, source: &Source, out_dir: &Path, provenance: &str) -> Result<()> {
    let run_id = sha256_hex(format!("{}:{}", cfg.normalized_for_hash(), provenance).as_bytes());
    ensure_dir(out_dir)?;

    let pipeline = Pipeline::new(cfg);
    let artifacts = pipeline.artifacts(out_dir);

    info!("run_id={run_id} out={}", out_dir.display());

    let started = now_rfc3339();
    let out = pipeline.run(source, &artifacts)?;

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary(&run_id, &started, source, &artifacts, &out))?
        );
    }

    Ok(())
}

fn summary(
    run_id: &str,
    started: &str,
    source: &Source,
    artifacts: &Artifacts,
    out: &RunOutput,
) -> serde_json::Value {
    let seed = match source {
        Source::Synthetic { seed } => Some(*seed),
        Source::File(_) => None,
    };
    serde_json::json!({
        "run_id": run_id,
        "status": "ok",
        "started": started,
        "finished": now_rfc3339(),
        "seed": seed,
        "samples": out.samples,
        "data": out.data,
        "data_sha256": out.data_sha256,
        "chart": artifacts.chart,
        "report": artifacts.report,
        "findings": out.findings,
    })
}

fn detect_only(cfg: &Config, input: &Path) -> Result<()> {
    let series = dataset::read_csv(input)?;
    let findings = detect(&DeviationRule::from_config(cfg), &series);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "samples": series.len(),
            "findings": findings,
        }))?
    );
    Ok(())
}

fn resolve_log_path(cfg: &Config, out_dir: &Path) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(out_dir.join("bench-agent.log"))
}
