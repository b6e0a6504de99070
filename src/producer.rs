use crate::{
    config::Config,
    sample::{Sample, SampleSeries, trailing_window},
    util::parse_timestamp,
};
use anyhow::{Context, Result, anyhow, bail};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use time::Duration;
use tracing::debug;

/// Synthesizes a test-bench run: a noisy linear RPM ramp, oil pressure that
/// falls with RPM, and a pressure drop over the trailing fault window.
///
/// Equal `seed`s produce identical series.
pub fn generate(cfg: &Config, seed: u64) -> Result<SampleSeries> {
    let g = &cfg.generator;
    let n = g.samples;

    if g.interval_seconds <= 0 {
        bail!("generator.interval_seconds must be positive: {}", g.interval_seconds);
    }
    if g.rpm_per_bar == 0.0 || !g.rpm_per_bar.is_finite() {
        bail!("generator.rpm_per_bar must be finite and non-zero: {}", g.rpm_per_bar);
    }
    if g.rpm_noise_std_dev < 0.0 || !g.rpm_noise_std_dev.is_finite() {
        bail!("generator.rpm_noise_std_dev must be finite and >= 0: {}", g.rpm_noise_std_dev);
    }
    let noise = Normal::new(0.0, g.rpm_noise_std_dev)
        .map_err(|e| anyhow!("generator.rpm_noise_std_dev={}: {e}", g.rpm_noise_std_dev))?;
    let start = parse_timestamp(&g.start).with_context(|| "generator.start")?;
    let step = Duration::seconds(g.interval_seconds);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let fault = trailing_window(n, cfg.fault.window_samples);
    let mut samples = Vec::with_capacity(n);
    let mut timestamp = start;

    for (i, ramp) in linspace(g.rpm_start, g.rpm_end, n).enumerate() {
        if i > 0 {
            timestamp = timestamp
                .checked_add(step)
                .ok_or_else(|| anyhow!("timestamp overflow at sample {i}"))?;
        }
        let rpm = ramp + noise.sample(&mut rng);
        let mut oil_pressure = g.oil_pressure_base - rpm / g.rpm_per_bar;
        if fault.contains(&i) {
            oil_pressure -= cfg.fault.pressure_drop_bar;
        }
        samples.push(Sample {
            timestamp,
            rpm,
            oil_pressure,
        });
    }

    debug!(
        samples = n,
        seed,
        fault_start = fault.start,
        "synthetic series generated"
    );
    SampleSeries::new(samples)
}

/// `n` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| {
        if n > 1 && i == n - 1 {
            end
        } else {
            start + step * i as f64
        }
    })
}
