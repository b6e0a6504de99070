use anyhow::{Result, bail};
use std::ops::Range;
use time::PrimitiveDateTime;

/// One timestamped reading from the test bench.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: PrimitiveDateTime,
    pub rpm: f64,
    /// bar
    pub oil_pressure: f64,
}

/// Samples ordered by strictly increasing timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    /// Validates ordering and values. Errors name the offending index.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        for (i, s) in samples.iter().enumerate() {
            if !s.rpm.is_finite() {
                bail!("sample {i}: rpm is not finite ({})", s.rpm);
            }
            if !s.oil_pressure.is_finite() {
                bail!("sample {i}: oil_pressure is not finite ({})", s.oil_pressure);
            }
        }
        if let Some(i) = samples
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            bail!(
                "sample {}: timestamp {} does not increase after {}",
                i + 1,
                samples[i + 1].timestamp,
                samples[i].timestamp
            );
        }
        Ok(Self { samples })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last timestamp of the trailing `window` samples.
    pub fn trailing_span(&self, window: usize) -> Option<(PrimitiveDateTime, PrimitiveDateTime)> {
        let range = trailing_window(self.len(), window);
        if range.is_empty() {
            return None;
        }
        Some((
            self.samples[range.start].timestamp,
            self.samples[range.end - 1].timestamp,
        ))
    }
}

impl<'a> IntoIterator for &'a SampleSeries {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Index range of the last `window` positions of a series of length `len`,
/// clamped to the series.
pub fn trailing_window(len: usize, window: usize) -> Range<usize> {
    len.saturating_sub(window)..len
}
