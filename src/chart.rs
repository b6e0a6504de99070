use crate::{config::Config, sample::SampleSeries, util::ensure_parent};
use anyhow::{Context, Result, bail};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const FRAME: Rgb<u8> = Rgb([60, 60, 60]);
const RPM_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
const OIL_COLOR: Rgb<u8> = Rgb([44, 160, 44]);
const FAULT_COLOR: Rgb<u8> = Rgb([214, 39, 40]);
const FAULT_ALPHA: f32 = 0.3;

const MARGIN_LEFT: u32 = 60;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 20;
const MARGIN_BOTTOM: u32 = 30;
const PANEL_GAP: u32 = 40;
const GRID_DIVISIONS: u32 = 5;

/// Renders RPM (upper) and oil pressure (lower) against time as a PNG,
/// shading the fault window on the lower panel. Overwrites `path`.
pub fn render(cfg: &Config, series: &SampleSeries, path: &Path) -> Result<()> {
    let img = draw(cfg, series)?;
    ensure_parent(path)?;
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("write chart: {}", path.display()))?;
    info!(
        "chart written {}x{} path={}",
        img.width(),
        img.height(),
        path.display()
    );
    Ok(())
}

pub const TITLE: &str = "Test Run Analysis: RPM vs Oil Pressure";

/// Legend for the rendered image, which itself carries no text.
pub fn legend(cfg: &Config) -> Vec<String> {
    vec![
        "Upper panel (blue): Engine RPM vs time".to_string(),
        "Lower panel (green): Oil Pressure (bar) vs time".to_string(),
        format!(
            "Red band (lower panel): Detected Deviation, the fault window of the last {} samples",
            cfg.fault.window_samples
        ),
    ]
}

fn draw(cfg: &Config, series: &SampleSeries) -> Result<RgbImage> {
    let (width, height) = (cfg.chart.width, cfg.chart.height);
    let (upper, lower) = Panel::stacked(width, height)?;
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

    let t0 = series.samples().first().map(|s| s.timestamp);
    let offset = |ts: time::PrimitiveDateTime| t0.map_or(0.0, |t0| (ts - t0).as_seconds_f64());
    let times: Vec<f64> = series.iter().map(|s| offset(s.timestamp)).collect();
    let rpm: Vec<f64> = series.iter().map(|s| s.rpm).collect();
    let oil: Vec<f64> = series.iter().map(|s| s.oil_pressure).collect();

    let x = Scale::fit(&times, 0.0);
    upper.grid(&mut img);
    lower.grid(&mut img);

    if let Some((from, to)) = series.trailing_span(cfg.fault.window_samples) {
        debug!(%from, %to, "shading fault window");
        lower.shade(&mut img, x.unit(offset(from)), x.unit(offset(to)));
    }

    upper.line(&mut img, &x, &Scale::fit(&rpm, 0.05), &times, &rpm, RPM_COLOR);
    lower.line(&mut img, &x, &Scale::fit(&oil, 0.05), &times, &oil, OIL_COLOR);

    upper.frame(&mut img, RPM_COLOR);
    lower.frame(&mut img, OIL_COLOR);
    Ok(img)
}

#[derive(Debug, Clone, Copy)]
struct Scale {
    min: f64,
    max: f64,
}

impl Scale {
    /// Bounds of `values` widened by `pad` of the span on each side.
    fn fit(values: &[f64], pad: f64) -> Self {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        let span = max - min;
        if span <= f64::EPSILON {
            return Self {
                min: min - 1.0,
                max: max + 1.0,
            };
        }
        Self {
            min: min - span * pad,
            max: max + span * pad,
        }
    }

    fn unit(&self, v: f64) -> f64 {
        ((v - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Panel {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl Panel {
    fn stacked(width: u32, height: u32) -> Result<(Panel, Panel)> {
        let inner_w = width.saturating_sub(MARGIN_LEFT + MARGIN_RIGHT);
        let inner_h = height.saturating_sub(MARGIN_TOP + MARGIN_BOTTOM + PANEL_GAP) / 2;
        if inner_w < 10 || inner_h < 10 {
            bail!("chart size {width}x{height} too small to draw");
        }
        let upper = Panel {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: inner_w,
            height: inner_h,
        };
        let lower = Panel {
            top: MARGIN_TOP + inner_h + PANEL_GAP,
            ..upper
        };
        Ok((upper, lower))
    }

    fn px(&self, ux: f64) -> f32 {
        self.left as f32 + (ux as f32) * (self.width - 1) as f32
    }

    fn py(&self, uy: f64) -> f32 {
        self.top as f32 + (1.0 - uy as f32) * (self.height - 1) as f32
    }

    fn grid(&self, img: &mut RgbImage) {
        let (x0, x1) = (self.px(0.0), self.px(1.0));
        let (y0, y1) = (self.py(0.0), self.py(1.0));
        for k in 1..GRID_DIVISIONS {
            let u = k as f64 / GRID_DIVISIONS as f64;
            draw_line_segment_mut(img, (self.px(u), y0), (self.px(u), y1), GRID);
            draw_line_segment_mut(img, (x0, self.py(u)), (x1, self.py(u)), GRID);
        }
    }

    fn shade(&self, img: &mut RgbImage, from: f64, to: f64) {
        let x0 = self.px(from.min(to)).floor() as u32;
        let x1 = self.px(from.max(to)).ceil() as u32;
        for y in self.top..self.top + self.height {
            for x in x0..=x1.min(self.left + self.width - 1) {
                blend(img.get_pixel_mut(x, y), FAULT_COLOR, FAULT_ALPHA);
            }
        }
    }

    fn line(&self, img: &mut RgbImage, x: &Scale, y: &Scale, xs: &[f64], ys: &[f64], color: Rgb<u8>) {
        let points: Vec<(f32, f32)> = xs
            .iter()
            .zip(ys)
            .map(|(&xv, &yv)| (self.px(x.unit(xv)), self.py(y.unit(yv))))
            .collect();
        match points.as_slice() {
            [] => {}
            [(px, py)] => {
                let rect = Rect::at(*px as i32 - 1, *py as i32 - 1).of_size(3, 3);
                draw_filled_rect_mut(img, rect, color);
            }
            pts => {
                for w in pts.windows(2) {
                    draw_line_segment_mut(img, w[0], w[1], color);
                }
            }
        }
    }

    /// Border plus a legend swatch in the series colour.
    fn frame(&self, img: &mut RgbImage, legend: Rgb<u8>) {
        let border = Rect::at(self.left as i32, self.top as i32).of_size(self.width, self.height);
        draw_hollow_rect_mut(img, border, FRAME);
        let swatch = Rect::at(self.left as i32 + 8, self.top as i32 + 8).of_size(24, 8);
        draw_filled_rect_mut(img, swatch, legend);
    }
}

fn blend(px: &mut Rgb<u8>, over: Rgb<u8>, alpha: f32) {
    for c in 0..3 {
        let v = over.0[c] as f32 * alpha + px.0[c] as f32 * (1.0 - alpha);
        px.0[c] = v.round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::generate;

    #[test]
    fn fault_window_is_shaded_on_lower_panel_only() {
        let cfg = Config::default();
        let series = generate(&cfg, 7).unwrap();
        let img = draw(&cfg, &series).unwrap();
        let (upper, lower) = Panel::stacked(cfg.chart.width, cfg.chart.height).unwrap();

        // Mid-height, inside the last sixth of the time axis.
        let x = lower.px(0.93) as u32;
        let shaded = img.get_pixel(x, lower.py(0.5) as u32);
        assert!(shaded.0[0] > shaded.0[1] + 30, "expected red tint, got {shaded:?}");

        let clear = img.get_pixel(lower.px(0.3) as u32, lower.py(0.1) as u32);
        assert_eq!(*clear, BACKGROUND);

        let upper_px = img.get_pixel(x, upper.py(0.5) as u32);
        assert_ne!(upper_px.0[0], shaded.0[0]);
    }

    #[test]
    fn shading_starts_at_first_fault_sample() {
        let cfg = Config::default();
        let series = generate(&cfg, 7).unwrap();
        let img = draw(&cfg, &series).unwrap();
        let (_, lower) = Panel::stacked(cfg.chart.width, cfg.chart.height).unwrap();

        let n = series.len();
        let first_fault = n - cfg.fault.window_samples;
        let ux = |i: usize| i as f64 / (n - 1) as f64;
        // Above the oil trace and between grid lines.
        let y = lower.py(0.9) as u32;

        let edge = img.get_pixel(lower.px(ux(first_fault)) as u32, y);
        assert!(edge.0[0] > edge.0[1] + 30, "sample {first_fault} not shaded: {edge:?}");

        let before = img.get_pixel(lower.px(ux(first_fault - 2)) as u32, y);
        assert_eq!(*before, BACKGROUND, "sample {} shaded", first_fault - 2);

        let last = img.get_pixel(lower.px(1.0) as u32 - 1, y);
        assert!(last.0[0] > last.0[1] + 30);
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        let mut cfg = Config::default();
        cfg.chart.width = 50;
        cfg.chart.height = 50;
        let err = draw(&cfg, &SampleSeries::empty()).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }
}
