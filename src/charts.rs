// Visualizer: renders the assembled report as SVG chart artifacts.
//
// Chart failures are isolated: one failing chart is logged and skipped,
// the remaining charts and the textual report are still produced.
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{info, warn};

use crate::error::Error;
use crate::types::Report;

// Color scheme carried over from the published dashboard.
const BASELINE_COLOR: RGBColor = RGBColor(0xE7, 0x4C, 0x3C);
const AI_COLOR: RGBColor = RGBColor(0x2E, 0xCC, 0x71);
const SAVINGS_COLOR: RGBColor = RGBColor(0x34, 0x98, 0xDB);

fn render_error(chart: &str, reason: impl ToString) -> Error {
    Error::Render {
        chart: chart.to_string(),
        reason: reason.to_string(),
    }
}

/// Render every chart into `out_dir`, returning the paths that were
/// actually written. Failures never abort the pipeline.
pub fn render_all(report: &Report, out_dir: &Path) -> Vec<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(out_dir) {
        warn!(dir = %out_dir.display(), error = %e, "cannot create chart directory");
        return Vec::new();
    }

    let charts: [(&str, fn(&Report, &Path) -> Result<(), Error>); 3] = [
        ("cost_comparison.svg", cost_comparison),
        ("roi_timeline.svg", roi_timeline),
        ("summary_dashboard.svg", summary_dashboard),
    ];

    let mut written = Vec::new();
    for (name, render) in charts {
        let path = out_dir.join(name);
        match render(report, &path) {
            Ok(()) => {
                info!(path = %path.display(), "chart written");
                written.push(path);
            }
            Err(e) => warn!(chart = name, error = %e, "skipping chart"),
        }
    }
    written
}

/// Per-metric percent change, baseline → AI, in metric-name order.
fn metric_changes(report: &Report) -> Vec<(String, f64)> {
    report
        .baseline_metrics
        .iter()
        .map(|(name, &before)| {
            let after = report.ai_metrics.get(name).copied().unwrap_or(before);
            let change = if before.abs() > f64::EPSILON {
                (after / before - 1.0) * 100.0
            } else {
                0.0
            };
            (name.clone(), change)
        })
        .collect()
}

fn draw_change_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    report: &Report,
) -> Result<(), String> {
    let changes = metric_changes(report);
    let names: Vec<String> = changes.iter().map(|(n, _)| n.clone()).collect();
    let lo = changes.iter().map(|(_, c)| *c).fold(0.0, f64::min) - 10.0;
    let hi = changes.iter().map(|(_, c)| *c).fold(0.0, f64::max) + 10.0;

    let mut chart = ChartBuilder::on(area)
        .caption("Metric change with AI (%)", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(36)
        .y_label_area_size(48)
        .build_cartesian_2d(0.0..changes.len() as f64, lo..hi)
        .map_err(|e| e.to_string())?;
    chart
        .configure_mesh()
        .y_desc("Change (%)")
        .x_labels(changes.len())
        .x_label_formatter(&|x| {
            names
                .get(x.floor() as usize)
                .cloned()
                .unwrap_or_default()
        })
        .draw()
        .map_err(|e| e.to_string())?;

    chart
        .draw_series(changes.iter().enumerate().map(|(i, (_, change))| {
            let color = if *change < 0.0 { AI_COLOR } else { SAVINGS_COLOR };
            Rectangle::new(
                [(i as f64 + 0.2, 0.0), (i as f64 + 0.8, *change)],
                color.filled(),
            )
        }))
        .map_err(|e| e.to_string())?;

    // Zero line for orientation.
    chart
        .draw_series(LineSeries::new(
            [(0.0, 0.0), (changes.len() as f64, 0.0)],
            BASELINE_COLOR.stroke_width(1),
        ))
        .map_err(|e| e.to_string())?;
    Ok(())
}

fn draw_cumulative_net<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    report: &Report,
) -> Result<(), String> {
    let roi = &report.roi;
    let upfront = roi.total_investment - roi.yearly.iter().map(|y| y.costs).sum::<f64>();
    let horizon = roi.yearly.len() as f64;

    let points: Vec<(f64, f64)> = std::iter::once((0.0, 0.0))
        .chain(roi.yearly.iter().map(|y| (y.year as f64, y.cumulative_net / 1e12)))
        .collect();
    let lo = points.iter().map(|(_, v)| *v).fold(0.0, f64::min) - 0.5;
    let hi = points
        .iter()
        .map(|(_, v)| *v)
        .fold(upfront / 1e12, f64::max)
        + 0.5;

    let mut chart = ChartBuilder::on(area)
        .caption("Cumulative net benefit (¥ trillion)", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(36)
        .y_label_area_size(48)
        .build_cartesian_2d(0.0..horizon + 0.5, lo..hi)
        .map_err(|e| e.to_string())?;
    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("¥ trillion")
        .draw()
        .map_err(|e| e.to_string())?;

    chart
        .draw_series(AreaSeries::new(
            points.clone(),
            0.0,
            SAVINGS_COLOR.mix(0.25).filled(),
        ))
        .map_err(|e| e.to_string())?;
    chart
        .draw_series(LineSeries::new(points, SAVINGS_COLOR.stroke_width(3)))
        .map_err(|e| e.to_string())?;

    // Upfront investment level; payback is where the curve crosses it.
    chart
        .draw_series(LineSeries::new(
            [(0.0, upfront / 1e12), (horizon + 0.5, upfront / 1e12)],
            BASELINE_COLOR.stroke_width(1),
        ))
        .map_err(|e| e.to_string())?;
    if let Some(year) = roi.payback_period.years() {
        chart
            .draw_series(LineSeries::new(
                [(year as f64, lo), (year as f64, hi)],
                BASELINE_COLOR.stroke_width(2),
            ))
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Grouped percent-change bars, baseline vs. AI.
fn cost_comparison(report: &Report, path: &Path) -> Result<(), Error> {
    const CHART: &str = "cost_comparison";
    if report.baseline_metrics.is_empty() {
        return Err(render_error(CHART, "report has no baseline metrics"));
    }
    let root = SVGBackend::new(path, (900, 540)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_error(CHART, e))?;
    draw_change_bars(&root, report).map_err(|e| render_error(CHART, e))?;
    root.present().map_err(|e| render_error(CHART, e))?;
    Ok(())
}

/// Cumulative net benefit over the horizon with investment and payback
/// markers.
fn roi_timeline(report: &Report, path: &Path) -> Result<(), Error> {
    const CHART: &str = "roi_timeline";
    if report.roi.yearly.is_empty() {
        return Err(render_error(CHART, "report has no yearly ROI data"));
    }
    let root = SVGBackend::new(path, (900, 540)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_error(CHART, e))?;
    draw_cumulative_net(&root, report).map_err(|e| render_error(CHART, e))?;
    root.present().map_err(|e| render_error(CHART, e))?;
    Ok(())
}

/// Composite dashboard: metric changes on top, ROI curve below.
fn summary_dashboard(report: &Report, path: &Path) -> Result<(), Error> {
    const CHART: &str = "summary_dashboard";
    if report.baseline_metrics.is_empty() {
        return Err(render_error(CHART, "report has no baseline metrics"));
    }
    if report.roi.yearly.is_empty() {
        return Err(render_error(CHART, "report has no yearly ROI data"));
    }
    let root = SVGBackend::new(path, (1000, 900)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_error(CHART, e))?;
    let (upper, lower) = root.split_vertically(440);
    draw_change_bars(&upper, report).map_err(|e| render_error(CHART, e))?;
    draw_cumulative_net(&lower, report).map_err(|e| render_error(CHART, e))?;
    root.present().map_err(|e| render_error(CHART, e))?;
    Ok(())
}
