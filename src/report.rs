// Report assembler: composes calculator outputs into the final report,
// applies the documented rounding policy, persists/reloads JSON and
// prints the console preview.
use std::path::Path;

use chrono::Utc;
use tabled::{settings::Style, Table};

use crate::config::ImprovementFactors;
use crate::error::Result;
use crate::types::{
    Metrics, MetricComparisonRow, Report, RoiReport, SavingsReport, Summary,
    ADMIN_HOURS_PER_PATIENT, BILLING_ERROR_RATE, PATIENTS_PER_WORKER,
};
use crate::util::{format_number, format_trillions};

/// Rounding policy for headline figures:
/// - trillion-yen amounts: one decimal place,
/// - percentages: whole points,
/// - payback period: whole years (or absent when not reached).
fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round0(v: f64) -> f64 {
    v.round()
}

fn factor_percentage(factors: &ImprovementFactors, metric: &str) -> f64 {
    factors.get(metric).map_or(0.0, |f| round0(f.factor * 100.0))
}

/// Pure composition of the four calculator outputs plus the headline
/// summary. No new computation beyond selection and rounding.
pub fn assemble(
    baseline: Metrics,
    ai_metrics: Metrics,
    savings: SavingsReport,
    roi: RoiReport,
    factors: &ImprovementFactors,
) -> Report {
    let summary = Summary {
        total_annual_savings_trillion_yen: round1(savings.total_annual_savings / 1e12),
        five_year_roi_percentage: round0(roi.total_roi_percentage),
        payback_period_years: roi.payback_period.years(),
        admin_time_reduction_percentage: factor_percentage(factors, ADMIN_HOURS_PER_PATIENT),
        error_reduction_percentage: factor_percentage(factors, BILLING_ERROR_RATE),
        throughput_increase_percentage: factor_percentage(factors, PATIENTS_PER_WORKER),
    };
    Report {
        generated_at: Utc::now(),
        baseline_metrics: baseline,
        ai_metrics,
        savings,
        roi,
        summary,
    }
}

pub fn write_json(path: &Path, report: &Report) -> Result<()> {
    let s = serde_json::to_string_pretty(report)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn read_json(path: &Path) -> Result<Report> {
    let s = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

fn comparison_rows(report: &Report) -> Vec<MetricComparisonRow> {
    report
        .baseline_metrics
        .iter()
        .map(|(name, &before)| {
            let after = report.ai_metrics.get(name).copied().unwrap_or(before);
            let change = if before.abs() > f64::EPSILON {
                format!("{:+.1}%", (after / before - 1.0) * 100.0)
            } else {
                "n/a".to_string()
            };
            MetricComparisonRow {
                metric: name.clone(),
                baseline: format_number(before, 3),
                with_ai: format_number(after, 3),
                change,
            }
        })
        .collect()
}

/// Print the metric comparison table and the headline numbers.
pub fn preview(report: &Report) {
    println!("Baseline vs AI-improved metrics\n");
    let table = Table::new(comparison_rows(report))
        .with(Style::markdown())
        .to_string();
    println!("{}\n", table);

    let summary = &report.summary;
    println!(
        "Annual savings: {} (¥{} total)",
        format_trillions(report.savings.total_annual_savings),
        format_number(report.savings.total_annual_savings, 0),
    );
    println!(
        "{}-year ROI: {:.0}%",
        report.roi.yearly.len(),
        summary.five_year_roi_percentage
    );
    println!("Payback period: {}", report.roi.payback_period);
    println!(
        "Admin time -{:.0}%, errors -{:.0}%, throughput +{:.0}%",
        summary.admin_time_reduction_percentage,
        summary.error_reduction_percentage,
        summary.throughput_increase_percentage,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ai_impact_metrics, cost_savings, roi_analysis};
    use crate::config::JapanConstants;
    use crate::types::{COST_PER_PATIENT, PROCESSING_TIME_HOURS};

    fn scenario_report() -> Report {
        let baseline = Metrics::from([
            (ADMIN_HOURS_PER_PATIENT.to_string(), 2.0),
            (PROCESSING_TIME_HOURS.to_string(), 4.0),
            (BILLING_ERROR_RATE.to_string(), 0.025),
            (PATIENTS_PER_WORKER.to_string(), 20.0),
            (COST_PER_PATIENT.to_string(), 250_000.0),
        ]);
        let factors = ImprovementFactors::default();
        let ai = ai_impact_metrics(&baseline, &factors);
        let savings = cost_savings(&baseline, &ai, &JapanConstants::default()).unwrap();
        let roi = roi_analysis(&savings, 3e12, 0.6e12, 5, 0.05).unwrap();
        assemble(baseline, ai, savings, roi, &factors)
    }

    #[test]
    fn summary_rounds_per_policy() {
        let report = scenario_report();
        let summary = &report.summary;

        // Whole-point percentages.
        assert_eq!(summary.five_year_roi_percentage.fract(), 0.0);
        assert_eq!(summary.admin_time_reduction_percentage, 52.0);
        assert_eq!(summary.error_reduction_percentage, 76.0);
        assert_eq!(summary.throughput_increase_percentage, 24.0);

        // One decimal for trillions.
        let t = summary.total_annual_savings_trillion_yen;
        assert!((t * 10.0 - (t * 10.0).round()).abs() < 1e-9);

        // Payback, when reached, is a whole year within the horizon.
        if let Some(years) = summary.payback_period_years {
            assert!(years >= 1 && years <= 5);
        }
    }

    #[test]
    fn summary_selects_from_calculator_outputs() {
        let report = scenario_report();
        assert_eq!(
            report.summary.total_annual_savings_trillion_yen,
            (report.savings.total_annual_savings / 1e12 * 10.0).round() / 10.0
        );
        assert_eq!(
            report.summary.five_year_roi_percentage,
            report.roi.total_roi_percentage.round()
        );
        assert_eq!(
            report.summary.payback_period_years,
            report.roi.payback_period.years()
        );
    }

    #[test]
    fn json_round_trip_preserves_the_report() {
        let report = scenario_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_report.json");

        write_json(&path, &report).unwrap();
        let reloaded = read_json(&path).unwrap();

        assert_eq!(reloaded.baseline_metrics, report.baseline_metrics);
        assert_eq!(reloaded.ai_metrics, report.ai_metrics);
        assert_eq!(reloaded.summary, report.summary);
        assert_eq!(reloaded.roi.payback_period, report.roi.payback_period);
        assert!(
            (reloaded.savings.total_annual_savings - report.savings.total_annual_savings).abs()
                < 1e-6
        );
        for (a, b) in reloaded.roi.yearly.iter().zip(&report.roi.yearly) {
            assert!((a.cumulative_net - b.cumulative_net).abs() < 1e-6);
        }
    }

    #[test]
    fn comparison_rows_cover_every_baseline_metric() {
        let report = scenario_report();
        let rows = comparison_rows(&report);
        assert_eq!(rows.len(), report.baseline_metrics.len());
        let admin = rows
            .iter()
            .find(|r| r.metric == ADMIN_HOURS_PER_PATIENT)
            .unwrap();
        assert_eq!(admin.change, "-52.0%");
    }
}
