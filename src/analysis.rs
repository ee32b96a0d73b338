// Metrics calculator: the four pure operations of the pipeline.
//
// Everything here is deterministic and side-effect free; inputs are
// borrowed read-only and never mutated.
use crate::config::{AnalysisParams, ImprovementFactors, JapanConstants};
use crate::error::{Error, Result};
use crate::types::{
    Dataset, Metrics, PaybackPeriod, RoiReport, SavingsReport, YearlyRoi,
    ADMIN_HOURS_PER_PATIENT, BILLING_ERROR_RATE, COST_PER_PATIENT, PATIENTS_PER_WORKER,
    PROCESSING_TIME_HOURS,
};
use crate::util::average;

fn missing(category: &str, field: &str) -> Error {
    Error::MissingField {
        category: category.to_string(),
        field: field.to_string(),
    }
}

fn column(dataset: &Dataset, category: &str, field: &str) -> Result<Vec<f64>> {
    let rows = dataset
        .category(category)
        .ok_or_else(|| missing(category, field))?;
    let values: Vec<f64> = rows.iter().filter_map(|r| r.get(field)).collect();
    if values.is_empty() {
        return Err(missing(category, field));
    }
    Ok(values)
}

fn column_mean(dataset: &Dataset, category: &str, field: &str) -> Result<f64> {
    Ok(average(&column(dataset, category, field)?))
}

fn column_sum(dataset: &Dataset, category: &str, field: &str) -> Result<f64> {
    Ok(column(dataset, category, field)?.iter().sum())
}

fn metric(metrics: &Metrics, which: &str, field: &str) -> Result<f64> {
    metrics.get(field).copied().ok_or_else(|| missing(which, field))
}

/// Aggregate the observed fields into a flat baseline snapshot.
///
/// Administrative efficiency comes from per-hospital means; workforce
/// productivity from national totals; per-patient cost from the most
/// recent expenditure year. Idempotent for a given dataset.
pub fn baseline_metrics(dataset: &Dataset, constants: &JapanConstants) -> Result<Metrics> {
    let mut baseline = Metrics::new();

    baseline.insert(
        ADMIN_HOURS_PER_PATIENT.to_string(),
        column_mean(dataset, "administrative_costs", "hours_per_patient")?,
    );
    baseline.insert(
        PROCESSING_TIME_HOURS.to_string(),
        column_mean(dataset, "administrative_costs", "avg_processing_time")?,
    );
    baseline.insert(
        BILLING_ERROR_RATE.to_string(),
        column_mean(dataset, "administrative_costs", "error_rate")?,
    );

    let total_workers = column_sum(dataset, "workforce", "total_workers")?;
    let total_patients = column_sum(dataset, "patient_volume", "total_patients")?;
    let patients_per_worker = if total_workers > 0.0 {
        total_patients / total_workers
    } else {
        constants.patients_per_worker_baseline
    };
    baseline.insert(PATIENTS_PER_WORKER.to_string(), patients_per_worker);

    // Expenditure of the most recent year in the dataset.
    let expenditure_rows = dataset
        .category("medical_expenditure")
        .ok_or_else(|| missing("medical_expenditure", "total_expenditure"))?;
    let latest = expenditure_rows
        .iter()
        .filter_map(|r| Some((r.get("year")?, r.get("total_expenditure")?)))
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .ok_or_else(|| missing("medical_expenditure", "total_expenditure"))?;
    let recipients = if total_patients > 0.0 {
        total_patients
    } else {
        constants.healthcare_recipients
    };
    baseline.insert(COST_PER_PATIENT.to_string(), latest.1 / recipients);

    Ok(baseline)
}

/// Apply the configured improvement factors to a baseline snapshot.
///
/// Metrics with no configured factor pass through unchanged; factor
/// names absent from the baseline are ignored. Every key of the output
/// exists in the input.
pub fn ai_impact_metrics(baseline: &Metrics, factors: &ImprovementFactors) -> Metrics {
    let mut adjusted = baseline.clone();
    for (name, factor) in factors.iter() {
        if let Some(&value) = baseline.get(name) {
            adjusted.insert(name.to_string(), factor.apply(value));
        }
    }
    adjusted
}

/// Annual cost savings from the baseline → AI metric deltas.
///
/// Four channels: administrative labor hours, billing-error costs,
/// additional throughput revenue, and processing staff time.
pub fn cost_savings(
    baseline: &Metrics,
    ai_metrics: &Metrics,
    constants: &JapanConstants,
) -> Result<SavingsReport> {
    for (name, value) in [
        ("total_healthcare_cost", constants.total_healthcare_cost),
        ("average_hourly_wage", constants.average_hourly_wage),
        ("healthcare_recipients", constants.healthcare_recipients),
        ("error_cost_multiplier", constants.error_cost_multiplier),
    ] {
        if value <= 0.0 {
            return Err(Error::InvalidCostConstants {
                name: name.to_string(),
                value,
            });
        }
    }

    let recipients = constants.healthcare_recipients;
    let wage = constants.average_hourly_wage;

    let admin_hours_saved = (metric(baseline, "baseline_metrics", ADMIN_HOURS_PER_PATIENT)?
        - metric(ai_metrics, "ai_metrics", ADMIN_HOURS_PER_PATIENT)?)
        * recipients;
    let admin_labor_savings = admin_hours_saved * wage;

    let error_rate_delta = metric(baseline, "baseline_metrics", BILLING_ERROR_RATE)?
        - metric(ai_metrics, "ai_metrics", BILLING_ERROR_RATE)?;
    let baseline_error_cost = metric(baseline, "baseline_metrics", COST_PER_PATIENT)?
        * metric(baseline, "baseline_metrics", BILLING_ERROR_RATE)?
        * constants.error_cost_multiplier;
    let error_cost_savings = error_rate_delta * baseline_error_cost * recipients;

    let baseline_throughput = metric(baseline, "baseline_metrics", PATIENTS_PER_WORKER)?;
    let additional_revenue = if baseline_throughput > 0.0 {
        let additional_patients = recipients
            * (metric(ai_metrics, "ai_metrics", PATIENTS_PER_WORKER)? / baseline_throughput - 1.0);
        additional_patients
            * metric(baseline, "baseline_metrics", COST_PER_PATIENT)?
            * constants.recoverable_revenue_share
    } else {
        0.0
    };

    let processing_hours_saved = (metric(baseline, "baseline_metrics", PROCESSING_TIME_HOURS)?
        - metric(ai_metrics, "ai_metrics", PROCESSING_TIME_HOURS)?)
        * recipients
        * constants.processing_staff_share;
    let processing_efficiency_savings = processing_hours_saved * wage;

    let total_annual_savings = admin_labor_savings
        + error_cost_savings
        + additional_revenue
        + processing_efficiency_savings;

    Ok(SavingsReport {
        admin_labor_savings,
        error_cost_savings,
        additional_revenue,
        processing_efficiency_savings,
        total_annual_savings,
    })
}

/// Upfront investment and annual maintenance, from the `ai_costs`
/// dataset when present and usable, otherwise the configured defaults.
pub fn investment_costs(dataset: &Dataset, params: &AnalysisParams) -> (f64, f64) {
    let from_dataset = dataset.category("ai_costs").and_then(|rows| {
        let upfront: f64 = rows.iter().filter_map(|r| r.get("upfront_cost")).sum();
        let maintenance: f64 = rows
            .iter()
            .filter_map(|r| r.get("annual_maintenance"))
            .sum();
        (upfront > 0.0).then_some((upfront, maintenance))
    });
    from_dataset.unwrap_or((params.default_upfront_cost, params.default_annual_maintenance))
}

/// Year-by-year ROI projection over the horizon.
///
/// Savings grow by `growth` each year; maintenance is flat. ROI is the
/// cumulative net savings minus the upfront investment, relative to
/// that investment. Payback is the smallest year whose cumulative net
/// savings reach the investment, `NotReached` otherwise.
pub fn roi_analysis(
    savings: &SavingsReport,
    investment_cost: f64,
    annual_maintenance: f64,
    horizon_years: u32,
    growth: f64,
) -> Result<RoiReport> {
    if investment_cost <= 0.0 {
        return Err(Error::DivisionByZero {
            what: "roi analysis".to_string(),
            value: investment_cost,
        });
    }

    let mut yearly = Vec::with_capacity(horizon_years as usize);
    let mut cumulative_net = 0.0;
    let mut payback = PaybackPeriod::NotReached;

    for year in 1..=horizon_years {
        let year_savings = savings.total_annual_savings * (1.0 + growth).powi(year as i32 - 1);
        let costs = annual_maintenance;
        let net_benefit = year_savings - costs;
        cumulative_net += net_benefit;
        if payback == PaybackPeriod::NotReached && cumulative_net >= investment_cost {
            payback = PaybackPeriod::Reached(year);
        }
        yearly.push(YearlyRoi {
            year,
            savings: year_savings,
            costs,
            net_benefit,
            cumulative_net,
            roi_percentage: (cumulative_net - investment_cost) / investment_cost * 100.0,
        });
    }

    Ok(RoiReport {
        total_roi_percentage: yearly.last().map_or(-100.0, |y| y.roi_percentage),
        payback_period: payback,
        total_investment: investment_cost + annual_maintenance * horizon_years as f64,
        net_benefit: cumulative_net - investment_cost,
        yearly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Factor;
    use crate::datasets::{SampleGenerator, CATEGORIES};
    use crate::types::Record;

    const TOL: f64 = 1e-9;

    fn constants() -> JapanConstants {
        JapanConstants::default()
    }

    fn scenario_baseline() -> Metrics {
        Metrics::from([
            (ADMIN_HOURS_PER_PATIENT.to_string(), 2.0),
            (PROCESSING_TIME_HOURS.to_string(), 4.0),
            (BILLING_ERROR_RATE.to_string(), 0.025),
            (PATIENTS_PER_WORKER.to_string(), 20.0),
            (COST_PER_PATIENT.to_string(), 250_000.0),
        ])
    }

    fn test_dataset() -> Dataset {
        let mut dataset = Dataset::new();
        dataset.insert(
            "administrative_costs",
            vec![
                Record::from([
                    ("hospital_id", 1.0),
                    ("admin_percentage", 0.016),
                    ("hours_per_patient", 2.0),
                    ("avg_processing_time", 4.0),
                    ("error_rate", 0.025),
                ]),
                Record::from([
                    ("hospital_id", 2.0),
                    ("admin_percentage", 0.018),
                    ("hours_per_patient", 2.5),
                    ("avg_processing_time", 4.5),
                    ("error_rate", 0.020),
                ]),
                Record::from([
                    ("hospital_id", 3.0),
                    ("admin_percentage", 0.015),
                    ("hours_per_patient", 1.5),
                    ("avg_processing_time", 3.5),
                    ("error_rate", 0.030),
                ]),
            ],
        );
        dataset.insert(
            "workforce",
            vec![
                Record::from([
                    ("prefecture_id", 1.0),
                    ("total_workers", 10_000.0),
                    ("administrative_workers", 2_000.0),
                ]),
                Record::from([
                    ("prefecture_id", 2.0),
                    ("total_workers", 8_000.0),
                    ("administrative_workers", 1_600.0),
                ]),
                Record::from([
                    ("prefecture_id", 3.0),
                    ("total_workers", 12_000.0),
                    ("administrative_workers", 2_400.0),
                ]),
            ],
        );
        dataset.insert(
            "patient_volume",
            vec![
                Record::from([
                    ("prefecture_id", 1.0),
                    ("year", 2023.0),
                    ("total_patients", 1_000_000.0),
                    ("outpatient_visits", 5_000_000.0),
                ]),
                Record::from([
                    ("prefecture_id", 2.0),
                    ("year", 2023.0),
                    ("total_patients", 800_000.0),
                    ("outpatient_visits", 4_000_000.0),
                ]),
                Record::from([
                    ("prefecture_id", 3.0),
                    ("year", 2023.0),
                    ("total_patients", 1_200_000.0),
                    ("outpatient_visits", 6_000_000.0),
                ]),
            ],
        );
        dataset.insert(
            "medical_expenditure",
            vec![
                Record::from([
                    ("year", 2022.0),
                    ("total_expenditure", 44e12),
                    ("admin_expenditure", 0.70e12),
                ]),
                Record::from([
                    ("year", 2023.0),
                    ("total_expenditure", 45e12),
                    ("admin_expenditure", 0.72e12),
                ]),
            ],
        );
        dataset.insert(
            "ai_costs",
            vec![Record::from([
                ("upfront_cost", 3e12),
                ("annual_maintenance", 0.6e12),
                ("training_cost", 0.3e12),
            ])],
        );
        dataset
    }

    #[test]
    fn baseline_aggregates_observed_fields() {
        let baseline = baseline_metrics(&test_dataset(), &constants()).unwrap();
        assert!((baseline[ADMIN_HOURS_PER_PATIENT] - 2.0).abs() < TOL);
        assert!((baseline[PROCESSING_TIME_HOURS] - 4.0).abs() < TOL);
        assert!((baseline[BILLING_ERROR_RATE] - 0.025).abs() < TOL);
        // 3M patients / 30k workers.
        assert!((baseline[PATIENTS_PER_WORKER] - 100.0).abs() < TOL);
        // Latest year (2023) expenditure over 3M patients.
        assert!((baseline[COST_PER_PATIENT] - 15_000_000.0).abs() < 1e-3);
    }

    #[test]
    fn baseline_is_idempotent() {
        let dataset = test_dataset();
        let first = baseline_metrics(&dataset, &constants()).unwrap();
        let second = baseline_metrics(&dataset, &constants()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn baseline_on_generated_data_stays_near_documented_values() {
        let dataset = SampleGenerator::new(42).generate(&CATEGORIES);
        let baseline = baseline_metrics(&dataset, &constants()).unwrap();
        assert!((baseline[ADMIN_HOURS_PER_PATIENT] - 2.0).abs() < 0.5);
        assert!(baseline[BILLING_ERROR_RATE] > 0.0 && baseline[BILLING_ERROR_RATE] < 0.05);
        assert!(baseline[COST_PER_PATIENT] > 0.0);
    }

    #[test]
    fn missing_field_is_reported_with_context() {
        let mut dataset = test_dataset();
        dataset.insert(
            "administrative_costs",
            vec![Record::from([("hospital_id", 1.0)])],
        );
        let err = baseline_metrics(&dataset, &constants()).unwrap_err();
        match err {
            Error::MissingField { category, field } => {
                assert_eq!(category, "administrative_costs");
                assert_eq!(field, "hours_per_patient");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn ai_impact_matches_documented_scenario() {
        let ai = ai_impact_metrics(&scenario_baseline(), &ImprovementFactors::default());
        assert!((ai[ADMIN_HOURS_PER_PATIENT] - 0.96).abs() < TOL);
        assert!((ai[BILLING_ERROR_RATE] - 0.006).abs() < TOL);
        assert!((ai[PATIENTS_PER_WORKER] - 24.8).abs() < TOL);
        assert!((ai[COST_PER_PATIENT] - 232_250.0).abs() < 1e-6);
    }

    #[test]
    fn unconfigured_metrics_pass_through_unchanged() {
        let mut baseline = scenario_baseline();
        baseline.insert("bed_occupancy_rate".to_string(), 0.85);
        let mut factors = ImprovementFactors::empty();
        factors.set(BILLING_ERROR_RATE, Factor::reduce(0.5));

        let ai = ai_impact_metrics(&baseline, &factors);
        assert_eq!(ai.len(), baseline.len());
        for (name, value) in &baseline {
            if name == BILLING_ERROR_RATE {
                assert!((ai[name] - value * 0.5).abs() < TOL);
            } else {
                assert_eq!(ai[name], *value);
            }
        }
    }

    #[test]
    fn factor_for_unknown_metric_is_ignored() {
        let mut factors = ImprovementFactors::empty();
        factors.set("nonexistent_metric", Factor::reduce(0.9));
        let baseline = scenario_baseline();
        let ai = ai_impact_metrics(&baseline, &factors);
        assert_eq!(ai, baseline);
    }

    #[test]
    fn adjustment_direction_is_explicit_per_metric() {
        let baseline = scenario_baseline();
        let ai = ai_impact_metrics(&baseline, &ImprovementFactors::default());
        // Reductions shrink, increases grow.
        assert!(ai[ADMIN_HOURS_PER_PATIENT] < baseline[ADMIN_HOURS_PER_PATIENT]);
        assert!(ai[PROCESSING_TIME_HOURS] < baseline[PROCESSING_TIME_HOURS]);
        assert!(ai[BILLING_ERROR_RATE] < baseline[BILLING_ERROR_RATE]);
        assert!(ai[COST_PER_PATIENT] < baseline[COST_PER_PATIENT]);
        assert!(ai[PATIENTS_PER_WORKER] > baseline[PATIENTS_PER_WORKER]);
    }

    #[test]
    fn savings_channels_are_positive_for_the_scenario() {
        let baseline = scenario_baseline();
        let ai = ai_impact_metrics(&baseline, &ImprovementFactors::default());
        let savings = cost_savings(&baseline, &ai, &constants()).unwrap();

        assert!(savings.admin_labor_savings > 0.0);
        assert!(savings.error_cost_savings > 0.0);
        assert!(savings.additional_revenue > 0.0);
        assert!(savings.processing_efficiency_savings > 0.0);
        let total = savings.admin_labor_savings
            + savings.error_cost_savings
            + savings.additional_revenue
            + savings.processing_efficiency_savings;
        assert!((savings.total_annual_savings - total).abs() < 1e-3);

        // Admin channel: 1.04 hours saved × 47M patients × ¥3000.
        assert!((savings.admin_labor_savings - 1.04 * 47e6 * 3000.0).abs() < 1.0);
    }

    #[test]
    fn non_positive_constants_are_rejected() {
        let baseline = scenario_baseline();
        let ai = ai_impact_metrics(&baseline, &ImprovementFactors::default());
        let mut bad = constants();
        bad.total_healthcare_cost = 0.0;
        let err = cost_savings(&baseline, &ai, &bad).unwrap_err();
        match err {
            Error::InvalidCostConstants { name, value } => {
                assert_eq!(name, "total_healthcare_cost");
                assert_eq!(value, 0.0);
            }
            other => panic!("expected InvalidCostConstants, got {other:?}"),
        }
    }

    fn flat_savings(total: f64) -> SavingsReport {
        SavingsReport {
            admin_labor_savings: total,
            error_cost_savings: 0.0,
            additional_revenue: 0.0,
            processing_efficiency_savings: 0.0,
            total_annual_savings: total,
        }
    }

    #[test]
    fn roi_rejects_zero_and_negative_investment() {
        let savings = flat_savings(1e12);
        for investment in [0.0, -5e11] {
            let err = roi_analysis(&savings, investment, 0.0, 5, 0.05).unwrap_err();
            assert!(matches!(err, Error::DivisionByZero { .. }));
        }
        assert!(roi_analysis(&savings, 1e12, 0.0, 5, 0.05).is_ok());
    }

    #[test]
    fn payback_is_the_smallest_covering_year() {
        // ¥1T net per year against a ¥2.5T investment: year 3 covers it.
        let roi = roi_analysis(&flat_savings(1e12), 2.5e12, 0.0, 5, 0.0).unwrap();
        assert_eq!(roi.payback_period, PaybackPeriod::Reached(3));
        assert_eq!(roi.payback_period.years(), Some(3));
    }

    #[test]
    fn payback_beyond_horizon_is_not_reached() {
        let roi = roi_analysis(&flat_savings(1e11), 3e12, 0.0, 5, 0.0).unwrap();
        assert_eq!(roi.payback_period, PaybackPeriod::NotReached);
        assert_eq!(roi.payback_period.years(), None);
        assert!(roi.total_roi_percentage < 0.0);
    }

    #[test]
    fn roi_projection_compounds_savings_growth() {
        let roi = roi_analysis(&flat_savings(1e12), 1e12, 2e11, 3, 0.05).unwrap();
        assert_eq!(roi.yearly.len(), 3);
        assert!((roi.yearly[0].savings - 1e12).abs() < 1.0);
        assert!((roi.yearly[1].savings - 1.05e12).abs() < 1e6);
        assert!((roi.yearly[2].savings - 1.1025e12).abs() < 1e6);
        // Cumulative net matches the sum of yearly nets.
        let sum: f64 = roi.yearly.iter().map(|y| y.net_benefit).sum();
        assert!((roi.yearly.last().unwrap().cumulative_net - sum).abs() < 1.0);
        assert!((roi.total_investment - (1e12 + 3.0 * 2e11)).abs() < 1.0);
        assert!((roi.net_benefit - (sum - 1e12)).abs() < 1.0);
    }

    #[test]
    fn investment_costs_prefer_dataset_over_defaults() {
        let dataset = test_dataset();
        let params = AnalysisParams::default();
        let (upfront, maintenance) = investment_costs(&dataset, &params);
        assert_eq!(upfront, 3e12);
        assert_eq!(maintenance, 0.6e12);

        let (upfront, maintenance) = investment_costs(&Dataset::new(), &params);
        assert_eq!(upfront, params.default_upfront_cost);
        assert_eq!(maintenance, params.default_annual_maintenance);
    }
}
