// Entry point and high-level CLI flow.
//
// The pipeline is strictly linear: dataset provider → metrics
// calculator → report assembler → visualizer. Provider and calculator
// errors abort the run with a non-zero exit; chart errors are isolated
// per chart and only logged.
mod analysis;
mod charts;
mod config;
mod datasets;
mod error;
mod report;
mod types;
mod util;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AnalysisConfig;
use crate::util::format_int;

/// Economic impact analysis of AI adoption in Japanese healthcare
/// administration.
#[derive(Parser)]
#[command(name = "health-roi")]
#[command(about = "Baseline vs AI-improved healthcare productivity metrics, savings and ROI")]
#[command(version)]
struct Cli {
    /// Directory containing the category CSV files; categories that are
    /// missing fall back to seeded sample data
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory for the report JSON and chart artifacts
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,

    /// Optional JSON config overriding ai_improvements / japan_constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for sample-data generation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// ROI analysis horizon in years
    #[arg(long)]
    years: Option<u32>,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// Write the (possibly generated) datasets back to the data directory
    #[arg(long)]
    write_sample_data: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = AnalysisConfig::load(cli.config.as_deref());
    let years = cli.years.unwrap_or(cfg.analysis_params.roi_years);

    let dataset = datasets::load_or_generate(&cli.data_dir, cli.seed);
    info!(categories = dataset.len(), "dataset ready");
    if cli.write_sample_data {
        datasets::save_to_dir(&dataset, &cli.data_dir)
            .with_context(|| format!("writing datasets to {}", cli.data_dir.display()))?;
    }

    let baseline = analysis::baseline_metrics(&dataset, &cfg.japan_constants)
        .context("computing baseline metrics")?;
    let ai_metrics = analysis::ai_impact_metrics(&baseline, &cfg.ai_improvements);
    let savings = analysis::cost_savings(&baseline, &ai_metrics, &cfg.japan_constants)
        .context("computing cost savings")?;
    let (upfront, maintenance) = analysis::investment_costs(&dataset, &cfg.analysis_params);
    let roi = analysis::roi_analysis(
        &savings,
        upfront,
        maintenance,
        years,
        cfg.analysis_params.ai_savings_growth,
    )
    .context("computing ROI analysis")?;

    let report = report::assemble(baseline, ai_metrics, savings, roi, &cfg.ai_improvements);

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;
    let json_path = cli.out_dir.join("analysis_report.json");
    report::write_json(&json_path, &report)
        .with_context(|| format!("writing {}", json_path.display()))?;
    println!(
        "Report written to {} ({} bytes)\n",
        json_path.display(),
        format_int(std::fs::metadata(&json_path).map(|m| m.len()).unwrap_or(0))
    );

    report::preview(&report);

    if !cli.no_charts {
        let written = charts::render_all(&report, &cli.out_dir);
        println!("\nCharts written: {}", written.len());
        for path in &written {
            println!("  {}", path.display());
        }
    }

    Ok(())
}
