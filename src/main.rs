// src/main.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::{Context, Result};
use breathqa::detection::AcceptedAnalysis;
use breathqa::io::{export_developer, export_standard, SensirionSource, SourcePipeline};
use breathqa::report::{default_ranges, TidalVolumeSummary};
use breathqa::{AnalysisConfig, AnalysisOutcome, BreathPipeline};
use clap::{Parser, ValueEnum};
use log::{error, info};
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    /// Fixed thresholds
    Absolute,
    /// Percentages of the recording's maximum flow and pressure
    Relative,
}
/// Detect breaths in a Sensirion waveform export and write QA breath tables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sensirion CSV export
    input: PathBuf,
    /// Output directory (defaults to `output` next to the input file)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// JSON file overriding any subset of the preset's settings
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "relative")]
    preset: Preset,
    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
    /// Use the device breath table as breath boundaries instead of detecting them
    #[arg(long)]
    reference: bool,
    /// Also render an annotated flow plot
    #[cfg(feature = "plot")]
    #[arg(long)]
    plot: bool,
}
fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;
    if args.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(ExitCode::SUCCESS);
    }
    let pipeline = BreathPipeline::new(config).context("invalid analysis configuration")?;
    let source = SensirionSource::new([args.input.clone()]);
    let mut runner = SourcePipeline::new(source, pipeline).with_reference(args.reference);
    let analysis = runner
        .pump_once()
        .with_context(|| format!("failed to analyse {}", args.input.display()))?
        .context("no recording was read")?;
    let accepted = match &analysis.outcome {
        AnalysisOutcome::Accepted(accepted) => accepted,
        AnalysisOutcome::Rejected(rejection) => {
            error!("{}: {rejection}", analysis.name);
            println!("{}: {rejection}", analysis.name);
            return Ok(ExitCode::from(1));
        }
    };
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.input));
    write_outputs(&output_dir, &analysis.name, accepted)?;
    #[cfg(feature = "plot")]
    {
        if args.plot {
            let png = breathqa::io::render_breath_plot_png(
                &analysis.table,
                &accepted.metrics,
                &breathqa::io::PlotStyle::default(),
            )
            .context("failed to render breath plot")?;
            let path = output_dir.join(format!("breath_plot_{}.png", analysis.name));
            fs::write(&path, png).with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
    }
    println!(
        "{}: {} breaths accepted ({} detected, {} removed by QA)",
        analysis.name,
        accepted.metrics.len(),
        accepted.detected,
        accepted.qa.removed()
    );
    Ok(ExitCode::SUCCESS)
}
fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let preset = match args.preset {
        Preset::Absolute => AnalysisConfig::fixed_absolute(),
        Preset::Relative => AnalysisConfig::max_relative(),
    };
    let Some(path) = &args.config else {
        return Ok(preset);
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    preset
        .overlay_json(&json)
        .with_context(|| format!("invalid config {}", path.display()))
}
fn default_output_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("output")
}
fn write_outputs(dir: &Path, stem: &str, accepted: &AcceptedAnalysis) -> Result<()> {
    let standard = export_standard(dir, stem, &accepted.metrics)
        .with_context(|| format!("failed to export breath table to {}", dir.display()))?;
    let developer = export_developer(dir, stem, &accepted.metrics)
        .with_context(|| format!("failed to export developer table to {}", dir.display()))?;
    let summary = TidalVolumeSummary::from_metrics(&accepted.metrics, &default_ranges());
    let summary_path = dir.join(format!("vt_summary_{stem}.json"));
    fs::write(&summary_path, summary.to_json_pretty()?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    info!(
        "outputs: {}, {}, {}",
        standard.display(),
        developer.display(),
        summary_path.display()
    );
    Ok(())
}
