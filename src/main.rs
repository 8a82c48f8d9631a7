use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sketchport::core::Outcome;
use sketchport::formatters::JsonReportFormatter;
use sketchport::{ConversionReport, ConvertOptions, ProjectConverter};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "sketchport",
    version,
    about = "Convert an Arduino IDE sketch folder into a PlatformIO project"
)]
struct Cli {
    /// Sketch folder to convert
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    project_dir: PathBuf,

    /// Output folder [default: <project>/PlatformIO/<name>]
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// File name of the shared glue header
    #[arg(long, value_name = "FILE", default_value = "arduinoGlue.h")]
    glue_name: String,

    /// Environment name written to platformio.ini
    #[arg(long, value_name = "NAME", default_value = "myBoard")]
    board_env: String,

    /// Write the conversion report as JSON
    #[arg(short, long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Do not copy the sketch's data folder
    #[arg(long)]
    no_data: bool,

    /// Do not create platformio.ini
    #[arg(long)]
    no_ini: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    run(cli)
}

fn init_logging(debug: bool) {
    let default = if debug { "sketchport=debug" } else { "sketchport=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        project_dir,
        output,
        glue_name,
        board_env,
        report: report_path,
        no_data,
        no_ini,
        debug: _,
    } = cli;

    let start_time = Instant::now();

    let mut options = ConvertOptions::new()
        .with_glue_name(glue_name)
        .with_board_env(board_env)
        .with_data_copy(!no_data)
        .with_ini(!no_ini);
    if let Some(output) = output {
        options = options.with_output_dir(output);
    }

    println!("SKETCHPORT - Arduino IDE to PlatformIO");
    println!("Input: {}", project_dir.display());

    let report = ProjectConverter::new(options)
        .convert(&project_dir)
        .with_context(|| format!("cannot convert {}", project_dir.display()))?;

    println!("Output: {}", report.output_root.display());
    print_summary(&report);

    if let Some(report_path) = report_path {
        JsonReportFormatter::new().format_to_file(&report, &report_path)?;
        println!("JSON report: {}", report_path.display());
    }

    println!(
        "Total execution time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(ExitCode::from(report.exit_status() as u8))
}

fn print_summary(report: &ConversionReport) {
    for unit in &report.units {
        println!(
            "  {:<28} {:>3} declarations  {}",
            unit.file_name,
            unit.declarations,
            unit.outcome()
        );
        for warning in &unit.warnings {
            println!("      {warning}");
        }
        if let Some(fatal) = &unit.fatal {
            println!("      {}", fatal.message);
        }
    }
    for failure in &report.failures {
        println!("  {}: {}", failure.path.display(), failure.message);
    }

    let hoisted = report.hoisted().count();
    let fatal_units = report
        .units
        .iter()
        .filter(|unit| matches!(unit.outcome(), Outcome::Fatal(_)))
        .count();
    println!(
        "Hoisted {} of {} declarations; {} warnings, {} fatal",
        hoisted,
        report.symbols.len(),
        report.warning_count(),
        fatal_units + report.failures.len()
    );
    println!("Generated {} files", report.generated_files.len());
}
