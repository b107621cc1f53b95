use std::path::PathBuf;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use events_analysis::quality::mean_tx_hash_usage;
use events_analysis::report::{write_reports, AnalysisOutcome};
use events_analysis::series::chart_specs;
use events_data::{load_events, ReportWriter};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

mod charts;

#[derive(Debug, Clone)]
struct AppContext {
    input: PathBuf,
    output_dir: PathBuf,
    render_charts: bool,
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(eyre!(
                "unknown output format '{}'; use 'table' or 'json'",
                value
            )),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "contract-events")]
#[command(about = "Orphan, timing, sender and data-quality reports for contract event exports")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(long, short = 'v', action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Contract event export to analyze.
    #[arg(long, default_value = "contract_events.csv")]
    input: PathBuf,

    /// Directory for CSV reports and charts (created if absent).
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Skip PNG chart rendering.
    #[arg(long)]
    no_charts: bool,

    /// Console summary format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let ctx = AppContext {
        input: cli.input,
        output_dir: cli.output_dir,
        render_charts: !cli.no_charts,
        output: OutputFormat::parse(&cli.output)?,
    };

    run(&ctx)
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(ctx: &AppContext) -> Result<()> {
    let writer = ReportWriter::create(&ctx.output_dir)?;
    let tables = load_events(&ctx.input)
        .wrap_err_with(|| format!("failed to load {}", ctx.input.display()))?;

    let outcome = write_reports(&tables, &writer).wrap_err("failed to write reports")?;

    let charts = if ctx.render_charts {
        charts::render_charts(&chart_specs(&tables), writer.output_dir())
            .wrap_err("failed to render charts")?
    } else {
        Vec::new()
    };

    match ctx.output {
        OutputFormat::Table => print_tables(&outcome, &charts),
        OutputFormat::Json => print_json(&outcome, &charts)?,
    }

    info!(
        input = %ctx.input.display(),
        output_dir = %ctx.output_dir.display(),
        reports = outcome.written.len(),
        charts = charts.len(),
        "pipeline finished"
    );

    Ok(())
}

fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(seconds) => format!("{seconds:.2}"),
        None => "-".to_string(),
    }
}

fn print_tables(outcome: &AnalysisOutcome, charts: &[PathBuf]) {
    println!(
        "Loaded {} events ({} confirmed)",
        outcome.total_events, outcome.confirmed_events
    );

    println!("\nTask 1: Orphan Event Detection");
    println!("Orphan Events: {}", outcome.orphans.len());

    println!("\nTask 2: Time Delta Per Contract");
    println!("Total Events: {}", outcome.temporal.deltas.len());
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Contract",
        "Events",
        "Avg Seconds Between",
        "Median Seconds Between",
    ]);
    for summary in &outcome.temporal.summaries {
        table.add_row(vec![
            summary.contract_address.clone(),
            summary.event_count.to_string(),
            format_stat(summary.avg_seconds_between_events),
            format_stat(summary.median_seconds_between_events),
        ]);
    }
    println!("{}", table);

    println!("\nTask 3: Sender Mapping");
    println!(
        "Highest # of Events In a Block: {}",
        outcome.max_events_per_block
    );
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Contract", "Sender", "Events", "Rank"]);
    for row in &outcome.sender_activity {
        table.add_row(vec![
            row.contract_address.clone(),
            row.sender.clone(),
            row.event_count.to_string(),
            row.rank_in_sender_activity.to_string(),
        ]);
    }
    println!("{}", table);

    println!("\nBonus 1: Data Quality and Inconsistencies");
    println!(
        "Average Usage Count of tx_hash: {}",
        format_stat(mean_tx_hash_usage(&outcome.tx_hash_usage))
    );
    println!(
        "Events With Unconfirmed Previous Events: {}",
        outcome.unconfirmed_predecessors.len()
    );

    println!("\nBonus 2: Possible Bot-like Behavior");
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Seconds Since Last Event", "Count"]);
    for bucket in &outcome.interval_histogram {
        table.add_row(vec![format!("{}", bucket.seconds), bucket.count.to_string()]);
    }
    println!("{}", table);

    println!("\nReports:");
    for path in outcome.written.iter().chain(charts) {
        println!("  {}", path.display());
    }
}

fn print_json(outcome: &AnalysisOutcome, charts: &[PathBuf]) -> Result<()> {
    use serde::Serialize;

    #[derive(Serialize)]
    struct JsonOutput {
        #[serde(flatten)]
        summary: events_analysis::report::RunSummary,
        charts: Vec<String>,
    }

    let output = JsonOutput {
        summary: outcome.summary(),
        charts: charts.iter().map(|p| p.display().to_string()).collect(),
    };

    let json_str = serde_json::to_string_pretty(&output).wrap_err("failed to serialize JSON")?;
    println!("{}", json_str);

    Ok(())
}
