use anyhow::{bail, Context};
use clap::Parser;
use logsift::record::{load_batch, parse_batch_str};
use logsift::{analyze_batch, AnalyticsReport, Anomaly, Baseline, Batch, Config, LogContext};
use std::io::{self, Read};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "logsift", version, about = "Log batch analytics and anomaly detection")]
struct Cli {
    /// Input files (`-` for stdin), JSON array or JSON lines. May be repeated.
    #[arg(required = false)]
    input: Vec<String>,

    /// Historical batch used to build the statistical baseline
    #[arg(long = "history")]
    history: Option<String>,

    /// JSON config file with analyzer/detection thresholds
    #[arg(long = "config")]
    config: Option<String>,

    /// Temporal detector window width in minutes
    #[arg(long = "window-minutes")]
    window_minutes: Option<i64>,

    /// Window width used to split the history into baseline samples
    #[arg(long = "baseline-window-minutes")]
    baseline_window_minutes: Option<i64>,

    /// Print only a specific section: summary | errors | patterns | trends | anomalies
    #[arg(long = "only")]
    only: Option<String>,

    /// Output format: json | table (table lists anomalies)
    #[arg(long = "format", default_value = "json")]
    format: String,

    /// Keep only the N highest-confidence anomalies
    #[arg(long = "top")]
    top: Option<usize>,

    /// Diagnostic log format on stderr: text | json
    #[arg(long = "log-format", default_value = "text")]
    log_format: String,

    #[arg(long = "verbose", short = 'v', default_value_t = false)]
    verbose: bool,
}

fn init_logging(log_format: &str, verbose: bool) {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        std::env::var("LOG_LEVEL").map(|l| l.to_lowercase()).unwrap_or_else(|_| "warn".to_string())
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    if log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_batches(paths: &[String]) -> anyhow::Result<Batch> {
    let mut out = Batch::default();
    for p in paths {
        let batch = if p == "-" {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("reading stdin")?;
            parse_batch_str(&text).context("parsing stdin")?
        } else {
            load_batch(Path::new(p)).with_context(|| format!("loading {p}"))?
        };
        out.records.extend(batch.records);
        out.skipped += batch.skipped;
    }
    Ok(out)
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = match cli.config.as_deref() {
        Some(path) => Config::from_path(Path::new(path)).with_context(|| format!("loading config {path}"))?,
        None => Config::default(),
    };
    if let Some(m) = cli.window_minutes {
        cfg.detection.window_minutes = m;
    }
    if let Some(m) = cli.baseline_window_minutes {
        cfg.baseline_window_minutes = m;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_format, cli.verbose);
    let config = load_config(&cli)?;
    let ctx = LogContext::root("cli");

    let input_files = if cli.input.is_empty() { vec!["-".to_string()] } else { cli.input.clone() };
    let batch = read_batches(&input_files)?;
    if batch.skipped > 0 {
        warn!(parent: ctx.span(), skipped = batch.skipped, "malformed records skipped");
    }

    let baseline = match cli.history.as_deref() {
        Some(path) => {
            let history = load_batch(Path::new(path)).with_context(|| format!("loading history {path}"))?;
            let window = config.baseline_window().context("baseline window out of range")?;
            // One baseline sample per window of the history. Detection then
            // averages the input over windows of the same width.
            let b = Baseline::from_history(&history.records, window, &ctx);
            info!(parent: ctx.span(), samples = b.samples, "baseline ready");
            Some(b)
        }
        None => None,
    };

    let mut report = analyze_batch(&batch, baseline.as_ref(), &config, &ctx);
    if let Some(n) = cli.top {
        report.anomalies.truncate(n);
    }

    match cli.format.as_str() {
        "json" => print_json(&report, cli.only.as_deref())?,
        "table" => print_anomaly_table(&report.anomalies),
        other => bail!("unknown format '{other}' (expected json or table)"),
    }
    Ok(())
}

fn print_json(report: &AnalyticsReport, only: Option<&str>) -> anyhow::Result<()> {
    let out = match only {
        None => serde_json::to_string_pretty(report)?,
        Some("summary") => serde_json::to_string_pretty(&report.summary)?,
        Some("errors") => serde_json::to_string_pretty(&report.error_analysis)?,
        Some("patterns") => serde_json::to_string_pretty(&report.pattern_analysis)?,
        Some("trends") => serde_json::to_string_pretty(&report.trend_analysis)?,
        Some("anomalies") => serde_json::to_string_pretty(&report.anomalies)?,
        Some(other) => bail!("unknown section '{other}'"),
    };
    println!("{out}");
    Ok(())
}

fn print_anomaly_table(anomalies: &[Anomaly]) {
    println!("{:<26} {:<10} {:<8} {:<8} {}", "Type", "Confidence", "Severity", "Merged", "Description");
    for a in anomalies {
        println!(
            "{:<26} {:<10.3} {:<8} {:<8} {}",
            a.kind.as_str(),
            a.confidence,
            a.severity.as_str(),
            a.merged_count.unwrap_or(1),
            a.description
        );
    }
}
