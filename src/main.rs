use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};

use evalboard::config::{self, DisplayConfig};
use evalboard::loader;
use evalboard::records::Sample;
use evalboard::table::{self, TableFilter};

/// Browse lm-evaluation-harness output: aggregate per-model metrics into
/// a comparison table, or inspect the logged samples of one task.
#[derive(Parser, Debug)]
#[command(name = "evalboard", version, about)]
struct Cli {
    /// Root directory with one subdirectory per evaluated model
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Show samples for this model (needs --benchmark and --language)
    #[arg(long)]
    model: Option<String>,

    /// Benchmark of the samples to show
    #[arg(long)]
    benchmark: Option<String>,

    /// Language of the samples to show
    #[arg(long)]
    language: Option<String>,

    /// Serve the dashboard API over HTTP instead of printing a report
    #[cfg(feature = "serve")]
    #[arg(long)]
    serve: bool,

    /// Extra logging (per-file skips, cache decisions)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_directive = if cli.verbose {
        "evalboard=debug"
    } else {
        "evalboard=info"
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.parse().unwrap()),
        )
        .init();

    let cwd = std::env::current_dir().unwrap_or_default();
    let cfg = config::load_config(&cwd);

    if let Err(e) = dispatch(&cli, &cfg).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn dispatch(cli: &Cli, cfg: &config::VizConfig) -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "serve")]
    if cli.serve {
        return evalboard::serve::run(cli.root.clone(), &cfg.serve).await;
    }

    match sample_selection(cli)? {
        Some((model, benchmark, language)) => {
            run_samples(&cli.root, model, benchmark, language, &cfg.display)
        }
        None => run_table(&cli.root, &cfg.display),
    }
}

/// The three sample switches come as a package; any other mix is a usage
/// error.
fn sample_selection(cli: &Cli) -> Result<Option<(&str, &str, &str)>, Box<dyn std::error::Error>> {
    match (&cli.model, &cli.benchmark, &cli.language) {
        (Some(model), Some(benchmark), Some(language)) => {
            Ok(Some((model, benchmark, language)))
        }
        (None, None, None) => Ok(None),
        _ => Err("sample browsing needs --model, --benchmark and --language together".into()),
    }
}

fn run_table(root: &Path, display: &DisplayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let results = loader::load_results(root)?;
    if results.is_empty() {
        println!("No results found under {}.", root.display());
        return Ok(());
    }

    tracing::debug!(
        "{} records across {} models, {} benchmarks, {} languages",
        results.len(),
        results.models().len(),
        results.benchmarks().len(),
        results.languages().len()
    );

    let pivot = table::pivot(&results, &TableFilter::default());
    print!("{}", table::render(&pivot, display.precision));
    println!();
    println!("Higher values = better performance.");
    Ok(())
}

fn run_samples(
    root: &Path,
    model: &str,
    benchmark: &str,
    language: &str,
    display: &DisplayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let samples = loader::load_samples_for(root, model, benchmark, language)?;

    let total = samples.len();
    for (idx, sample) in samples.iter().enumerate() {
        println!("Sample {} of {total}", idx + 1);
        println!("{}", "-".repeat(40));
        print_sample(sample, display.max_field_len);
        println!();
    }
    Ok(())
}

fn print_sample(sample: &Sample, max_len: usize) {
    if let Some(doc_id) = sample.doc_id {
        println!("doc_id: {doc_id}");
    }
    let named: [(&str, &Option<Value>); 4] = [
        ("target", &sample.target),
        ("arguments", &sample.arguments),
        ("resps", &sample.resps),
        ("filtered_resps", &sample.filtered_resps),
    ];
    for (name, value) in named {
        if let Some(value) = value {
            print_field(name, value, max_len);
        }
    }
    for (name, value) in &sample.extra {
        print_field(name, value, max_len);
    }
}

fn print_field(name: &str, value: &Value, max_len: usize) {
    let rendered = match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    };
    println!("{name}: {}", clip(&rendered, max_len));
}

/// Character-based cut so multi-byte text never splits mid-glyph.
fn clip(text: &str, max_len: usize) -> String {
    if max_len == 0 || text.chars().count() <= max_len {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max_len).collect();
        format!("{clipped}...")
    }
}
