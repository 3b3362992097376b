use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use std::fs;
use tracing_subscriber::EnvFilter;

// Import from deparse-core
use deparse_core::{render_record, save_record, FunctionTable, OutputFormat, ParseStats, ParserConfig};

// Import CLI utilities
use deparse::InputSource;

#[derive(ClapParser)]
#[command(name = "deparse")]
#[command(about = "Extract structured records from text with declarative regex rules")]
struct Args {
    /// Path to the rule file (YAML format)
    #[arg(short, long)]
    rules: Option<String>,

    /// Input file to parse line by line; `-` or omitted reads stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Evaluate a single line instead of an input stream
    #[arg(short, long)]
    line: Option<String>,

    /// Output format: json, yaml, or flat
    #[arg(short = 'f', long = "format", default_value = "json")]
    output_format: String,

    /// Output file path (if not specified, the record is printed to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Keep every match of single-valued rules on a line
    #[arg(long)]
    promote_repeats: bool,

    /// Compile every pattern and exit
    #[arg(long)]
    check: bool,

    /// Print per-rule match counts and timing
    #[arg(long)]
    profile: bool,

    /// Write parse statistics as JSON to this path
    #[arg(long)]
    stats_file: Option<String>,

    /// Show the built-in transform names and exit
    #[arg(long)]
    list_functions: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list_functions {
        show_functions();
        return Ok(());
    }

    let Some(rules_path) = args.rules.as_deref() else {
        eprintln!("⚠️  No rule file given. Use --rules <path>.");
        std::process::exit(2);
    };

    let format: OutputFormat = args.output_format.parse()?;

    let mut config = ParserConfig::load_from_file(rules_path)?;
    eprintln!("📋 Loaded {} rules from: {}", config.rules.len(), rules_path);

    // Apply CLI overrides to config
    if args.promote_repeats {
        config.options.promote_repeats = true;
    }
    tracing::debug!(rules = rules_path, options = ?config.options, "building parser");

    let parser = config.build_with_builtins()?;

    if args.check {
        if let Err(e) = parser.precompile() {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
        let missing = parser.registry().unresolved();
        if !missing.is_empty() {
            for (rule, method) in &missing {
                eprintln!("❌ rule '{rule}' needs method '{method}', which is not defined");
            }
            std::process::exit(1);
        }
        eprintln!(
            "✅ All {} patterns compile and every method resolves",
            parser.registry().len()
        );
        return Ok(());
    }

    let outcome = match &args.line {
        Some(line) => parser.line(line).map(|record| (record, None)),
        None => {
            let source = InputSource::from_arg(args.input.as_deref());
            eprintln!("📄 Processing: {}", source.stem());
            let reader = source.open()?;
            parser
                .parse_reader_with_stats(reader)
                .map(|(record, stats)| (record, Some(stats)))
        }
    };

    let (record, stats) = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("❌ Processing failed: {e}");
            std::process::exit(1);
        }
    };

    if let Some(stats) = &stats {
        if args.profile {
            eprintln!("\n📊 Parse Summary:");
            eprint!("{stats}");
        }
        if let Some(path) = &args.stats_file {
            save_stats(stats, args.input.as_deref(), rules_path, path)?;
        }
    }

    match &args.output {
        Some(path) => {
            save_record(&record, path, format).with_context(|| format!("failed to write {path}"))?;
            eprintln!("💾 {format} record saved to: {path}");
        }
        None => println!("{}", render_record(&record, format)?),
    }

    Ok(())
}

fn show_functions() {
    let table = FunctionTable::builtins();
    println!("\n🔧 Built-in transforms ({}):", table.len());
    for name in table.names() {
        println!("  {name}");
    }

    println!("\n📝 Rules without `function:` use the method named f_<rule name>.");
    println!("\n📝 Usage Examples:");
    println!("  deparse -r rules.yaml -i app.log");
    println!("  deparse -r rules.yaml -l 'aws-s3-bucket $10 2015-01-14'");
    println!("  cat app.log | deparse -r rules.yaml -f yaml --profile");
}

fn save_stats(stats: &ParseStats, input: Option<&str>, rules: &str, path: &str) -> Result<()> {
    let summary = serde_json::json!({
        "input": input.unwrap_or("-"),
        "rules": rules,
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stats": stats,
    });
    fs::write(path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("failed to write {path}"))?;
    eprintln!("  💾 {path}");
    Ok(())
}
