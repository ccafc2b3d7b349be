use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use lambdac::config::AnalyzerConfig;
use lambdac::diagnostics::{render_error, CompileError};
use lambdac::typeck::symbols::{SymbolTable, TypeOracle};
use lambdac::UnitAnalysis;

#[derive(Parser)]
#[command(name = "lambdac", version, about = "Lambda and method-reference analyzer")]
struct Cli {
    /// Analyzer configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "lambdac::typeck=trace". Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze pre-parsed compilation units (JSON)
    Analyze {
        /// Unit files
        #[arg(required = true)]
        units: Vec<PathBuf>,
        /// Symbol table (TOML)
        #[arg(short, long)]
        symbols: PathBuf,
        /// Print the analysis as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Load a symbol table and report what it declares
    CheckSymbols {
        /// Symbol table (TOML)
        file: PathBuf,
    },
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(path: Option<&Path>) -> AnalyzerConfig {
    match path {
        Some(path) => AnalyzerConfig::load(path).unwrap_or_else(|err| fail(None, &path.to_string_lossy(), &err)),
        None => AnalyzerConfig::default(),
    }
}

fn fail(source: Option<&str>, filename: &str, err: &CompileError) -> ! {
    render_error(source, filename, err);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Analyze { units, symbols, json } => {
            let table = SymbolTable::load(&symbols)
                .unwrap_or_else(|err| fail(None, &symbols.to_string_lossy(), &err));
            let mut loaded = Vec::with_capacity(units.len());
            for path in &units {
                match lambdac::load_unit(path) {
                    Ok(unit) => loaded.push(unit),
                    Err(err) => fail(None, &path.to_string_lossy(), &err),
                }
            }

            let results = lambdac::analyze_units(&loaded, &table, &config);
            let mut failed = false;
            for (unit, result) in loaded.iter().zip(results) {
                match result {
                    Ok(analysis) if json => match serde_json::to_string_pretty(&analysis) {
                        Ok(text) => println!("{text}"),
                        Err(e) => {
                            eprintln!("error: cannot serialize analysis of {}: {e}", unit.name);
                            failed = true;
                        }
                    },
                    Ok(analysis) => print_summary(&analysis),
                    Err(err) => {
                        render_error(unit.source.as_deref(), &unit.name, &err);
                        failed = true;
                    }
                }
            }
            if failed {
                std::process::exit(1);
            }
        }
        Commands::CheckSymbols { file } => {
            let table = SymbolTable::load(&file).unwrap_or_else(|err| fail(None, &file.to_string_lossy(), &err));
            let names = table.class_names();
            println!("{}: {} classes", file.display(), names.len());
            for name in names {
                println!("  {name}");
            }
        }
    }
}

fn print_summary(analysis: &UnitAnalysis) {
    println!("{}: {} lambdas, {} method references", analysis.unit, analysis.lambdas.len(), analysis.method_refs.len());
    for lambda in &analysis.lambdas {
        let params: Vec<String> = lambda.param_types.iter().map(ToString::to_string).collect();
        let captures: Vec<&str> = lambda.captures.iter().map(|b| b.name.as_str()).collect();
        println!(
            "  {}..{}  {} ({}) -> {}  {:?}  captures [{}]  {:?}",
            lambda.span.start,
            lambda.span.end,
            lambda.target.display_target(),
            params.join(", "),
            lambda.return_type,
            lambda.kind,
            captures.join(", "),
            lambda.serializability,
        );
    }
    for mref in &analysis.method_refs {
        println!(
            "  {}..{}  {} = {}::{} ({:?})",
            mref.span.start,
            mref.span.end,
            mref.target.display_target(),
            mref.owner,
            mref.method,
            mref.kind,
        );
    }
    for cell in &analysis.shared_cells {
        println!("  shared cell: {} in {}", cell.name, cell.method);
    }
}
