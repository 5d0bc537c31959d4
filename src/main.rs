#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use anoncreds_bench::bench::{self, RunArgs};

#[derive(Parser, Debug)]
#[command(name = "anoncreds-bench")]
#[command(about = "Benchmark anonymous-credential proving across wallet storage backends", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set ANONCREDS_BENCH_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue, prove and verify credentials against a wallet backend
    Run {
        /// Wallet type: default or enterprise (unknown values use default)
        #[arg(short = 'w', long)]
        wallet_type: Option<String>,
        /// Number of measured iterations
        #[arg(short = 'n', long)]
        iterations: Option<u32>,
        /// Untimed iterations before measuring
        #[arg(long)]
        warmup: Option<u32>,
        /// Also time credential issuance
        #[arg(long)]
        time_issuance: bool,
        /// Skip the anoncreds, crypto and ledger demos
        #[arg(long)]
        no_demo: bool,
        /// TOML config file ([harness] and [backends.<kind>] tables)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Append the report to this JSONL file
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write the report as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Export stored JSONL reports to CSV
    ExportCsv {
        /// JSONL file written by `run --json`
        #[arg(long)]
        jsonl: PathBuf,
        /// Output CSV path (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Only export reports for this backend kind
        #[arg(long)]
        backend: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("ANONCREDS_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "anoncreds_bench=debug".to_string() } else { "anoncreds_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { wallet_type, iterations, warmup, time_issuance, no_demo, config, json, csv } => {
            bench::run(RunArgs { wallet_type, iterations, warmup, time_issuance, no_demo, config, json, csv })
                .map(|report| if report.is_clean() { 0 } else { 2 })
        }
        Commands::ExportCsv { jsonl, output, backend } => bench::export_csv(jsonl, output, backend).map(|_| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{:#}", color_eyre::eyre::Report::new(e));
            std::process::exit(1);
        }
    }
}
