//! Load test CLI for Fulcio, Rekor and the timestamp authority.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tas_perf::{
    collect_entries, credential, parse_toggle, EntrySink, ErrorReporter, IdentifierPool,
    LoadRunner, OidcSettings, ResultsReport, SignContext, SignEndpoints, TasClient, TestConfig,
    TestResults, VerifyContext,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tas-perf")]
#[command(about = "Load generator for Fulcio, Rekor and a timestamp authority", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign artifacts and record them in the transparency log
    Sign(SignArgs),

    /// Read back recorded entries and the TSA certificate chain
    Verify(VerifyArgs),
}

/// Run shape shared by both workflows.
#[derive(Args)]
struct RunArgs {
    /// Path to scenario YAML file
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Concurrent virtual users
    #[arg(long)]
    vus: Option<u32>,

    /// Test duration in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Stop after this many iterations
    #[arg(short, long)]
    iterations: Option<u64>,

    /// Warmup seconds excluded from results
    #[arg(long)]
    warmup: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Output format: table (default), json, csv
    #[arg(short, long, default_value = "table")]
    output: String,
}

#[derive(Args)]
struct SignArgs {
    #[command(flatten)]
    run: RunArgs,

    #[arg(long, env = "OIDC_ISSUER_URL")]
    oidc_issuer_url: Option<String>,

    #[arg(long, env = "OIDC_USER")]
    oidc_user: Option<String>,

    #[arg(long, env = "OIDC_PASSWORD", hide_env_values = true)]
    oidc_password: Option<String>,

    #[arg(long, env = "OIDC_CLIENT_ID")]
    oidc_client_id: Option<String>,

    #[arg(long, env = "FULCIO_URL")]
    fulcio_url: String,

    #[arg(long, env = "REKOR_URL")]
    rekor_url: String,

    /// Base URL of the crypto-material helper
    #[arg(long, env = "HELPER_URL", default_value = tas_perf::config::DEFAULT_HELPER_URL)]
    helper_url: String,

    /// Collect the identifier of every hashedrekord entry created (1/true/yes/on)
    #[arg(long, env = "GENERATE_DATA_MODE", default_value = "false")]
    generate_data: String,

    /// Also append collected identifiers to this file
    #[arg(long)]
    uuid_output: Option<PathBuf>,
}

#[derive(Args)]
struct VerifyArgs {
    #[command(flatten)]
    run: RunArgs,

    #[arg(long, env = "REKOR_URL")]
    rekor_url: String,

    #[arg(long, env = "TSA_URL")]
    tsa_url: String,

    /// Comma-separated entry identifiers
    #[arg(long, env = "REKOR_UUIDS")]
    rekor_uuids: Option<String>,

    /// File with one identifier per line; takes precedence over --rekor-uuids
    #[arg(long)]
    uuids_file: Option<PathBuf>,

    /// Seed for reproducible identifier selection
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    let (results, output) = match cli.command {
        Commands::Sign(args) => {
            let output = args.run.output.clone();
            (run_sign(args).await?, output)
        }
        Commands::Verify(args) => {
            let output = args.run.output.clone();
            (run_verify(args).await?, output)
        }
    };

    match output.as_str() {
        "json" => {
            println!("{}", ResultsReport::format_json(&results)?);
        }
        "csv" => {
            println!("{}", ResultsReport::csv_header());
            println!("{}", ResultsReport::format_csv(&results));
        }
        _ => {
            println!("{}", ResultsReport::format_table(&results));
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> anyhow::Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout carries results and collected identifiers.
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Merge the scenario file (if any) with command-line overrides.
fn resolve_config(args: &RunArgs, default_name: &str) -> anyhow::Result<TestConfig> {
    let mut config = match &args.scenario {
        Some(path) => {
            info!(scenario = %path.display(), "Loading scenario");
            TestConfig::from_file(path)
                .with_context(|| format!("failed to load scenario {}", path.display()))?
        }
        None => TestConfig {
            name: default_name.to_string(),
            ..TestConfig::default()
        },
    };

    // Apply overrides
    if let Some(vus) = args.vus {
        config.vus = vus;
    }
    if let Some(d) = args.duration {
        config.duration_secs = Some(d);
        // A bare --duration replaces the single-iteration default.
        if args.iterations.is_none() && args.scenario.is_none() {
            config.iterations = None;
        }
    }
    if let Some(i) = args.iterations {
        config.iterations = Some(i);
    }
    if let Some(w) = args.warmup {
        config.warmup_secs = w;
    }
    if let Some(t) = args.timeout {
        config.request_timeout_secs = t;
    }

    config.validate()?;
    Ok(config)
}

async fn run_sign(args: SignArgs) -> anyhow::Result<TestResults> {
    let config = resolve_config(&args.run, "sign")?;
    let client = TasClient::new(config.request_timeout(), config.vus as usize)?;

    let oidc = OidcSettings {
        issuer_url: args.oidc_issuer_url,
        username: args.oidc_user,
        password: args.oidc_password,
        client_id: args.oidc_client_id,
    };
    let credential = credential::setup(&client, &oidc).await?;

    let generate_data = parse_toggle(&args.generate_data).unwrap_or_else(|| {
        warn!(
            value = %args.generate_data,
            "Unrecognized GENERATE_DATA_MODE value; data generation disabled"
        );
        false
    });
    let (entry_sink, collector) = if generate_data {
        info!("Data generation mode enabled; collecting entry identifiers");
        let (sink, rx) = EntrySink::channel();
        let collector = tokio::spawn(collect_entries(rx, args.uuid_output.clone()));
        (Some(sink), Some(collector))
    } else {
        (None, None)
    };

    let context = SignContext {
        reporter: ErrorReporter::new(client.inner().clone(), &args.helper_url),
        client,
        credential,
        endpoints: SignEndpoints {
            fulcio_url: args.fulcio_url,
            rekor_url: args.rekor_url,
            helper_url: args.helper_url,
        },
        entry_sink,
    };

    let runner = LoadRunner::new(config);
    let mut results = runner.run(Arc::new(context)).await?;

    // Every sink clone is gone once the runner returns, which ends the collector.
    if let Some(collector) = collector {
        results.entries_collected = Some(collector.await??);
    }
    Ok(results)
}

async fn run_verify(args: VerifyArgs) -> anyhow::Result<TestResults> {
    let mut config = resolve_config(&args.run, "verify")?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let pool = match (&args.uuids_file, &args.rekor_uuids) {
        (Some(path), _) => IdentifierPool::from_file(path)?,
        (None, Some(list)) => IdentifierPool::parse_list(list)?,
        (None, None) => anyhow::bail!("REKOR_UUIDS must contain at least one entry identifier"),
    };
    info!(identifiers = pool.len(), "Loaded entry identifier pool");

    let context = VerifyContext {
        client: TasClient::new(config.request_timeout(), config.vus as usize)?,
        pool,
        rekor_url: args.rekor_url,
        tsa_url: args.tsa_url,
        seed: config.seed,
    };

    let runner = LoadRunner::new(config);
    runner.run(Arc::new(context)).await
}
