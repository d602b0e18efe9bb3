use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use validate_api::cli::{CheckArgs, Cli, Command};
use validate_api::config::{ConfigManager, LoggingConfig};
use validate_api::{ApiRequest, Output, ValidationEngine, compile_files, registry};

/// Exit code for configuration, load and compile failures
const EXIT_CONFIG_ERROR: u8 = 2;
/// Exit code for a request that fails validation or matches nothing
const EXIT_INVALID: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = ConfigManager::load_config(&cli)
        .await
        .context("failed to load configuration")?;

    init_tracing(&config.logging);

    let documents = ConfigManager::require_documents(&config)?;
    let compiled = compile_files(documents)
        .await
        .context("failed to compile API description")?;
    registry::global().publish(compiled);

    let output = Output::new(config.output.verbosity(), config.output.format);

    match &cli.command {
        Command::Routes => {
            print!("{}", output.format_routes(&registry::global().snapshot()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Check(args) => {
            let mut request = ApiRequest::new(args.method.as_str(), &args.target);
            if let Some(body) = read_body(args).await? {
                request = request.with_body(body);
            }

            let outcome = ValidationEngine::global().validate(&request);
            let report = output.format_outcome(&args.method, &args.target, &outcome);
            if !report.is_empty() {
                println!("{}", report);
            }

            if outcome.is_ok() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(EXIT_INVALID))
            }
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn read_body(args: &CheckArgs) -> Result<Option<serde_json::Value>> {
    let text = match (&args.body, &args.body_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read body file {}", path.display()))?,
        (None, None) => return Ok(None),
    };

    let body = serde_json::from_str(&text).context("request body is not valid JSON")?;
    Ok(Some(body))
}
