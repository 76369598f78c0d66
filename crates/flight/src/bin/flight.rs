use std::path::PathBuf;
use std::rc::Rc;

use clap::{Arg, ArgMatches, Command};
use flight::config::{FlightConfig, Mode};
use flight::error::FlightError;
use flight::rsc::{ModuleMap, Model, render_to_stream};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let matches = Command::new("flight")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render server component payloads to flight rows")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("render")
                .about("Render a JSON model and write the rows to stdout")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("JSON file holding the model to render")
                        .value_parser(clap::value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .value_name("MODE")
                        .help("Render mode: development or production")
                        .value_parser(["development", "dev", "production", "prod"]),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("CONFIG")
                        .help("TOML config file")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Reduce log output")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    init_logging(&matches)?;

    match matches.subcommand() {
        Some(("render", sub_matches)) => {
            let config = load_configuration(sub_matches)?;
            let file = sub_matches
                .get_one::<PathBuf>("file")
                .ok_or_else(|| FlightError::Config("FILE argument is required".to_string()))?;

            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            let local = tokio::task::LocalSet::new();
            local.block_on(&runtime, render_file(file.clone(), config)).map_err(|e| {
                error!("Render failed: {}", e);
                e
            })?;
            Ok(())
        }
        _ => Err("Unknown command".into()),
    }
}

async fn render_file(file: PathBuf, config: FlightConfig) -> Result<(), FlightError> {
    let contents = tokio::fs::read_to_string(&file).await?;
    let model = Model::from(serde_json::from_str::<serde_json::Value>(&contents)?);
    debug!("Rendering {} in {} mode", file.display(), config.mode);

    let mut stream = render_to_stream(model, Rc::new(ModuleMap::new()), &config);
    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = stream.next().await {
        stdout.write_all(&chunk?).await?;
    }
    stdout.flush().await?;

    if !stream.is_complete() {
        return Err(FlightError::destination("render ended before the payload completed"));
    }
    Ok(())
}

fn init_logging(matches: &ArgMatches) -> Result<(), FlightError> {
    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");

    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("flight={default_level}")))
        .map_err(|e| FlightError::Config(format!("Failed to create log filter: {e}")))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(verbose)
                .with_line_number(verbose)
                .compact(),
        )
        .init();

    Ok(())
}

fn load_configuration(matches: &ArgMatches) -> Result<FlightConfig, FlightError> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => FlightConfig::from_file(path)?,
        None => match FlightConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid environment config, using defaults: {}", e);
                FlightConfig::default()
            }
        },
    };

    if let Some(mode_str) = matches.get_one::<String>("mode") {
        let mode: Mode = mode_str.parse()?;
        config.mode = mode;
    }

    config.validate()?;
    Ok(config)
}
