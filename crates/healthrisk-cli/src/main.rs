use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use healthrisk_cli::serve::config::ServeConfig;
use healthrisk_cli::serve::server::run_server;
use healthrisk_cli::train::input::TrainConfig;
use healthrisk_cli::train::runner::run_training;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("HEALTHRISK_LOG", "error,healthrisk=info"))
        .init();

    let matches = Command::new("healthrisk")
        .version(clap::crate_version!())
        .author("Justin Sing <justincsing@gmail.com>")
        .about("\u{1FA7A} HealthRisk CLI - Disease risk classification with SMOTE pipelines")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train, evaluate and track the disease risk models")
                .arg(
                    Arg::new("config")
                        .help("Path to the training configuration file (JSON). Defaults are used when omitted.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the health dataset CSV. Overrides the data file \
                             specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Registry model to train: \"Logistic Regression\", \"Random Forest\", \
                             \"XGBoost\" or \"SVC\". Unknown names train all models.",
                        )
                        .conflicts_with("all_models")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("all_models")
                        .long("all-models")
                        .help("Train every registry model.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("tracking_root")
                        .short('t')
                        .long("tracking-root")
                        .help("Directory of the experiment tracking store.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("experiment")
                        .short('e')
                        .long("experiment")
                        .help("Experiment name the runs are logged under.")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("report")
                        .short('r')
                        .long("report")
                        .help("Write an HTML training report to this path.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the risk assessment form for the latest (or a fixed) model")
                .arg(
                    Arg::new("tracking_root")
                        .short('t')
                        .long("tracking-root")
                        .help("Tracking store searched for the newest model artifact.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("model_path")
                        .long("model")
                        .help("Fixed model artifact (model.json); disables latest-model discovery.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help("Address to bind.")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Hostname),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .help("Port to bind.")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
        .subcommand(Command::new("config").about("Print the default training configuration (JSON)"))
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("serve", sub_m)) => handle_serve(sub_m),
        Some(("config", _)) => {
            println!("{}", serde_json::to_string_pretty(&TrainConfig::default())?);
            Ok(())
        }
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    if let Some(path) = config_path {
        log::info!("[HealthRisk::Train] Training from config: {:?}", path);
    }

    let config = match TrainConfig::from_arguments(config_path, matches) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid training configuration: {:#}", e);
            std::process::exit(1)
        }
    };

    match run_training(&config) {
        Ok(summary) => {
            log::info!(
                "[HealthRisk::Train] Best model based on Recall: {}",
                summary.best_model
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_serve(matches: &ArgMatches) -> Result<()> {
    let config = ServeConfig::from_arguments(matches)?;
    match run_server(config) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Server failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
