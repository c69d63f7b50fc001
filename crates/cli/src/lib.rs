pub mod commands;
pub mod logging;

use std::process::ExitCode;

use bazaar_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use bazaar_core::domain::session::Language;
use bazaar_core::negotiation::RoundingMode;
use clap::{Args, Parser, Subcommand};

use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "bazaar",
    about = "Bazaar price-negotiation CLI",
    long_about = "Haggle over demo listings, replay single negotiation turns, and inspect configuration.",
    after_help = "Examples:\n  bazaar chat --product kanga-set-001\n  bazaar turn --price 150000 --message \"I want to pay 100000\"\n  bazaar config"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Override the log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override the log format (compact|pretty|json)")]
    log_format: Option<LogFormat>,
    #[arg(long, global = true, help = "Override price rounding (half_up|half_even)")]
    rounding: Option<RoundingMode>,
    #[arg(long, global = true, help = "Override the default reply language (english|swahili)")]
    default_language: Option<Language>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                rounding: self.rounding,
                default_language: self.default_language,
            },
            ..LoadOptions::default()
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Haggle interactively over a demo listing (/accept to buy, /quit to leave)")]
    Chat(commands::chat::ChatArgs),
    #[command(about = "Evaluate one negotiation turn and print the outcome as JSON")]
    Turn(commands::turn::TurnArgs),
    #[command(about = "List the demo catalog as JSON")]
    Catalog,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    let result = match cli.command {
        Command::Config => {
            CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Catalog => with_config(options, |_| commands::catalog::run()),
        Command::Chat(args) => with_config(options, |config| commands::chat::run(config, &args)),
        Command::Turn(args) => with_config(options, |config| commands::turn::run(config, &args)),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn with_config(
    options: LoadOptions,
    command: impl FnOnce(&AppConfig) -> CommandResult,
) -> CommandResult {
    match AppConfig::load(options) {
        Ok(config) => {
            logging::init(&config.logging);
            command(&config)
        }
        Err(error) => CommandResult::failure(
            "bazaar",
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        ),
    }
}
