mod api_client;
mod app;
mod cli;
mod config;
mod error;
mod extract;
mod help;
mod models;
mod reports;
mod stats;
mod telemetry;

use crate::{
    api_client::LichessClient,
    app::Progress,
    cli::{Action, Cli, Options},
    error::AppError,
};
use std::{
    env,
    io::{self, Write},
    process::ExitCode,
};

fn main() -> ExitCode {
    // A missing .env file is the common case.
    let _ = dotenvy::dotenv();
    telemetry::init_subscriber("warn");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Usage(err)) => err.exit(),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::try_parse_args(env::args_os())?;
    match cli.action() {
        Action::SaveToken => save_token(),
        Action::Analyze(options) => analyze(&options),
    }
}

fn analyze(options: &Options) -> Result<(), AppError> {
    let token = config::load_api_token()?;
    let client = LichessClient::new(token);

    let mut progress = if options.quiet {
        Progress::hidden()
    } else {
        Progress::new(io::stderr(), app::progress_total(&client, options))
    };
    let stats = app::analyze(&client, options, &mut progress)?;

    let mut stdout = io::stdout().lock();
    reports::render(&mut stdout, &stats, &options.report())?;
    stdout.flush()?;
    Ok(())
}

fn save_token() -> Result<(), AppError> {
    let token = rpassword::prompt_password("Lichess API token: ")?;
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Config("no token entered".to_string()));
    }

    LichessClient::new(token.to_string()).validate_credentials()?;
    let path = config::save_api_token(token)?;
    println!("Token saved to {}", path.display());
    Ok(())
}
