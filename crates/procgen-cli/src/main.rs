//! `procgen`: create, inspect and evaluate saved procedures

mod cli;
mod commands;

use std::process::ExitCode;

use cli::{CliError, Command, USAGE};

fn run(args: Vec<String>) -> Result<String, CliError> {
    match cli::parse(&args)? {
        Command::Demo { out } => commands::demo(&out),
        Command::Eval { file, options } => commands::eval(&file, &options),
        Command::Info { file } => commands::info(&file),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run(std::env::args().collect()) {
        Ok(output) => {
            println!("{}", output.trim_end());
            ExitCode::SUCCESS
        }
        Err(CliError::Usage(msg)) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            ExitCode::from(2)
        }
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
