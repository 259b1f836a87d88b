use std::io::{self, IsTerminal};
use std::process::ExitCode;

use elab_cli::CliError;
use elab_cli::cli::{execute, help_text, parse_args};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Elaboration(_)) => ExitCode::from(1),
        Err(err @ CliError::Usage(_)) => {
            eprintln!("{err}\n");
            eprint!("{}", help_text());
            ExitCode::from(err.exit_code())
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(args: &[String]) -> Result<(), CliError> {
    let command = parse_args(args, io::stderr().is_terminal())?;
    execute(&command, &mut io::stdout().lock(), &mut io::stderr().lock())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ELAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
