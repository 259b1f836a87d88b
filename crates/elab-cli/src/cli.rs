use std::io::Write;
use std::path::PathBuf;

use elab_apply::{ElaborationOptions, read_options};
use elab_typing::DeclTable;
use tracing::debug;

use crate::{CliError, Fixture, render_report, run_fixture};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run {
        fixture: PathBuf,
        options: Option<PathBuf>,
        json: bool,
        color: bool,
    },
    CoreLibrary,
    Help,
}

pub fn parse_args(args: &[String], color_default: bool) -> Result<Command, CliError> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    match command.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "core-library" => match rest.first() {
            None => Ok(Command::CoreLibrary),
            Some(extra) => Err(CliError::Usage(format!("unexpected argument '{extra}'"))),
        },
        "run" => parse_run(rest, color_default),
        other => Err(CliError::Usage(format!("unknown command '{other}'"))),
    }
}

fn parse_run(args: &[String], color_default: bool) -> Result<Command, CliError> {
    let mut fixture = None;
    let mut options = None;
    let mut json = false;
    let mut color = color_default;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--no-color" => color = false,
            "--options" => {
                let Some(path) = iter.next() else {
                    return Err(CliError::Usage("--options expects a path".to_string()));
                };
                options = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown flag '{flag}'")));
            }
            path => {
                if fixture.is_some() {
                    return Err(CliError::Usage(format!("unexpected argument '{path}'")));
                }
                fixture = Some(PathBuf::from(path));
            }
        }
    }
    let Some(fixture) = fixture else {
        return Err(CliError::Usage("run expects a fixture path".to_string()));
    };
    Ok(Command::Run {
        fixture,
        options,
        json,
        color,
    })
}

/// Runs `command`, writing results to `out` and rendered diagnostics to `err`.
pub fn execute(command: &Command, out: &mut dyn Write, err: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Help => {
            out.write_all(help_text().as_bytes())?;
            Ok(())
        }
        Command::CoreLibrary => {
            let table = DeclTable::with_core_library();
            let text = serde_json::to_string_pretty(&table).map_err(std::io::Error::other)?;
            writeln!(out, "{text}")?;
            Ok(())
        }
        Command::Run {
            fixture,
            options,
            json,
            color,
        } => {
            let loaded = Fixture::load(fixture)?;
            let options = match options {
                Some(path) => read_options(path)?,
                None => ElaborationOptions::default(),
            };
            debug!(fixture = %fixture.display(), "elaborating");
            let report = run_fixture(&loaded, &options);
            if *json {
                let text = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
                writeln!(out, "{text}")?;
            } else {
                let rendered = render_report(&loaded, &options, &report, *color);
                if report.ok {
                    out.write_all(rendered.as_bytes())?;
                } else {
                    err.write_all(rendered.as_bytes())?;
                }
            }
            match report.failure {
                Some(error) => Err(CliError::Elaboration(error)),
                None => Ok(()),
            }
        }
    }
}

pub fn help_text() -> String {
    [
        "elab: elaborates solved expressions into fully typed trees",
        "",
        "USAGE:",
        "  elab run <fixture.json> [--options elab.toml] [--json] [--no-color]",
        "  elab core-library",
        "  elab help",
        "",
        "ENVIRONMENT:",
        "  ELAB_LOG  tracing filter for stderr logs (default: warn)",
        "",
    ]
    .join("\n")
}
