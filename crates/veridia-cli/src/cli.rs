use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit {
        url: String,
        analysis_type: String,
        follow: bool,
    },
    Show {
        html: bool,
    },
    Refresh {
        html: bool,
    },
    Export {
        out_dir: PathBuf,
    },
    List,
    Clear,
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Show { .. } => "show",
            Self::Refresh { .. } => "refresh",
            Self::Export { .. } => "export",
            Self::List => "list",
            Self::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub command: Command,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing command")]
    MissingCommand,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unknown argument for {command}: {argument}")]
    UnknownArgument { command: String, argument: String },
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut iter = args.into_iter();
        let command_name = iter.next().ok_or(CliError::MissingCommand)?;

        let command = match command_name.as_str() {
            "--help" | "-h" | "help" => return Err(CliError::HelpRequested),
            "submit" => parse_submit(&mut iter)?,
            "show" => Command::Show {
                html: parse_html_flag("show", &mut iter)?,
            },
            "refresh" => Command::Refresh {
                html: parse_html_flag("refresh", &mut iter)?,
            },
            "export" => parse_export(&mut iter)?,
            "list" => {
                expect_no_arguments("list", &mut iter)?;
                Command::List
            }
            "clear" => {
                expect_no_arguments("clear", &mut iter)?;
                Command::Clear
            }
            unknown => return Err(CliError::UnknownCommand(unknown.to_string())),
        };

        Ok(Self { command })
    }
}

/// Empty `--url`/`--type` are accepted here; the submission flow rejects them.
fn parse_submit(iter: &mut impl Iterator<Item = String>) -> Result<Command, CliError> {
    let mut url = String::new();
    let mut analysis_type = String::new();
    let mut follow = true;

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => return Err(CliError::HelpRequested),
            "--url" => url = iter.next().ok_or(CliError::MissingValue(arg.clone()))?,
            "--type" => analysis_type = iter.next().ok_or(CliError::MissingValue(arg.clone()))?,
            "--no-follow" => follow = false,
            unknown => return Err(unknown_argument("submit", unknown)),
        }
    }

    Ok(Command::Submit {
        url,
        analysis_type,
        follow,
    })
}

fn parse_export(iter: &mut impl Iterator<Item = String>) -> Result<Command, CliError> {
    let mut out_dir = PathBuf::from(".");

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => return Err(CliError::HelpRequested),
            "--out" => {
                out_dir = iter
                    .next()
                    .map(PathBuf::from)
                    .ok_or(CliError::MissingValue(arg.clone()))?
            }
            unknown => return Err(unknown_argument("export", unknown)),
        }
    }

    Ok(Command::Export { out_dir })
}

fn parse_html_flag(
    command: &str,
    iter: &mut impl Iterator<Item = String>,
) -> Result<bool, CliError> {
    let mut html = false;
    for arg in iter {
        match arg.as_str() {
            "--help" | "-h" => return Err(CliError::HelpRequested),
            "--html" => html = true,
            unknown => return Err(unknown_argument(command, unknown)),
        }
    }
    Ok(html)
}

fn expect_no_arguments(
    command: &str,
    iter: &mut impl Iterator<Item = String>,
) -> Result<(), CliError> {
    match iter.next() {
        None => Ok(()),
        Some(arg) if arg == "--help" || arg == "-h" => Err(CliError::HelpRequested),
        Some(arg) => Err(unknown_argument(command, &arg)),
    }
}

fn unknown_argument(command: &str, argument: &str) -> CliError {
    CliError::UnknownArgument {
        command: command.to_string(),
        argument: argument.to_string(),
    }
}
