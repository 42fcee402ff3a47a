use std::path::PathBuf;

use crate::error::{IdrecError, IdrecResult};
use crate::logging;
use crate::model::IdentifyRequest;

pub const DEFAULT_DB_DIR: &str = ".data";
pub const DEFAULT_DB_FILE: &str = "idrec.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    File(PathBuf),
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: Storage,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    /// Set when `--email` or `--phone` was given: resolve once and exit.
    pub one_shot: Option<IdentifyRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Run(Config),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: Storage::File(PathBuf::from(DEFAULT_DB_DIR).join(DEFAULT_DB_FILE)),
            log_level: logging::default_log_level().to_string(),
            log_dir: None,
            one_shot: None,
        }
    }
}

impl Config {
    /// Parses command-line arguments (without the program name).
    pub fn from_args<I>(args: I) -> IdrecResult<Invocation>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let mut config = Config::default();
        let mut db_path: Option<PathBuf> = None;
        let mut in_memory = false;
        let mut email: Option<String> = None;
        let mut phone: Option<String> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--file" | "-f" => db_path = Some(PathBuf::from(required_value(&mut args, &arg)?)),
                "--memory" => in_memory = true,
                "--log-level" => config.log_level = required_value(&mut args, &arg)?,
                "--log-dir" => config.log_dir = Some(PathBuf::from(required_value(&mut args, &arg)?)),
                "--email" => email = Some(required_value(&mut args, &arg)?),
                "--phone" | "--phone-number" => phone = Some(required_value(&mut args, &arg)?),
                "--help" | "-h" => return Ok(Invocation::Help),
                other => {
                    return Err(IdrecError::Config(format!("Unknown argument: {}", other)));
                }
            }
        }

        match (db_path, in_memory) {
            (Some(_), true) => {
                return Err(IdrecError::Config(
                    "--file and --memory cannot be combined".into(),
                ));
            }
            (Some(path), false) => config.storage = Storage::File(path),
            (None, true) => config.storage = Storage::Memory,
            (None, false) => {}
        }

        if email.is_some() || phone.is_some() {
            config.one_shot = Some(IdentifyRequest {
                email,
                phone_number: phone,
            });
        }

        Ok(Invocation::Run(config))
    }
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> IdrecResult<String> {
    let value = args
        .next()
        .ok_or_else(|| IdrecError::Config(format!("{} requires a value", flag)))?;
    non_blank(&value, flag)
}

/// Trims a flag value, rejecting one that is empty or whitespace-only.
fn non_blank(value: &str, flag: &str) -> IdrecResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(IdrecError::Config(format!("{} cannot be blank", flag)))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn usage() -> &'static str {
    "idrec - contact identity reconciliation

Usage: idrec [OPTIONS]

Options:
  -f, --file <PATH>      Database file path (default: .data/idrec.db)
  --memory               Use an in-memory database
  --log-level <LEVEL>    trace|debug|info|warn|error
  --log-dir <DIR>        Write rotated log files to DIR instead of stderr
  --email <EMAIL>        Resolve once with this email and print the result
  --phone <PHONE>        Resolve once with this phone number and print the result
  -h, --help             Show this help

Without --email/--phone an interactive prompt is started."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> IdrecResult<Invocation> {
        Config::from_args(args.iter().map(|s| s.to_string()))
    }

    fn run_config(args: &[&str]) -> Config {
        match parse(args).unwrap() {
            Invocation::Run(config) => config,
            Invocation::Help => panic!("expected run invocation"),
        }
    }

    #[test]
    fn defaults_to_data_dir_file() {
        let config = run_config(&[]);
        assert_eq!(config.storage, Storage::File(PathBuf::from(".data/idrec.db")));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.one_shot, None);
    }

    #[test]
    fn parses_file_and_log_options() {
        let config = run_config(&["-f", "/tmp/x.db", "--log-level", "warn", "--log-dir", "/tmp/logs"]);
        assert_eq!(config.storage, Storage::File(PathBuf::from("/tmp/x.db")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn email_and_phone_make_one_shot_request() {
        let config = run_config(&["--memory", "--email", "a@x.com", "--phone", "123"]);
        assert_eq!(config.storage, Storage::Memory);
        assert_eq!(config.one_shot, Some(IdentifyRequest::new(Some("a@x.com"), Some("123"))));
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse(&["--bogus", "-h"]).is_err());
        assert_eq!(parse(&["-h", "--bogus-later"]).unwrap(), Invocation::Help);
    }

    #[test]
    fn missing_value_is_rejected() {
        assert!(matches!(parse(&["--file"]), Err(IdrecError::Config(_))));
    }

    #[test]
    fn blank_value_is_rejected() {
        assert!(matches!(parse(&["--email", "  "]), Err(IdrecError::Config(_))));
        assert!(matches!(parse(&["-f", ""]), Err(IdrecError::Config(_))));
    }

    #[test]
    fn flag_values_are_trimmed() {
        let config = run_config(&["-f", "  /tmp/x.db  ", "--log-level", " debug "]);
        assert_eq!(config.storage, Storage::File(PathBuf::from("/tmp/x.db")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn unknown_argument_is_rejected() {
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn file_and_memory_conflict() {
        assert!(parse(&["--memory", "-f", "x.db"]).is_err());
    }
}
