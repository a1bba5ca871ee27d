//! Run configuration, built once from the command line and passed down by reference.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use crate::{UploadError, UploadResult};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;

/// Connection parameters. The database name itself is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Where an import's accepted users go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    DryRun,
    Database(DbSettings),
}

/// The one thing a run does. Create-table wins over a file; neither means usage.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateTable(DbSettings),
    Import {
        file: PathBuf,
        charset: &'static encoding_rs::Encoding,
        target: ImportTarget,
    },
    Usage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub action: Action,
    pub verbose: bool,
}

pub fn command() -> Command {
    Command::new("user_upload")
        .about("Load a users CSV (name, surname, email) into MySQL")
        // -h is the database host
        .disable_help_flag(true)
        .arg(
            Arg::new("file")
                .long("file")
                .value_name("PATH")
                .help("CSV file to import (.gz and .zst are decompressed)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("create_table")
                .long("create_table")
                .help("Create the users table if missing, then exit without reading any file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry_run")
                .long("dry_run")
                .help("Validate and normalize the file without touching the database")
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("username").short('u').value_name("USER").help("MySQL username"))
        .arg(Arg::new("password").short('p').value_name("PASSWORD").help("MySQL password"))
        .arg(
            Arg::new("host")
                .short('h')
                .value_name("HOST")
                .default_value(DEFAULT_HOST)
                .help("MySQL host"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .default_value("3306")
                .value_parser(clap::value_parser!(u16))
                .help("MySQL port"),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .value_name("LABEL")
                .default_value("utf-8")
                .help("Character encoding of the CSV file"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Debug-level logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("help")
                .long("help")
                .help("Print help")
                .action(ArgAction::Help),
        )
}

impl UploadConfig {
    pub fn from_matches(matches: &ArgMatches) -> UploadResult<Self> {
        let action = if matches.get_flag("create_table") {
            Action::CreateTable(db_settings(matches)?)
        } else if let Some(file) = matches.get_one::<PathBuf>("file") {
            let target = if matches.get_flag("dry_run") {
                ImportTarget::DryRun
            } else {
                ImportTarget::Database(db_settings(matches)?)
            };
            Action::Import {
                file: file.clone(),
                charset: charset(matches)?,
                target,
            }
        } else {
            Action::Usage
        };

        Ok(Self {
            action,
            verbose: matches.get_flag("verbose"),
        })
    }
}

fn db_settings(matches: &ArgMatches) -> UploadResult<DbSettings> {
    let required = |id: &'static str| {
        matches
            .get_one::<String>(id)
            .cloned()
            .ok_or(UploadError::MissingSetting(id))
    };
    Ok(DbSettings {
        host: matches
            .get_one::<String>("host")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: matches.get_one::<u16>("port").copied().unwrap_or(DEFAULT_PORT),
        username: required("username")?,
        password: required("password")?,
    })
}

fn charset(matches: &ArgMatches) -> UploadResult<&'static encoding_rs::Encoding> {
    let label = matches
        .get_one::<String>("encoding")
        .map(String::as_str)
        .unwrap_or("utf-8");
    encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| UploadError::UnknownEncoding(label.to_string()))
}
