use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::io_utils::{InputSpec, parse_delimiter};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Detect, normalize and load spreadsheet-style tables into typed storage",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the registered entities, their source sheets and columns
    Schemas(SchemasArgs),
    /// Report which registered entity each input table matches
    Detect(DetectArgs),
    /// Normalize input tables and preview the typed rows
    Convert(ConvertArgs),
    /// Normalize input tables and load them atomically into a SQLite database
    Load(LoadArgs),
}

#[derive(Debug, Args)]
pub struct SchemasArgs {
    /// Registry YAML describing the target entities
    #[arg(short, long)]
    pub registry: PathBuf,
    /// Output format
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Registry YAML describing the target entities
    #[arg(short, long)]
    pub registry: PathBuf,
    /// Input CSV files, optionally as `NAME=PATH` to set the source table name
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<InputSpec>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Cell values to read as null in addition to empty fields
    #[arg(long = "null-token", action = clap::ArgAction::Append)]
    pub null_tokens: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Maximum number of rows to show per table
    #[arg(long)]
    pub limit: Option<usize>,
    /// Output format
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// SQLite database file (created when missing)
    #[arg(short, long)]
    pub database: PathBuf,
    /// Label stored on the processing record (defaults to the input names)
    #[arg(long)]
    pub label: Option<String>,
    /// Load even when identical inputs were already loaded successfully
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
