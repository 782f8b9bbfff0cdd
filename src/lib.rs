pub mod cli;
pub mod convert;
pub mod data;
pub mod detect;
pub mod error;
pub mod io_utils;
pub mod mapping;
pub mod normalize;
pub mod pipeline;
pub mod preview;
pub mod record;
pub mod registry;
pub mod schema;
pub mod store;
pub mod table;
pub mod writer;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    convert::DatasetConverter,
    data::Value,
    detect::{DetectedSchema, SchemaDetector},
    error::{IngestError, WriteStage},
    normalize::Normalizer,
    registry::SchemaRegistry,
    schema::{ColumnSpec, DeclaredType, EntitySchema, SemanticType},
    table::{NormalizedTable, SourceTable},
    writer::{BulkLoader, TransactionalWriter},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Schemas(args) => pipeline::execute_schemas(&args),
        Commands::Detect(args) => pipeline::execute_detect(&args),
        Commands::Convert(args) => pipeline::execute_convert(&args),
        Commands::Load(args) => pipeline::execute_load(&args),
    }
}
