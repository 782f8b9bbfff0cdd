use std::fmt;

use thiserror::Error;

use crate::schema::SemanticType;

/// Errors raised by detection, normalization and the transactional writer.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no registered schema matches the headers of source table '{table}'")]
    SchemaMismatch { table: String },

    #[error(
        "source table '{table}' matches more than one registered schema: {}",
        .candidates.join(", ")
    )]
    AmbiguousSchemaMatch {
        table: String,
        candidates: Vec<String>,
    },

    #[error("source table '{table}' has more than one column mapped to '{property}'")]
    DuplicateColumn { table: String, property: String },

    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error(
        "entity '{entity}' has no property '{property}' (known properties: {})",
        .known.join(", ")
    )]
    UnknownColumn {
        entity: String,
        property: String,
        known: Vec<String>,
    },

    #[error(
        "table '{table}' row {row} column '{column}': cannot convert '{value}' to {target}"
    )]
    TypeConversionFailure {
        table: String,
        column: String,
        row: usize,
        value: String,
        target: SemanticType,
    },

    #[error("transaction for '{label}' rolled back during {stage}: {source}")]
    TransactionFailure {
        label: String,
        stage: WriteStage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid schema registry: {message}")]
    Registry { message: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl IngestError {
    pub(crate) fn registry(message: impl Into<String>) -> Self {
        IngestError::Registry {
            message: message.into(),
        }
    }
}

/// Step of the writer's transaction that was running when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStage {
    Begin,
    InsertRecord,
    BulkLoad(String),
    UpdateRecord,
    Commit,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::Begin => write!(f, "begin"),
            WriteStage::InsertRecord => write!(f, "processing record insert"),
            WriteStage::BulkLoad(table) => write!(f, "bulk load of '{table}'"),
            WriteStage::UpdateRecord => write!(f, "processing record update"),
            WriteStage::Commit => write!(f, "commit"),
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
