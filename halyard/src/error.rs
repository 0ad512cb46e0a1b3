use crate::migration::MigrationStep;
use crate::store::StoreError;
use halyard_es::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Request rejected before anything was sent to the engine
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to resolve mapping for index {index}: {source}")]
    Resolution {
        index: String,
        #[source]
        source: EngineError,
    },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Migration stopped before any alias moved
    #[error("Migration of {base} failed at {step}: {source}")]
    MigrationStep {
        step: MigrationStep,
        base: String,
        current: Option<String>,
        new: Option<String>,
        #[source]
        source: Box<Error>,
    },

    /// Migration stopped after the write alias moved; aliases may be split
    #[error(
        "Migration of {base} left partially applied at {step} \
         (write alias -> {write_alias_target}, read alias -> {read_alias_target}): {reason}"
    )]
    PartialMigration {
        step: MigrationStep,
        base: String,
        current: String,
        new: String,
        write_alias_target: String,
        read_alias_target: String,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether repeating the same call may succeed.
    ///
    /// Only transient engine failures qualify; Halyard never retries on its
    /// own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Engine(e) | Error::Resolution { source: e, .. } => is_transient(e),
            _ => false,
        }
    }

    /// Short label for log fields
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Resolution { .. } => "resolution",
            Error::Engine(_) => "engine",
            Error::MigrationStep { .. } => "migration_step",
            Error::PartialMigration { .. } => "partial_migration",
            Error::Store(_) => "store",
            Error::Config(_) => "config",
            Error::Cancelled => "cancelled",
        }
    }
}

fn is_transient(error: &EngineError) -> bool {
    match error {
        EngineError::Transport { .. } | EngineError::Timeout { .. } => true,
        EngineError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, Error>;
