//! Rich diagnostic error types for the patent-radar engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Unknown areas or investors passed to
//! queries are not errors: those operations return empty results instead.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the patent-radar engine.
#[derive(Debug, Error, Diagnostic)]
pub enum RadarError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

/// A raw table failed schema validation.
#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("patent table is empty")]
    #[diagnostic(
        code(radar::ingest::no_patents),
        help(
            "The technology-area set is derived from the patent table, so at least \
             one patent record is required. A refreshed table needs at least one \
             patent in a known area. Market and investor tables may be empty."
        )
    )]
    NoPatents,

    #[error("{table} record {id}: {field} = {value} is outside {min}..={max}")]
    #[diagnostic(
        code(radar::ingest::out_of_range),
        help("Scores are on a 0-100 scale. Check the producer's normalization.")
    )]
    OutOfRange {
        table: &'static str,
        id: String,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{table} record {id}: {field} must be {requirement}, got {value}")]
    #[diagnostic(
        code(radar::ingest::invalid_value),
        help("The value violates the record schema.")
    )]
    InvalidValue {
        table: &'static str,
        id: String,
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("{table} record has an empty {field}")]
    #[diagnostic(
        code(radar::ingest::missing_field),
        help("Identifiers and technology areas must be non-empty strings.")
    )]
    MissingField {
        table: &'static str,
        field: &'static str,
    },

    #[error("investor {investor_id} has no focus areas")]
    #[diagnostic(
        code(radar::ingest::empty_focus),
        help("Every investor profile must list at least one focus technology area.")
    )]
    EmptyFocus { investor_id: String },

    #[error("duplicate market snapshot for {area} in {year}")]
    #[diagnostic(
        code(radar::ingest::duplicate_snapshot),
        help("The market table holds at most one row per (technology area, year).")
    )]
    DuplicateSnapshot { area: String, year: i32 },
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

/// The data-producing collaborator could not deliver a batch.
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("data source unavailable for {area}: {message}")]
    #[diagnostic(
        code(radar::fetch::unavailable),
        help(
            "The producer is temporarily unavailable. The scheduled refresh retries \
             on the shortened backoff interval; the last good snapshot stays served."
        )
    )]
    Unavailable { area: String, message: String },
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

// ---------------------------------------------------------------------------
// Refresh errors
// ---------------------------------------------------------------------------

/// A refresh run was abandoned. The published snapshot is untouched.
#[derive(Debug, Error, Diagnostic)]
pub enum RefreshError {
    #[error("refresh aborted while fetching: {source}")]
    #[diagnostic(
        code(radar::refresh::fetch),
        help("The producer failed; the previous snapshot remains published.")
    )]
    Fetch {
        #[source]
        source: FetchError,
    },

    #[error("refresh aborted, re-ingested batch is invalid: {source}")]
    #[diagnostic(
        code(radar::refresh::ingest),
        help("The producer returned records that violate the schema.")
    )]
    Ingest {
        #[source]
        source: IngestError,
    },
}

impl From<FetchError> for RefreshError {
    fn from(source: FetchError) -> Self {
        Self::Fetch { source }
    }
}

impl From<IngestError> for RefreshError {
    fn from(source: IngestError) -> Self {
        Self::Ingest { source }
    }
}

pub type RefreshResult<T> = std::result::Result<T, RefreshError>;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(radar::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(radar::config::parse),
        help("Check the TOML syntax and field types in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid config value in {path}: {field}: {message}")]
    #[diagnostic(
        code(radar::config::invalid),
        help("The file parsed, but a value is out of its allowed range.")
    )]
    Invalid {
        path: String,
        field: &'static str,
        message: String,
    },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(radar::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience result alias for top-level operations.
pub type RadarResult<T> = std::result::Result<T, RadarError>;
