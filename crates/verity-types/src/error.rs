// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Verity Kernel failures.
///
/// Refusals are not errors. A dataset that fails its contract or a
/// score below the reporting threshold is expressed as a refusal
/// `Insight`; this enum only covers the edges of the kernel.
#[derive(Error, Debug)]
pub enum VerityError {
    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// Malformed input that reached the core (wrong field type, bad range).
    #[error("validation error: {0}")]
    Validation(String),

    /// Contract definition is unusable (e.g. empty id, negative threshold).
    #[error("contract error: {0}")]
    Contract(String),

    /// Engine-supplied computation failed unexpectedly.
    #[error("computation error: {0}")]
    Computation(String),

    /// Decision sink could not persist or load entries.
    #[error("decision sink error: {0}")]
    Sink(String),

    /// Cache-key invalidation pattern failed to compile.
    #[error("invalid key pattern: {0}")]
    Pattern(String),

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type VerityResult<T> = Result<T, VerityError>;
