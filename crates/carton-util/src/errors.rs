use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Carton operations.
#[derive(Debug, Error, Diagnostic)]
pub enum CartonError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest (e.g. Carton.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Carton.toml for syntax errors"))]
    Manifest { message: String },

    /// Invalid version or version specifier string.
    #[error("Version error: {message}")]
    Version { message: String },

    /// Registry lookup failed (version listing or manifest fetch).
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// Every combination of available versions violates some declared
    /// requirement.
    #[error("no compatible set of versions satisfies every requirement")]
    #[diagnostic(help("Loosen the version requirements of the conflicting dependencies"))]
    NoSolution,
}

/// Convenience alias used across all Carton crates.
pub type CartonResult<T> = Result<T, CartonError>;
