use core::fmt::{Display, Formatter};
use ohno::AppError;
use strum::Display as StrumDisplay;

/// Classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// A record is missing a required field or carries an out-of-set enum value.
    Validation,

    /// A single file or document could not be interpreted.
    Parse,

    /// Snapshot acquisition failed.
    Fetch,

    /// A systemic failure during extraction, such as a required directory being absent.
    Extract,

    /// Filesystem failure outside of a parse.
    Io,

    /// Persistence failure.
    Store,

    /// The caller's cancellation token fired.
    Cancelled,
}

/// An error surfaced by adapters, the store, and the orchestrator.
///
/// The message is rendered verbatim by `Display`; it is what gets recorded in an extraction run's
/// `error_message`.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    inner: AppError,
}

impl Error {
    pub fn new(kind: ErrorKind, inner: impl Into<AppError>) -> Self {
        Self { kind, inner: inner.into() }
    }

    pub fn validation(inner: impl Into<AppError>) -> Self {
        Self::new(ErrorKind::Validation, inner)
    }

    pub fn parse(inner: impl Into<AppError>) -> Self {
        Self::new(ErrorKind::Parse, inner)
    }

    pub fn fetch(inner: impl Into<AppError>) -> Self {
        Self::new(ErrorKind::Fetch, inner)
    }

    pub fn extract(inner: impl Into<AppError>) -> Self {
        Self::new(ErrorKind::Extract, inner)
    }

    pub fn io(inner: impl Into<AppError>) -> Self {
        Self::new(ErrorKind::Io, inner)
    }

    pub fn store(inner: impl Into<AppError>) -> Self {
        Self::new(ErrorKind::Store, inner)
    }

    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, ohno::app_err!("operation cancelled"))
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Unwrap into the underlying application error.
    #[must_use]
    pub fn into_app_err(self) -> AppError {
        self.inner
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl core::error::Error for Error {}
