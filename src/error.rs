//! Error management module

use std::fmt;

/// The kind of error the tokenizer reported. The source's own vocabulary,
/// no more and no less.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A byte outside the allowed class appeared in a name-start, name,
    /// text, or value position.
    InvalidChar,
    /// Whitespace appeared where a stricter dispatch expected a name,
    /// e.g. between `<` and the element name.
    ProhibitedWhitespace,
    /// A prefix id was returned that would exceed the 256-slot prefix
    /// binding table.
    TooManyPrefixes,
    /// Any other structural dead end: a close tag without a matching open,
    /// an `EXPECT` check that didn't see what it expected, and so on.
    Other,
}

impl ErrorKind {
    fn description(&self) -> &'static str {
        match self {
            ErrorKind::InvalidChar => "invalid character",
            ErrorKind::ProhibitedWhitespace => "prohibited whitespace",
            ErrorKind::TooManyPrefixes => "too many prefixes",
            ErrorKind::Other => "parse error",
        }
    }
}

/// An error produced while tokenizing. Always terminal: once `parse` returns
/// one of these, the tokenizer has entered its sink state and further calls
/// are undefined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    row: u32,
    col: u32,
}

impl Error {
    /// Creates an error at the given source position.
    pub fn new(kind: ErrorKind, row: u32, col: u32) -> Self {
        Error { kind, row, col }
    }

    /// The kind of error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The row the error was detected on, 0-based.
    pub fn row(&self) -> u32 {
        self.row
    }

    /// The column the error was detected on, 0-based.
    pub fn col(&self) -> u32 {
        self.col
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at row {}, column {}",
            self.kind.description(),
            self.row,
            self.col
        )
    }
}

impl std::error::Error for Error {}

/// Result type, hard-wired to the tokenizer's [`Error`].
pub type Result<T> = ::std::result::Result<T, Error>;
