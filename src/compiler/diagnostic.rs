//! Parse-time error accumulation
//!
//! Every fallible step of the parser records into an [`ErrorLog`] and keeps
//! going, so one run reports as many problems as it can find.

use super::cursor::Position;
use std::fmt;

/// Kind of a recorded parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("file not found")]
    FileNotFound,
    #[error("line header is wrong")]
    MalformedLineHeader,
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("block start not found")]
    BlockStartNotFound,
    #[error("block end not found")]
    BlockEndNotFound,
    #[error("quote end not found")]
    QuoteEndNotFound,
    #[error("unknown header name")]
    UnknownHeaderName,
    #[error("unknown command name")]
    UnknownCommandName,
    #[error("too few parameters")]
    TooFewParameters,
    #[error("invalid number")]
    InvalidNumber,
    #[error("device number is out of range")]
    DeviceIndexOutOfRange,
    #[error("device name is not supported")]
    UnsupportedDevice,
    #[error("channel number is out of range")]
    ChannelOutOfRange,
    #[error("track is already built")]
    AlreadyBuiltTrack,
    #[error("track name is not assigned")]
    UnknownTrackName,
    #[error("tone name is not found")]
    UnknownToneName,
    #[error("repeat count is wrong")]
    RepeatCount,
    #[error("repeat bracket is unbalanced")]
    RepeatUnbalanced,
    #[error("last note not found")]
    LastNoteNotFound,
    #[error("note length is wrong")]
    NoteLength,
    #[error("volume is out of range")]
    VolumeOutOfRange,
}

/// A single recorded error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub position: Position,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : Error {}", self.position, self.kind)
    }
}

/// Ordered list of errors collected during one parse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<Diagnostic>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ErrorKind, position: Position) {
        self.entries.push(Diagnostic { kind, position });
    }

    pub fn has_error(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Whether any entry has the given kind
    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entry() {
        let mut log = ErrorLog::new();
        log.add(ErrorKind::VolumeOutOfRange, Position::new(2, 4));
        assert_eq!(log.to_string(), "3:5 : Error volume is out of range");
    }

    #[test]
    fn test_multiple_entries_keep_order() {
        let mut log = ErrorLog::new();
        log.add(ErrorKind::UnknownHeaderName, Position::new(0, 0));
        log.add(ErrorKind::InvalidNumber, Position::new(1, 9));
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.to_string(),
            "1:1 : Error unknown header name\n2:10 : Error invalid number"
        );
        assert!(log.contains(ErrorKind::InvalidNumber));
        assert!(!log.contains(ErrorKind::NoteLength));
    }
}
