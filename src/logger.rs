use std::fmt;

use log::{error, info, warn};

use crate::ast::SourceLocation;
use crate::error::{ErrorKind, FrontendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoggingLevel {
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoggingLevel::Info => write!(f, "Info"),
            LoggingLevel::Warning => write!(f, "Warning"),
            LoggingLevel::Error => write!(f, "Error"),
            LoggingLevel::Fatal => write!(f, "Fatal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: LoggingLevel,
    pub location: SourceLocation,
    pub message: String,
    pub kind: Option<ErrorKind>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.level >= LoggingLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.location.is_unknown() {
            write!(f, "{}: {}", self.level, self.message)
        } else {
            write!(
                f,
                "Line {}, Column {}: {}: {}",
                self.location.start_line, self.location.start_col, self.level, self.message
            )
        }
    }
}

/// Diagnostics sink for one compilation session.
///
/// `init` starts a new session. Reports below the minimum level are not
/// recorded, but errors and warnings are always counted so that
/// `has_errors` never misses a failure. Every recorded diagnostic is also
/// forwarded to the `log` facade.
#[derive(Debug, Clone)]
pub struct Logger {
    minimum: LoggingLevel,
    initialized: bool,
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self {
            minimum: LoggingLevel::Info,
            initialized: false,
            diagnostics: Vec::new(),
            errors: 0,
            warnings: 0,
        }
    }

    pub fn init(&mut self, level: LoggingLevel) {
        self.minimum = level;
        self.initialized = true;
        self.diagnostics.clear();
        self.errors = 0;
        self.warnings = 0;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn minimum_level(&self) -> LoggingLevel {
        self.minimum
    }

    pub fn report(&mut self, level: LoggingLevel, location: SourceLocation, message: impl Into<String>) {
        self.push(level, location, message.into(), None);
    }

    /// reports `err` at `Error` level
    pub fn report_error(&mut self, err: FrontendError, location: SourceLocation) {
        self.report_error_at(LoggingLevel::Error, err, location);
    }

    pub fn report_error_at(&mut self, level: LoggingLevel, err: FrontendError, location: SourceLocation) {
        let kind = err.kind();
        self.push(level, location, err.to_string(), Some(kind));
    }

    fn push(
        &mut self,
        level: LoggingLevel,
        location: SourceLocation,
        message: String,
        kind: Option<ErrorKind>,
    ) {
        match level {
            LoggingLevel::Error | LoggingLevel::Fatal => self.errors += 1,
            LoggingLevel::Warning => self.warnings += 1,
            LoggingLevel::Info => (),
        }
        if level < self.minimum {
            return;
        }
        let diagnostic = Diagnostic {
            level,
            location,
            message,
            kind,
        };
        match level {
            LoggingLevel::Info => info!("{}", diagnostic),
            LoggingLevel::Warning => warn!("{}", diagnostic),
            LoggingLevel::Error | LoggingLevel::Fatal => error!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// recorded diagnostics in the order they were reported; the iterator
    /// can be cloned to walk them again
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> + Clone + '_ {
        self.diagnostics.iter()
    }

    /// recorded diagnostics ordered by location, ties kept in report order
    pub fn sorted_diagnostics(&self) -> Vec<&Diagnostic> {
        let mut sorted: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        sorted.sort_by_key(|d| d.location);
        sorted
    }

    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == Some(kind))
            .count()
    }

    pub fn has_error_contains(&self, text: &str) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.is_error() && d.message.contains(text))
    }

    pub fn as_error_message(&self) -> String {
        self.sorted_diagnostics()
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
