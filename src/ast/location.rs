use std::fmt;

/// Line/column range of a syntax element, 1-based once parsed.
///
/// `(0, 0, 0, 0)` is the sentinel for synthetic nodes and for anything
/// created before a real parse. The derived ordering sorts by start line,
/// then start column, which is the order diagnostics are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SourceLocation {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceLocation {
    pub const UNKNOWN: SourceLocation = SourceLocation {
        start_line: 0,
        start_col: 0,
        end_line: 0,
        end_col: 0,
    };

    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    pub fn start(&self) -> (u32, u32) {
        (self.start_line, self.start_col)
    }

    pub fn end(&self) -> (u32, u32) {
        (self.end_line, self.end_col)
    }

    /// true if `other` lies within this range (inclusive at both ends)
    pub fn contains(&self, other: &SourceLocation) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }

    /// smallest location covering both `self` and `other`
    pub fn merge(&self, other: &SourceLocation) -> SourceLocation {
        if self.is_unknown() {
            return *other;
        }
        if other.is_unknown() {
            return *self;
        }
        let (start_line, start_col) = self.start().min(other.start());
        let (end_line, end_col) = self.end().max(other.end());
        SourceLocation {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// shifts a location by a bias: lines move by `bias.start_line`, columns
    /// on the first line move by `bias.start_col`
    pub fn offset_by(&self, bias: &SourceLocation) -> SourceLocation {
        if bias.is_unknown() || self.is_unknown() {
            return *self;
        }
        let shift = |line: u32, col: u32| {
            if line == 1 {
                (line + bias.start_line, col + bias.start_col)
            } else {
                (line + bias.start_line, col)
            }
        };
        let (start_line, start_col) = shift(self.start_line, self.start_col);
        let (end_line, end_col) = shift(self.end_line, self.end_col);
        SourceLocation {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}:{};{}:{}]",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// Maps byte offsets of a source text to 1-based line/column pairs.
///
/// Columns count characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex<'s> {
    text: &'s str,
    line_starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    pub fn new(text: &'s str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let col = self.text[line_start..offset].chars().count() + 1;
        (line as u32 + 1, col as u32)
    }

    pub fn location(&self, start: usize, end: usize) -> SourceLocation {
        let (start_line, start_col) = self.line_col(start);
        let (end_line, end_col) = self.line_col(end);
        SourceLocation {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// byte range of the (1-based) line, excluding its newline
    pub fn line_range(&self, line: u32) -> Option<(usize, usize)> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)?;
        let end = match self.line_starts.get(idx + 1) {
            Some(next) => next - 1,
            None => self.text.len(),
        };
        Some((start, end))
    }
}
