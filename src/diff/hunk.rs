use super::range::Side;
use error_set::error_set;
use std::fmt;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Split diff text into lines on `\n` alone.
///
/// A `\r` before the newline stays part of the line, so CRLF files survive
/// reconstruction. A single trailing newline does not produce an empty line.
pub(crate) fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    (!text.is_empty())
        .then(|| text.strip_suffix('\n').unwrap_or(text).split('\n'))
        .into_iter()
        .flatten()
}

error_set! {
    /// Hunk text that disagrees with its declared header
    MalformedHunkError := {
        /// A line starts with something other than `+`, `-`, ` ` or `\`
        #[display("Unrecognized diff line marker in '{line}'")]
        UnknownMarker { line: String },
        /// Marker counts do not add up to the declared length of a side
        #[display("Hunk declares {declared} {side} lines but contains {actual}")]
        LengthMismatch { side: Side, declared: u32, actual: u32 },
    }
}

/// One line of hunk text, tagged by its marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// `+` line, present only in the new file
    Added(String),
    /// `-` line, present only in the old file
    Removed(String),
    /// ` ` line, present in both files
    Context(String),
}

impl DiffLine {
    /// Parse a single marked line
    pub fn parse(line: &str) -> Result<Self, MalformedHunkError> {
        let mut chars = line.chars();
        let text = || line[1..].to_string();
        match chars.next() {
            Some('+') => Ok(DiffLine::Added(text())),
            Some('-') => Ok(DiffLine::Removed(text())),
            Some(' ') => Ok(DiffLine::Context(text())),
            _ => Err(MalformedHunkError::UnknownMarker {
                line: line.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn marker(&self) -> char {
        match self {
            DiffLine::Added(_) => '+',
            DiffLine::Removed(_) => '-',
            DiffLine::Context(_) => ' ',
        }
    }

    /// Line content without the marker
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            DiffLine::Added(text) | DiffLine::Removed(text) | DiffLine::Context(text) => text,
        }
    }

    /// Whether the line exists in the old file
    #[must_use]
    pub fn in_old(&self) -> bool {
        matches!(self, DiffLine::Removed(_) | DiffLine::Context(_))
    }

    /// Whether the line exists in the new file
    #[must_use]
    pub fn in_new(&self) -> bool {
        matches!(self, DiffLine::Added(_) | DiffLine::Context(_))
    }

    #[must_use]
    pub fn on_side(&self, side: Side) -> bool {
        match side {
            Side::Old => self.in_old(),
            Side::New => self.in_new(),
        }
    }

    /// Whether the line is an addition or a removal
    #[must_use]
    pub fn is_change(&self) -> bool {
        !matches!(self, DiffLine::Context(_))
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.marker(), self.text())
    }
}

/// Where a hunk sits in one file: 1-based first line and line count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: u32,
    pub len: u32,
}

/// Offsets and lengths from a `@@ -o,l +n,l @@` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HunkHeader {
    pub old: Span,
    pub new: Span,
}

/// A contiguous block of a unified diff.
///
/// Built once from stored diff text and never modified afterwards. The
/// constructor guarantees that the number of old-side lines (`-` and ` `)
/// equals `old_span().len`, and likewise for the new side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    old: Span,
    new: Span,
    lines: Vec<DiffLine>,
    old_missing_newline: bool,
    new_missing_newline: bool,
}

impl Hunk {
    /// Build a hunk from header values and its newline-separated `changes` text.
    ///
    /// # Examples
    /// ```
    /// # use hunk_context::Hunk;
    /// let hunk = Hunk::new(10, 2, 10, 1, " keep\n-drop").unwrap();
    /// assert_eq!(hunk.old_lines(), vec!["keep", "drop"]);
    /// assert_eq!(hunk.new_lines(), vec!["keep"]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`MalformedHunkError`] if a line carries an unknown marker or
    /// the marker counts disagree with `old_len` / `new_len`.
    pub fn new(
        old_offset: u32,
        old_len: u32,
        new_offset: u32,
        new_len: u32,
        changes: &str,
    ) -> Result<Self, MalformedHunkError> {
        Self::with_header(
            HunkHeader {
                old: Span {
                    offset: old_offset,
                    len: old_len,
                },
                new: Span {
                    offset: new_offset,
                    len: new_len,
                },
            },
            changes,
        )
    }

    /// Build a hunk from a parsed header and its `changes` text
    pub fn with_header(header: HunkHeader, changes: &str) -> Result<Self, MalformedHunkError> {
        let mut lines: Vec<DiffLine> = Vec::new();
        let mut old_missing_newline = false;
        let mut new_missing_newline = false;

        for line in split_lines(changes) {
            if line.starts_with('\\') {
                // Applies to whichever side(s) the previous line belongs to
                if let Some(last) = lines.last() {
                    old_missing_newline |= last.in_old();
                    new_missing_newline |= last.in_new();
                }
                continue;
            }
            lines.push(DiffLine::parse(line)?);
        }

        let hunk = Hunk {
            old: header.old,
            new: header.new,
            lines,
            old_missing_newline,
            new_missing_newline,
        };
        hunk.check_len(Side::Old)?;
        hunk.check_len(Side::New)?;
        Ok(hunk)
    }

    fn check_len(&self, side: Side) -> Result<(), MalformedHunkError> {
        let declared = self.span(side).len;
        let actual = self.lines.iter().filter(|l| l.on_side(side)).count() as u32;
        if declared == actual {
            Ok(())
        } else {
            Err(MalformedHunkError::LengthMismatch {
                side,
                declared,
                actual,
            })
        }
    }

    #[must_use]
    pub fn header(&self) -> HunkHeader {
        HunkHeader {
            old: self.old,
            new: self.new,
        }
    }

    #[must_use]
    pub fn old_span(&self) -> Span {
        self.old
    }

    #[must_use]
    pub fn new_span(&self) -> Span {
        self.new
    }

    #[must_use]
    pub fn span(&self, side: Side) -> Span {
        match side {
            Side::Old => self.old,
            Side::New => self.new,
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    /// Whether the last line of `side` lacks a trailing newline
    #[must_use]
    pub fn missing_final_newline(&self, side: Side) -> bool {
        match side {
            Side::Old => self.old_missing_newline,
            Side::New => self.new_missing_newline,
        }
    }

    /// Text of the lines `side` contributes, markers stripped
    pub fn side_lines(&self, side: Side) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(move |l| l.on_side(side))
            .map(DiffLine::text)
    }

    /// The old file's contribution: `-` and ` ` lines
    #[must_use]
    pub fn old_lines(&self) -> Vec<&str> {
        self.side_lines(Side::Old).collect()
    }

    /// The new file's contribution: `+` and ` ` lines
    #[must_use]
    pub fn new_lines(&self) -> Vec<&str> {
        self.side_lines(Side::New).collect()
    }

    #[must_use]
    pub fn added_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, DiffLine::Added(_)))
            .count()
    }

    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, DiffLine::Removed(_)))
            .count()
    }
}

fn format_span(prefix: char, span: Span) -> String {
    match span.len {
        1 => format!("{}{}", prefix, span.offset),
        n => format!("{}{},{}", prefix, span.offset, n),
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ {} {} @@",
            format_span('-', self.old),
            format_span('+', self.new)
        )?;

        let last_old = self.lines.iter().rposition(DiffLine::in_old);
        let last_new = self.lines.iter().rposition(DiffLine::in_new);

        for (i, line) in self.lines.iter().enumerate() {
            writeln!(f, "{}", line)?;
            if (self.old_missing_newline && last_old == Some(i))
                || (self.new_missing_newline && last_new == Some(i))
            {
                writeln!(f, "{}", NO_NEWLINE_MARKER)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn parse_tags_each_marker() {
        assert_eq!(
            DiffLine::parse("+added").unwrap(),
            DiffLine::Added("added".to_string())
        );
        assert_eq!(
            DiffLine::parse("-removed").unwrap(),
            DiffLine::Removed("removed".to_string())
        );
        assert_eq!(
            DiffLine::parse(" same").unwrap(),
            DiffLine::Context("same".to_string())
        );
    }

    #[test]
    fn parse_keeps_marker_lookalikes_in_content() {
        assert_eq!(
            DiffLine::parse("++++ plus").unwrap(),
            DiffLine::Added("+++ plus".to_string())
        );
        assert_eq!(
            DiffLine::parse("---").unwrap(),
            DiffLine::Removed("--".to_string())
        );
    }

    #[test]
    fn parse_rejects_unknown_marker() {
        let result = DiffLine::parse("xyz");
        assert!(matches!(
            result,
            Err(MalformedHunkError::UnknownMarker { .. })
        ));
        assert!(DiffLine::parse("").is_err());
    }

    #[test]
    fn extract_old_and_new_lines() {
        let hunk = Hunk::new(5, 3, 5, 3, " a\n-b\n+B\n c").unwrap();
        assert_eq!(hunk.old_lines(), vec!["a", "b", "c"]);
        assert_eq!(hunk.new_lines(), vec!["a", "B", "c"]);
        assert_eq!(hunk.added_count(), 1);
        assert_eq!(hunk.removed_count(), 1);
    }

    #[test]
    fn pure_deletion_has_no_new_lines() {
        let hunk = Hunk::new(1, 1, 0, 0, "-a").unwrap();
        assert_eq!(hunk.old_lines(), vec!["a"]);
        assert!(hunk.new_lines().is_empty());
    }

    #[test]
    fn length_mismatch_is_rejected_on_old_side() {
        let result = Hunk::new(1, 2, 1, 1, " a");
        assert!(matches!(
            result,
            Err(MalformedHunkError::LengthMismatch {
                side: Side::Old,
                declared: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn length_mismatch_is_rejected_on_new_side() {
        let result = Hunk::new(1, 1, 1, 3, "-a\n+b");
        assert!(matches!(
            result,
            Err(MalformedHunkError::LengthMismatch {
                side: Side::New,
                declared: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn empty_changes_match_zero_lengths() {
        let hunk = Hunk::new(3, 0, 3, 0, "").unwrap();
        assert!(hunk.lines().is_empty());
    }

    #[test]
    fn trailing_newline_in_changes_is_not_a_line() {
        let hunk = Hunk::new(1, 1, 1, 1, " a\n").unwrap();
        assert_eq!(hunk.lines().len(), 1);
    }

    #[test]
    fn no_newline_marker_follows_previous_side() {
        let hunk = Hunk::new(3, 1, 3, 2, "-last\n\\ No newline at end of file\n+last\n+more")
            .unwrap();
        assert!(hunk.missing_final_newline(Side::Old));
        assert!(!hunk.missing_final_newline(Side::New));
        assert_eq!(hunk.lines().len(), 3);
    }

    #[test]
    fn no_newline_marker_after_context_marks_both_sides() {
        let hunk = Hunk::new(1, 2, 1, 2, "-a\n+b\n c\n\\ No newline at end of file").unwrap();
        assert!(hunk.missing_final_newline(Side::Old));
        assert!(hunk.missing_final_newline(Side::New));
    }

    #[test]
    fn render_mixed_hunk() {
        let changes = "-first old\n-second old\n+first new\n+second new\n+third new";
        let hunk = Hunk::new(10, 2, 10, 3, changes).unwrap();
        assert_eq!(
            hunk.to_string(),
            format!("@@ -10,2 +10,3 @@\n{changes}\n")
        );
    }

    #[test]
    fn render_single_line_spans_omit_length() {
        let hunk = Hunk::new(10, 1, 10, 1, "-old version\n+new version").unwrap();
        assert_eq!(
            hunk.to_string(),
            "@@ -10 +10 @@\n-old version\n+new version\n"
        );
    }

    #[test]
    fn render_pure_insertion() {
        let hunk = Hunk::new(10, 0, 11, 1, "+new line here").unwrap();
        assert_eq!(hunk.to_string(), "@@ -10,0 +11 @@\n+new line here\n");
    }

    #[test]
    fn render_roundtrips_no_newline_markers() {
        let body = "-old version\n\\ No newline at end of file\n\
                    +new version\n\\ No newline at end of file\n";
        let hunk = Hunk::new(3, 1, 3, 1, body).unwrap();
        assert_eq!(hunk.to_string(), format!("@@ -3 +3 @@\n{body}"));
    }

    #[test]
    fn carriage_returns_stay_in_line_text() {
        let hunk = Hunk::new(1, 2, 1, 2, " a\r\n-b\r\n+B\r").unwrap();
        assert_eq!(hunk.old_lines(), vec!["a\r", "b\r"]);
        assert_eq!(hunk.new_lines(), vec!["a\r", "B\r"]);
        assert_eq!(hunk.to_string(), "@@ -1,2 +1,2 @@\n a\r\n-b\r\n+B\r\n");
    }

    #[test]
    fn split_lines_only_breaks_on_newline() {
        assert_eq!(split_lines("a\r\nb\r\n").collect::<Vec<_>>(), vec!["a\r", "b\r"]);
        assert_eq!(split_lines("a\n\nb").collect::<Vec<_>>(), vec!["a", "", "b"]);
        assert_eq!(split_lines("").count(), 0);
        assert_eq!(split_lines("\n").collect::<Vec<_>>(), vec![""]);
    }
}
