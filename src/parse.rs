//! Parsing for stored diff text and inline-comment line references.
//!
//! Two inputs are understood:
//!
//! - A unified diff of a single file, as written by `git diff` or any
//!   `diff -u` style tool, which becomes a [`Changeset`].
//! - A `FILE:REFS` comment reference, which becomes a path and a
//!   [`LineRange`].
//!
//! # Line Reference Syntax
//!
//! - `N` - Line N of the new file
//! - `-N` - Line N of the old file
//! - `N..M` - New-file lines N through M (inclusive)
//! - `-N..-M` - Old-file lines N through M (inclusive)
//!
//! # Examples
//!
//! ```
//! use hunk_context::parse::parse_comment_ref;
//! use hunk_context::LineRange;
//!
//! let comment = parse_comment_ref("src/main.rs:41..42").unwrap();
//! assert_eq!(comment.file, "src/main.rs");
//! assert_eq!(comment.range, LineRange::in_new(41, 1));
//!
//! let comment = parse_comment_ref("src/main.rs:-10").unwrap();
//! assert_eq!(comment.range, LineRange::in_old(10, 0));
//! ```

use crate::diff::hunk::split_lines;
use crate::diff::{Changeset, Hunk, HunkHeader, LineRange, MalformedHunkError, Side, Span};
use error_set::error_set;
use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, u32 as line_number},
    combinator::{map, opt},
    sequence::preceded,
};
use std::iter::Peekable;
use std::num::NonZeroU32;
use tracing::trace;

error_set! {
    /// Errors from parsing diff text or comment references
    ParseError := {
        /// Diff text names no file in its `---`/`+++` lines
        #[display("Could not find a file path in the diff")]
        MissingPath,
        /// Diff text contains no `@@` blocks
        #[display("No hunks found in the diff")]
        NoHunks,
        /// Diff text covers more than one file
        #[display("Diff covers more than one file; found second header '{line}'")]
        MultipleFiles { line: String },
        /// A `@@` line could not be read
        #[display("Invalid hunk header '{line}'")]
        InvalidHunkHeader { line: String },
        /// Input string does not contain a colon separator
        #[display("Invalid format '{input}': expected 'file:refs'")]
        InvalidFormat { input: String },
        /// File name portion before the colon is empty or whitespace
        #[display("Invalid format '{input}': file name cannot be empty")]
        EmptyFileName { input: String },
        /// No line reference provided after the colon
        #[display("No line reference provided")]
        EmptyRefs,
        /// Line number could not be parsed as a valid non-zero u32
        #[display("Invalid line number '{value}'")]
        InvalidLineNumber { value: String },
        /// Range has start greater than end
        #[display("Invalid range {start}..{end}: start must be <= end")]
        InvalidRange { start: u32, end: u32 },
        /// Range starts on one side and ends on the other
        #[display("Range '{value}' mixes old (-N) and new (N) line numbers")]
        MixedSides { value: String },
        MalformedHunkError(MalformedHunkError),
    }
}

/// A parsed `FILE:REFS` comment reference
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRef {
    /// The file path
    pub file: String,
    /// The commented lines
    pub range: LineRange,
}

/// `N` or `N,L`; a missing length means one line
fn span(input: &str) -> IResult<&str, Span> {
    map(
        (line_number, opt(preceded(char(','), line_number))),
        |(offset, len)| Span {
            offset,
            len: len.unwrap_or(1),
        },
    )
    .parse(input)
}

fn hunk_header(input: &str) -> IResult<&str, HunkHeader> {
    map(
        (tag("@@ -"), span, tag(" +"), span, tag(" @@")),
        |(_, old, _, new, _)| HunkHeader { old, new },
    )
    .parse(input)
}

/// Parse a `@@ -old[,len] +new[,len] @@ [section]` line.
///
/// # Examples
///
/// ```
/// use hunk_context::parse::parse_hunk_header;
///
/// let header = parse_hunk_header("@@ -136,0 +137 @@ fn main() {").unwrap();
/// assert_eq!((header.old.offset, header.old.len), (136, 0));
/// assert_eq!((header.new.offset, header.new.len), (137, 1));
/// ```
pub fn parse_hunk_header(line: &str) -> Result<HunkHeader, ParseError> {
    hunk_header(line)
        .map(|(_, header)| header)
        .map_err(|_| ParseError::InvalidHunkHeader {
            line: line.to_string(),
        })
}

/// Parse the unified diff of one file into a [`Changeset`] with its hunks
/// attached.
///
/// The `diff --git`/`index`/mode preamble is optional. The path is taken from
/// the `+++` line, or from `---` when the file was deleted; `a/` and `b/`
/// prefixes and trailing timestamps are dropped.
///
/// # Errors
///
/// Returns [`ParseError`] if:
/// - No path can be found
/// - The text covers more than one file
/// - A hunk header is invalid or a hunk body disagrees with its header
/// - There are no hunks
pub fn parse_changeset(text: &str) -> Result<Changeset, ParseError> {
    let mut old_path: Option<String> = None;
    let mut new_path: Option<String> = None;
    let mut seen_git_header = false;
    let mut hunks = Vec::new();
    let mut lines = split_lines(text).peekable();

    while let Some(line) = lines.next() {
        if line.starts_with("diff --git ") {
            if seen_git_header {
                return Err(ParseError::MultipleFiles {
                    line: line.to_string(),
                });
            }
            seen_git_header = true;
        } else if let Some(path) = line.strip_prefix("--- ") {
            if !hunks.is_empty() || old_path.is_some() {
                return Err(ParseError::MultipleFiles {
                    line: line.to_string(),
                });
            }
            old_path = Some(clean_path(path, "a/"));
        } else if let Some(path) = line.strip_prefix("+++ ") {
            new_path = Some(clean_path(path, "b/"));
        } else if line.starts_with("@@ ") {
            let header = parse_hunk_header(line)?;
            let body = take_hunk_body(&mut lines, header);
            trace!(line, body_lines = body.len(), "parsed hunk");
            hunks.push(Hunk::with_header(header, &body.join("\n"))?);
        }
        // Anything else is preamble (index, mode, rename lines)
    }

    let path = [new_path, old_path]
        .into_iter()
        .flatten()
        .find(|p| !p.is_empty() && p != "/dev/null")
        .ok_or(ParseError::MissingPath)?;

    if hunks.is_empty() {
        return Err(ParseError::NoHunks);
    }

    Ok(Changeset::with_hunks(path, hunks))
}

/// Strip the `a/`/`b/` prefix and any tab-separated timestamp
fn clean_path(raw: &str, prefix: &str) -> String {
    let path = raw.split('\t').next().unwrap_or(raw).trim_end();
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

/// Consume the lines belonging to a hunk, as counted by its header.
///
/// Stops early at the first line that cannot belong to the hunk, leaving the
/// length check in [`Hunk::with_header`] to report the shortfall.
fn take_hunk_body<'a>(
    lines: &mut Peekable<impl Iterator<Item = &'a str>>,
    header: HunkHeader,
) -> Vec<&'a str> {
    let mut old_left = header.old.len;
    let mut new_left = header.new.len;
    let mut body = Vec::new();

    while let Some(&line) = lines.peek() {
        let (old, new) = match line.as_bytes().first() {
            Some(b'\\') => (0, 0),
            Some(b' ') => (1, 1),
            Some(b'-') => (1, 0),
            Some(b'+') => (0, 1),
            _ => break,
        };
        let is_marker = old == 0 && new == 0;
        if !is_marker && (old > old_left || new > new_left) {
            break;
        }
        old_left -= old;
        new_left -= new;
        body.push(line);
        lines.next();
    }

    body
}

/// Parse a `FILE:REFS` comment reference.
///
/// # Errors
///
/// Returns [`ParseError`] if:
/// - Input doesn't contain `:` separator
/// - File name is empty or whitespace
/// - No line reference provided
/// - Line numbers are invalid, inverted, or mix sides
pub fn parse_comment_ref(input: &str) -> Result<CommentRef, ParseError> {
    let Some((file, refs)) = input.rsplit_once(':') else {
        return Err(ParseError::InvalidFormat {
            input: input.to_string(),
        });
    };

    let file = file.trim();
    if file.is_empty() {
        return Err(ParseError::EmptyFileName {
            input: input.to_string(),
        });
    }

    Ok(CommentRef {
        file: file.to_string(),
        range: parse_line_range(refs)?,
    })
}

/// Parse the part after the colon: `N`, `-N`, `N..M` or `-N..-M`
pub fn parse_line_range(input: &str) -> Result<LineRange, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::EmptyRefs);
    }

    let Some((start_str, end_str)) = input.split_once("..") else {
        let (side, line) = parse_line_number(input)?;
        return Ok(LineRange::new(side, line.get(), 0));
    };

    let (side, start) = parse_line_number(start_str)?;
    let (end_side, end) = parse_line_number(end_str)?;
    if side != end_side {
        return Err(ParseError::MixedSides {
            value: input.to_string(),
        });
    }
    if start > end {
        return Err(ParseError::InvalidRange {
            start: start.get(),
            end: end.get(),
        });
    }

    Ok(LineRange::new(side, start.get(), end.get() - start.get()))
}

/// `-N` is an old-file line, bare `N` a new-file line
fn parse_line_number(input: &str) -> Result<(Side, NonZeroU32), ParseError> {
    let (side, digits) = match input.strip_prefix('-') {
        Some(digits) => (Side::Old, digits),
        None => (Side::New, input),
    };
    digits
        .parse::<NonZeroU32>()
        .map(|n| (side, n))
        .map_err(|_| ParseError::InvalidLineNumber {
            value: input.to_string(),
        })
}
