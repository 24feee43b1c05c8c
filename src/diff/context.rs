//! Unified-diff excerpts around an inline comment.
//!
//! A comment is anchored to a [`LineRange`] on one side of the diff only, but
//! a useful excerpt shows the `-` and `+` lines around it together. The walk
//! therefore tracks a position on both sides at once, while only the
//! commented side decides where the excerpt starts and stops.

use super::changeset::{Changeset, StateError};
use super::hunk::{DiffLine, Hunk};
use super::range::{LineRange, Side};
use tracing::{debug, trace};

/// Hunk-local walk state: one zero-based position per side, plus where each
/// side's part of the excerpt begins.
#[derive(Debug, Default)]
struct Cursor {
    old: i64,
    new: i64,
    first_old: Option<i64>,
    first_new: Option<i64>,
}

impl Cursor {
    fn position(&self, side: Side) -> i64 {
        match side {
            Side::Old => self.old,
            Side::New => self.new,
        }
    }

    fn mark(&mut self, line: &DiffLine) {
        if self.first_old.is_none() && line.in_old() {
            self.first_old = Some(self.old);
        }
        if self.first_new.is_none() && line.in_new() {
            self.first_new = Some(self.new);
        }
    }

    fn advance(&mut self, line: &DiffLine) {
        if line.in_old() {
            self.old += 1;
        }
        if line.in_new() {
            self.new += 1;
        }
    }

    /// `@@ -o,l +n,l @@`, without the clause of a side that saw no lines
    fn header(&self, hunk: &Hunk) -> String {
        let mut header = String::from("@@");
        if let Some(first) = self.first_old {
            let offset = i64::from(hunk.old_span().offset) + first;
            header.push_str(&format!(" -{},{}", offset, self.old - first));
        }
        if let Some(first) = self.first_new {
            let offset = i64::from(hunk.new_span().offset) + first;
            header.push_str(&format!(" +{},{}", offset, self.new - first));
        }
        header.push_str(" @@");
        header
    }
}

/// Cuts the lines covered by a [`LineRange`] out of a changeset's hunks.
#[derive(Debug, Clone, Copy)]
pub struct ContextExtractor {
    range: LineRange,
}

impl ContextExtractor {
    #[must_use]
    pub fn new(range: LineRange) -> Self {
        Self { range }
    }

    #[must_use]
    pub fn range(&self) -> LineRange {
        self.range
    }

    /// Header plus lines of `hunk` covered by the range, or `None` when the
    /// range does not touch the hunk.
    ///
    /// Lines are kept while the commented side's position is at most the
    /// range end, so the excerpt can run a line past a partial overlap.
    #[must_use]
    pub fn excerpt(&self, hunk: &Hunk) -> Option<String> {
        let side = self.range.side;
        let span = hunk.span(side);
        let start = i64::from(self.range.start) - i64::from(span.offset);
        let end = start + i64::from(self.range.length);
        let overlaps = start < i64::from(span.len) && end >= 0;

        trace!(
            old_offset = hunk.old_span().offset,
            old_len = hunk.old_span().len,
            new_offset = hunk.new_span().offset,
            new_len = hunk.new_span().len,
            start,
            end,
            overlaps,
            "examining hunk"
        );

        if !overlaps {
            return None;
        }

        let mut cursor = Cursor::default();
        let mut lines = Vec::new();
        for line in hunk.lines() {
            let pos = cursor.position(side);
            if pos > end {
                break;
            }
            if start <= pos {
                cursor.mark(line);
                lines.push(line.to_string());
            }
            cursor.advance(line);
        }

        let mut block = cursor.header(hunk);
        block.push('\n');
        block.push_str(&lines.join("\n"));
        Some(block)
    }

    /// Excerpts of every overlapping hunk, in order, joined by newlines.
    /// Empty when no hunk overlaps.
    #[must_use]
    pub fn extract(&self, hunks: &[Hunk]) -> String {
        hunks
            .iter()
            .filter_map(|hunk| self.excerpt(hunk))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Changeset {
    /// Render the diff excerpt covering `range`.
    ///
    /// # Examples
    /// ```
    /// # use hunk_context::{Changeset, Hunk, LineRange};
    /// let changeset = Changeset::with_hunks("a.txt", vec![Hunk::new(1, 1, 0, 0, "-a").unwrap()]);
    /// let excerpt = changeset.extract_context(&LineRange::in_old(1, 0)).unwrap();
    /// assert_eq!(excerpt, "@@ -1,1 @@\n-a");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if no hunks are attached. Ranges that miss
    /// every hunk are not an error; they produce an empty string.
    pub fn extract_context(&self, range: &LineRange) -> Result<String, StateError> {
        let hunks = self.hunks()?;
        debug!(
            path = self.path(),
            side = %range.side,
            start = range.start,
            length = range.length,
            hunks = hunks.len(),
            "extracting context"
        );
        Ok(ContextExtractor::new(*range).extract(hunks))
    }
}

/// Plain-text block for an inline comment in a notification body:
///
/// ```text
/// Comment at: <path>:<range>
/// <excerpt>
///
/// <body>
/// ```
pub fn render_comment(
    changeset: &Changeset,
    range: &LineRange,
    body: &str,
) -> Result<String, StateError> {
    let excerpt = changeset.extract_context(range)?;
    Ok(format!(
        "Comment at: {}:{}\n{}\n\n{}\n",
        changeset.path(),
        range,
        excerpt,
        body
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn changeset(hunks: Vec<Hunk>) -> Changeset {
        Changeset::with_hunks("src/lib.rs", hunks)
    }

    /// 7 old / 7 new lines: one removal early, one addition at the end
    fn mixed_hunk() -> Hunk {
        Hunk::new(
            1,
            7,
            1,
            7,
            " l1\n l2\n-l3\n l4\n l5\n l6\n l7\n+l8",
        )
        .unwrap()
    }

    #[test]
    fn one_line_old_comment() {
        let change = changeset(vec![Hunk::new(1, 1, 0, 0, "-a").unwrap()]);
        let context = change.extract_context(&LineRange::in_old(1, 0)).unwrap();
        assert_eq!(context, "@@ -1,1 @@\n-a");
    }

    #[test]
    fn one_line_new_comment() {
        let change = changeset(vec![Hunk::new(0, 0, 1, 1, "+a").unwrap()]);
        let context = change.extract_context(&LineRange::in_new(1, 0)).unwrap();
        assert_eq!(context, "@@ +1,1 @@\n+a");
    }

    #[test]
    fn comment_past_hunk_yields_nothing() {
        let change = changeset(vec![Hunk::new(0, 0, 1, 1, "+a").unwrap()]);
        let context = change.extract_context(&LineRange::in_new(2, 0)).unwrap();
        assert_eq!(context, "");
    }

    #[test]
    fn range_starting_before_hunk_is_clipped_to_its_first_line() {
        let change = changeset(vec![Hunk::new(23, 2, 42, 2, " 1\n 2").unwrap()]);
        let context = change.extract_context(&LineRange::in_new(41, 1)).unwrap();
        assert_eq!(context, "@@ -23,1 +42,1 @@\n 1");
    }

    #[test]
    fn mixed_hunk_excerpt_spans_both_sides() {
        let change = changeset(vec![mixed_hunk()]);
        let context = change.extract_context(&LineRange::in_new(2, 4)).unwrap();
        insta::assert_snapshot!(context, @r"
        @@ -2,6 +2,5 @@
         l2
        -l3
         l4
         l5
         l6
         l7
        ");
    }

    #[test]
    fn old_side_range_stops_on_old_positions() {
        let change = changeset(vec![mixed_hunk()]);
        let context = change.extract_context(&LineRange::in_old(3, 0)).unwrap();
        assert_eq!(context, "@@ -3,1 @@\n-l3");
    }

    #[test]
    fn new_side_range_skips_removed_lines_before_start() {
        let change = changeset(vec![mixed_hunk()]);
        // New line 3 is " l4"; "-l3" sits at the same new position and is kept.
        let context = change.extract_context(&LineRange::in_new(3, 0)).unwrap();
        assert_eq!(context, "@@ -3,2 +3,1 @@\n-l3\n l4");
    }

    #[test]
    fn trailing_addition_is_reachable_from_new_side() {
        let change = changeset(vec![mixed_hunk()]);
        let context = change.extract_context(&LineRange::in_new(7, 0)).unwrap();
        assert_eq!(context, "@@ +7,1 @@\n+l8");
    }

    #[test]
    fn range_spanning_two_hunks_emits_two_blocks() {
        let change = changeset(vec![
            Hunk::new(1, 2, 1, 2, " a\n-b\n+B").unwrap(),
            Hunk::new(10, 1, 10, 2, " x\n+y").unwrap(),
        ]);
        let context = change.extract_context(&LineRange::in_new(2, 9)).unwrap();
        insta::assert_snapshot!(context, @r"
        @@ -2,1 +2,1 @@
        -b
        +B
        @@ -10,1 +10,2 @@
         x
        +y
        ");
    }

    #[test]
    fn range_between_hunks_yields_nothing() {
        let change = changeset(vec![
            Hunk::new(1, 1, 1, 1, " a").unwrap(),
            Hunk::new(10, 1, 10, 1, " x").unwrap(),
        ]);
        let context = change.extract_context(&LineRange::in_new(5, 2)).unwrap();
        assert_eq!(context, "");
    }

    #[test]
    fn extraction_is_idempotent() {
        let change = changeset(vec![mixed_hunk()]);
        let range = LineRange::in_new(2, 4);
        assert_eq!(
            change.extract_context(&range).unwrap(),
            change.extract_context(&range).unwrap()
        );
    }

    #[test]
    fn unattached_changeset_is_a_state_error() {
        let change = Changeset::new("src/lib.rs");
        let result = change.extract_context(&LineRange::in_new(1, 0));
        assert!(matches!(result, Err(StateError::HunksNotAttached { .. })));
    }

    #[test]
    fn attached_but_empty_changeset_yields_nothing() {
        let change = changeset(vec![]);
        let context = change.extract_context(&LineRange::in_old(1, 5)).unwrap();
        assert_eq!(context, "");
    }

    #[test]
    fn overlapping_hunk_without_lines_keeps_a_bare_header() {
        let change = changeset(vec![Hunk::new(5, 0, 5, 0, "").unwrap()]);
        let context = change.extract_context(&LineRange::in_new(4, 3)).unwrap();
        assert_eq!(context, "@@ @@\n");
    }

    #[test]
    fn excerpt_reports_misses_per_hunk() {
        let extractor = ContextExtractor::new(LineRange::in_old(50, 0));
        assert!(extractor.excerpt(&mixed_hunk()).is_none());
    }

    #[test]
    fn render_comment_block() {
        let change = changeset(vec![Hunk::new(23, 2, 42, 2, " 1\n 2").unwrap()]);
        let rendered =
            render_comment(&change, &LineRange::in_new(41, 1), "Why is this here?").unwrap();
        assert_eq!(
            rendered,
            "Comment at: src/lib.rs:41-42\n@@ -23,1 +42,1 @@\n 1\n\nWhy is this here?\n"
        );
    }
}
