pub mod changeset;
pub mod context;
pub mod hunk;
pub mod range;

pub use changeset::{Changeset, StateError};
pub use context::{ContextExtractor, render_comment};
pub use hunk::{DiffLine, Hunk, HunkHeader, MalformedHunkError, Span};
pub use range::{LineRange, Side};

/// Format a changeset's windowed changes for display, one hunk per block.
///
/// Hunks without any change inside the window are skipped.
pub fn format_windowed(
    changeset: &Changeset,
    context_lines: usize,
) -> Result<String, StateError> {
    let mut result = String::new();

    for lines in changeset.windowed_changes(context_lines)? {
        if lines.is_empty() {
            continue;
        }
        if !result.is_empty() {
            result.push('\n');
        }
        for line in lines {
            result.push_str(&line.to_string());
            result.push('\n');
        }
    }

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn format_windowed_separates_hunks() {
        let changeset = Changeset::with_hunks(
            "gtk.nix",
            vec![
                Hunk::new(8, 4, 8, 4, " 8\n 9\n-10\n+ten\n 11").unwrap(),
                Hunk::new(20, 2, 20, 3, " 20\n+20.5\n 21").unwrap(),
            ],
        );
        let formatted = format_windowed(&changeset, 1).unwrap();
        assert_eq!(formatted, " 9\n-10\n+ten\n 11\n\n 20\n+20.5\n 21\n");
    }
}
