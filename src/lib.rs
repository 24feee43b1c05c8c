use error_set::error_set;
use std::io::Read;
use std::path::Path;

mod diff;
pub mod parse;

pub use diff::{
    Changeset, ContextExtractor, DiffLine, Hunk, HunkHeader, LineRange, MalformedHunkError, Side,
    Span, StateError, format_windowed, render_comment,
};
pub use parse::{CommentRef, ParseError};

error_set! {
    /// Top-level error for hunk-context operations
    HunkContextError := {
        ParseError(ParseError),
        StateError(StateError),
        MalformedHunkError(MalformedHunkError),
    } || InputError

    /// Errors reading diff text
    InputError := {
        #[display("Failed to read diff from {origin}: {message}")]
        ReadFailed { origin: String, message: String },
        #[display("Comment refers to {requested} but the diff is for {actual}")]
        PathMismatch { requested: String, actual: String },
    }
}

/// Read a single-file unified diff from `path`, or from stdin when `None`,
/// and parse it into a changeset with its hunks attached.
///
/// # Examples
/// ```no_run
/// # use hunk_context::read_changeset;
/// # use std::path::Path;
/// let changeset = read_changeset(Some(Path::new("change.diff"))).unwrap();
/// println!("{}", changeset.reconstruct_new_file().unwrap());
/// ```
pub fn read_changeset(path: Option<&Path>) -> Result<Changeset, HunkContextError> {
    let text = match path {
        Some(path) => {
            std::fs::read_to_string(path).map_err(|e| InputError::ReadFailed {
                origin: path.display().to_string(),
                message: e.to_string(),
            })?
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| InputError::ReadFailed {
                    origin: "stdin".to_string(),
                    message: e.to_string(),
                })?;
            text
        }
    };

    Ok(parse::parse_changeset(&text)?)
}

/// Diff excerpt for a comment given as `FILE:REFS`.
///
/// # Examples
/// ```
/// # use hunk_context::{Changeset, Hunk, context_excerpt};
/// let changeset = Changeset::with_hunks("a.txt", vec![Hunk::new(0, 0, 1, 1, "+a").unwrap()]);
/// assert_eq!(context_excerpt(&changeset, "a.txt:1").unwrap(), "@@ +1,1 @@\n+a");
/// ```
///
/// # Errors
///
/// Fails if the reference does not parse, names a different file than the
/// changeset, or the changeset has no hunks attached.
pub fn context_excerpt(
    changeset: &Changeset,
    comment_ref: &str,
) -> Result<String, HunkContextError> {
    let range = resolve_ref(changeset, comment_ref)?;
    Ok(changeset.extract_context(&range)?)
}

/// Render the notification block for a comment given as `FILE:REFS`.
///
/// The file named in the reference must be the changeset's file.
///
/// # Examples
/// ```
/// # use hunk_context::{Changeset, Hunk, comment_block};
/// let changeset = Changeset::with_hunks("a.txt", vec![Hunk::new(0, 0, 1, 1, "+a").unwrap()]);
/// let block = comment_block(&changeset, "a.txt:1", "nit").unwrap();
/// assert_eq!(block, "Comment at: a.txt:1\n@@ +1,1 @@\n+a\n\nnit\n");
/// ```
pub fn comment_block(
    changeset: &Changeset,
    comment_ref: &str,
    body: &str,
) -> Result<String, HunkContextError> {
    let range = resolve_ref(changeset, comment_ref)?;
    Ok(render_comment(changeset, &range, body)?)
}

/// Parse `comment_ref` and check that it points into `changeset`'s file
fn resolve_ref(changeset: &Changeset, comment_ref: &str) -> Result<LineRange, HunkContextError> {
    let comment = parse::parse_comment_ref(comment_ref)?;
    if comment.file != changeset.path() {
        return Err(InputError::PathMismatch {
            requested: comment.file,
            actual: changeset.path().to_string(),
        }
        .into());
    }
    Ok(comment.range)
}
