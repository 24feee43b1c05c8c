use super::hunk::{DiffLine, Hunk};
use super::range::Side;
use error_set::error_set;
use std::collections::BTreeMap;
use tracing::debug;

error_set! {
    /// Changeset used before its hunks were loaded
    StateError := {
        #[display("Hunks for {path} must be loaded and attached first")]
        HunksNotAttached { path: String },
    }
}

/// The diff of a single file: its path and its hunks in file order.
///
/// Hunks come from storage and are attached explicitly; every operation that
/// reads them fails with [`StateError`] until that has happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    path: String,
    hunks: Option<Vec<Hunk>>,
}

impl Changeset {
    /// A changeset with no hunks attached yet
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hunks: None,
        }
    }

    /// A changeset with `hunks` already attached
    #[must_use]
    pub fn with_hunks(path: impl Into<String>, hunks: Vec<Hunk>) -> Self {
        Self {
            path: path.into(),
            hunks: Some(hunks),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replace the attached hunks
    pub fn attach_hunks(&mut self, hunks: Vec<Hunk>) -> &mut Self {
        self.hunks = Some(hunks);
        self
    }

    /// Append one hunk, attaching an empty list first if needed
    pub fn push_hunk(&mut self, hunk: Hunk) -> &mut Self {
        self.hunks.get_or_insert_with(Vec::new).push(hunk);
        self
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.hunks.is_some()
    }

    /// The attached hunks
    ///
    /// # Errors
    ///
    /// Returns [`StateError::HunksNotAttached`] if nothing was attached.
    pub fn hunks(&self) -> Result<&[Hunk], StateError> {
        self.hunks
            .as_deref()
            .ok_or_else(|| StateError::HunksNotAttached {
                path: self.path.clone(),
            })
    }

    /// Full text of the file before the change
    pub fn reconstruct_old_file(&self) -> Result<String, StateError> {
        self.reconstruct(Side::Old)
    }

    /// Full text of the file after the change
    pub fn reconstruct_new_file(&self) -> Result<String, StateError> {
        self.reconstruct(Side::New)
    }

    /// Every line of `side` newline-terminated, except a final line that the
    /// diff marks with "\ No newline at end of file".
    fn reconstruct(&self, side: Side) -> Result<String, StateError> {
        let hunks = self.hunks()?;
        debug!(path = %self.path, %side, hunks = hunks.len(), "reconstructing file");

        let mut file = String::new();
        for line in hunks.iter().flat_map(|hunk| hunk.side_lines(side)) {
            file.push_str(line);
            file.push('\n');
        }

        let ends_unterminated = hunks
            .iter()
            .rev()
            .find(|hunk| hunk.span(side).len > 0)
            .is_some_and(|hunk| hunk.missing_final_newline(side));
        if ends_unterminated {
            file.pop();
        }

        Ok(file)
    }

    /// Map each line of the concatenated new-side hunk text (keys 1, 2, 3, ...)
    /// to its real line number in the new file.
    ///
    /// # Examples
    /// ```
    /// # use hunk_context::{Changeset, Hunk};
    /// let changeset = Changeset::with_hunks("a.txt", vec![
    ///     Hunk::new(1, 1, 1, 1, " a").unwrap(),
    ///     Hunk::new(20, 1, 20, 2, " b\n+c").unwrap(),
    /// ]);
    /// let offsets = changeset.compute_new_file_offsets().unwrap();
    /// assert_eq!(offsets.into_iter().collect::<Vec<_>>(), vec![(1, 1), (2, 20), (3, 21)]);
    /// ```
    pub fn compute_new_file_offsets(&self) -> Result<BTreeMap<u32, u32>, StateError> {
        let mut offsets = BTreeMap::new();
        let mut n = 1;
        for hunk in self.hunks()? {
            let span = hunk.new_span();
            for i in 0..span.len {
                offsets.insert(n, span.offset + i);
                n += 1;
            }
        }
        Ok(offsets)
    }

    /// Per hunk, the lines within `context_lines` of an added or removed line.
    ///
    /// Windows that overlap are merged; windows reaching past either end of
    /// a hunk are cut off at the hunk boundary.
    pub fn windowed_changes(
        &self,
        context_lines: usize,
    ) -> Result<Vec<Vec<&DiffLine>>, StateError> {
        Ok(self
            .hunks()?
            .iter()
            .map(|hunk| window(hunk.lines(), context_lines))
            .collect())
    }

    /// [`Self::windowed_changes`] flattened across hunks, markers included
    pub fn windowed_lines(&self, context_lines: usize) -> Result<Vec<String>, StateError> {
        Ok(self
            .windowed_changes(context_lines)?
            .into_iter()
            .flatten()
            .map(ToString::to_string)
            .collect())
    }

    /// Key for ordering changesets in a file listing.
    ///
    /// Rewrites `.h` to `.!h` so that headers (`.h`, `.hpp`) sort before the
    /// implementation files sharing their stem (`.c`, `.cpp`, `.cs`).
    #[must_use]
    pub fn sort_key(&self) -> String {
        self.path.replace(".h", ".!h")
    }

    /// Number of added plus removed lines
    pub fn affected_line_count(&self) -> Result<usize, StateError> {
        Ok(self.added_line_count()? + self.removed_line_count()?)
    }

    pub fn added_line_count(&self) -> Result<usize, StateError> {
        Ok(self.hunks()?.iter().map(Hunk::added_count).sum())
    }

    pub fn removed_line_count(&self) -> Result<usize, StateError> {
        Ok(self.hunks()?.iter().map(Hunk::removed_count).sum())
    }
}

fn window(lines: &[DiffLine], context_lines: usize) -> Vec<&DiffLine> {
    let mut keep = vec![false; lines.len()];
    for (i, line) in lines.iter().enumerate() {
        if line.is_change() {
            let lo = i.saturating_sub(context_lines);
            let hi = i.saturating_add(context_lines).min(lines.len() - 1);
            keep[lo..=hi].iter_mut().for_each(|k| *k = true);
        }
    }

    lines
        .iter()
        .zip(keep)
        .filter_map(|(line, kept)| kept.then_some(line))
        .collect()
}
