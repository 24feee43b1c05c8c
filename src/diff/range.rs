use std::fmt;

/// Which file of a diff a line number refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The file before the change
    Old,
    /// The file after the change
    New,
}

impl Side {
    /// Map an "anchored to the new file" flag onto a side
    #[must_use]
    pub fn from_is_new_file(is_new_file: bool) -> Self {
        if is_new_file { Side::New } else { Side::Old }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => f.write_str("old"),
            Side::New => f.write_str("new"),
        }
    }
}

/// A span of lines on one side of a diff, as anchored by an inline comment.
///
/// `start` is 1-based. `length` counts the lines *after* `start`, so a
/// single-line comment has `length == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    pub side: Side,
    pub start: u32,
    pub length: u32,
}

impl LineRange {
    #[must_use]
    pub fn new(side: Side, start: u32, length: u32) -> Self {
        Self {
            side,
            start,
            length,
        }
    }

    /// Range anchored to the old file
    #[must_use]
    pub fn in_old(start: u32, length: u32) -> Self {
        Self::new(Side::Old, start, length)
    }

    /// Range anchored to the new file
    #[must_use]
    pub fn in_new(start: u32, length: u32) -> Self {
        Self::new(Side::New, start, length)
    }

    /// Last line covered by the range (inclusive)
    #[must_use]
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }
}

/// Renders `start` for single lines and `start-end` otherwise.
impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.length == 0 {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_range_renders_start_only() {
        assert_eq!(LineRange::in_new(41, 0).to_string(), "41");
    }

    #[test]
    fn multi_line_range_renders_inclusive_end() {
        let range = LineRange::in_old(10, 4);
        assert_eq!(range.end(), 14);
        assert_eq!(range.to_string(), "10-14");
    }

    #[test]
    fn side_from_new_file_flag() {
        assert_eq!(Side::from_is_new_file(true), Side::New);
        assert_eq!(Side::from_is_new_file(false), Side::Old);
    }
}
