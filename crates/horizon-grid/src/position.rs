//! Cell coordinates.
//!
//! A [`Position`] addresses one logical cell of the grid. Negative rows
//! address header rows: row `-1` is the first header row, `-2` the second,
//! and so on.

use std::fmt;

/// A `(row, column)` coordinate in the logical grid.
///
/// Positions are plain values: equality is component-wise and they are
/// cheap to copy. Iterators advance a position in place with
/// [`increment`](Self::increment).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// Row index; negative for header rows.
    pub row: i64,
    /// Column index.
    pub column: i64,
}

impl Position {
    /// Creates a position.
    #[inline]
    pub const fn new(row: i64, column: i64) -> Self {
        Self { row, column }
    }

    /// Creates a position from optional components, unset components
    /// reading as zero.
    pub fn from_optional(row: Option<i64>, column: Option<i64>) -> Self {
        Self {
            row: row.unwrap_or_default(),
            column: column.unwrap_or_default(),
        }
    }

    /// Returns the row index.
    #[inline]
    pub const fn row(&self) -> i64 {
        self.row
    }

    /// Returns the column index.
    #[inline]
    pub const fn column(&self) -> i64 {
        self.column
    }

    /// Returns `true` if this position addresses a header row.
    #[inline]
    pub const fn is_header(&self) -> bool {
        self.row < 0
    }

    /// Moves this position by `(d_row, d_column)` in place.
    #[inline]
    pub fn increment(&mut self, d_row: i64, d_column: i64) {
        self.row += d_row;
        self.column += d_column;
    }

    /// Returns a copy moved by `(d_row, d_column)`.
    #[inline]
    #[must_use]
    pub const fn offset(self, d_row: i64, d_column: i64) -> Self {
        Self::new(self.row + d_row, self.column + d_column)
    }
}

impl From<(i64, i64)> for Position {
    fn from((row, column): (i64, i64)) -> Self {
        Self::new(row, column)
    }
}

impl From<[i64; 2]> for Position {
    fn from([row, column]: [i64; 2]) -> Self {
        Self::new(row, column)
    }
}

impl From<(Option<i64>, Option<i64>)> for Position {
    fn from((row, column): (Option<i64>, Option<i64>)) -> Self {
        Self::from_optional(row, column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}
