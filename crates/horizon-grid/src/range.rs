//! Rectangular cell ranges.
//!
//! A [`Range`] is an inclusive rectangle of [`Position`]s. It is an
//! immutable `Copy` value; a long-lived "range whose contents change" is a
//! [`RangeHolder`], which swaps in a new value and emits `changed` so that
//! listeners keep a stable reference to the holder rather than aliasing a
//! mutable range.
//!
//! # Normalization
//!
//! [`Range::new`] orders the endpoints component-wise, so
//! `start.row <= end.row` and `start.column <= end.column` always hold and
//! every iteration is well defined. An inverted pair of corners therefore
//! describes the same rectangle as its normalized form.

use std::fmt;

use horizon_grid_core::{Property, Signal};

use crate::position::Position;

/// An inclusive rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: Position,
    end: Position,
}

impl Range {
    /// Creates a range from two corners, normalizing their order.
    pub fn new(start: impl Into<Position>, end: impl Into<Position>) -> Self {
        let a = start.into();
        let b = end.into();
        Self {
            start: Position::new(a.row.min(b.row), a.column.min(b.column)),
            end: Position::new(a.row.max(b.row), a.column.max(b.column)),
        }
    }

    /// Creates a single-cell range.
    pub fn cell(pos: impl Into<Position>) -> Self {
        let pos = pos.into();
        Self {
            start: pos,
            end: pos,
        }
    }

    /// The top-left corner.
    #[inline]
    pub const fn start(&self) -> Position {
        self.start
    }

    /// The bottom-right corner.
    #[inline]
    pub const fn end(&self) -> Position {
        self.end
    }

    /// Number of rows covered.
    pub const fn row_count(&self) -> u64 {
        (self.end.row - self.start.row) as u64 + 1
    }

    /// Number of columns covered.
    pub const fn column_count(&self) -> u64 {
        (self.end.column - self.start.column) as u64 + 1
    }

    /// Number of cells covered.
    pub const fn cell_count(&self) -> u64 {
        self.row_count() * self.column_count()
    }

    /// Returns `true` if `pos` lies inside this range (inclusive bounds).
    pub fn contains(&self, pos: impl Into<Position>) -> bool {
        let pos = pos.into();
        pos.row >= self.start.row
            && pos.row <= self.end.row
            && pos.column >= self.start.column
            && pos.column <= self.end.column
    }

    /// Returns `true` if this range is a superset of `other`.
    ///
    /// Data sources use this to skip fetching a range that an earlier fetch
    /// already covers.
    pub fn eclipses(&self, other: &Range) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    /// Returns `true` if the two ranges share at least one cell.
    pub fn intersects(&self, other: &Range) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.column <= other.end.column
            && other.start.column <= self.end.column
    }

    /// Returns the overlapping part of two ranges, if any.
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if !self.intersects(other) {
            return None;
        }
        Some(Range::new(
            (
                self.start.row.max(other.start.row),
                self.start.column.max(other.start.column),
            ),
            (
                self.end.row.min(other.end.row),
                self.end.column.min(other.end.column),
            ),
        ))
    }

    /// Iterates every cell in row-major order from `start` to `end`.
    ///
    /// The iterator is lazy and finite; calling `iter` again restarts from
    /// the first cell.
    pub fn iter(&self) -> RangeIter {
        RangeIter {
            range: *self,
            next: Some(self.start),
        }
    }

    /// Iterates every cell in row-major order, skipping cells inside
    /// `excluded`.
    pub fn iter_except(&self, excluded: Range) -> impl Iterator<Item = Position> + use<> {
        self.iter().filter(move |pos| !excluded.contains(*pos))
    }

    /// Iterates one cell per row of this range, all in `column`.
    ///
    /// Used to prefetch the row-identifying column alongside a window.
    pub fn iter_column(&self, column: i64) -> impl Iterator<Item = Position> + use<> {
        (self.start.row..=self.end.row).map(move |row| Position::new(row, column))
    }
}

impl IntoIterator for Range {
    type Item = Position;
    type IntoIter = RangeIter;

    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

impl IntoIterator for &Range {
    type Item = Position;
    type IntoIter = RangeIter;

    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.start, self.end)
    }
}

/// Row-major iterator over a [`Range`].
#[derive(Debug, Clone)]
pub struct RangeIter {
    range: Range,
    next: Option<Position>,
}

impl Iterator for RangeIter {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        let current = self.next?;
        let mut following = current;
        following.increment(0, 1);
        if following.column > self.range.end.column {
            following = Position::new(following.row + 1, self.range.start.column);
        }
        self.next = (following.row <= self.range.end.row).then_some(following);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            None => 0,
            Some(pos) => {
                let full_rows = (self.range.end.row - pos.row) as u64 * self.range.column_count();
                let this_row = (self.range.end.column - pos.column) as u64 + 1;
                full_rows + this_row
            }
        };
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// A long-lived holder of a [`Range`] that notifies when its contents change.
///
/// Consumers keep a reference to the holder; setters swap the held value and
/// emit `changed` with the new range, only when it actually differs.
pub struct RangeHolder {
    range: Property<Range>,
    /// Emitted with the new range after it changes.
    pub changed: Signal<Range>,
}

impl RangeHolder {
    /// Creates a holder around `range`.
    pub fn new(range: Range) -> Self {
        Self {
            range: Property::new(range),
            changed: Signal::new(),
        }
    }

    /// The current range.
    pub fn get(&self) -> Range {
        self.range.get()
    }

    /// Replaces the whole range.
    pub fn set(&self, range: Range) {
        if self.range.set(range) {
            self.changed.emit(range);
        }
    }

    /// Moves the start corner, keeping the end corner.
    pub fn set_start(&self, start: impl Into<Position>) {
        let end = self.get().end();
        self.set(Range::new(start, end));
    }

    /// Moves the end corner, keeping the start corner.
    pub fn set_end(&self, end: impl Into<Position>) {
        let start = self.get().start();
        self.set(Range::new(start, end));
    }
}

impl fmt::Debug for RangeHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeHolder")
            .field("range", &self.get())
            .finish()
    }
}
