//! Size hints and the size oracle contract.

use std::fmt;

use crate::column::Column;
use crate::position::Position;

/// Content size hint for one cell. `None` means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeHint {
    pub min_width: Option<i32>,
    pub width: Option<i32>,
    pub max_width: Option<i32>,
    pub min_height: Option<i32>,
    pub height: Option<i32>,
    pub max_height: Option<i32>,
}

impl SizeHint {
    /// A hint with a preferred width and height.
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            min_width: None,
            width: Some(width),
            max_width: None,
            min_height: None,
            height: Some(height),
            max_height: None,
        }
    }

    /// A hint with only a preferred height.
    pub const fn with_height(height: i32) -> Self {
        Self {
            min_width: None,
            width: None,
            max_width: None,
            min_height: None,
            height: Some(height),
            max_height: None,
        }
    }

    /// The preferred height clamped to this hint's own bounds.
    pub fn resolved_height(&self) -> i32 {
        let mut height = self.height.unwrap_or(0);
        if let Some(min) = self.min_height {
            height = height.max(min);
        }
        if let Some(max) = self.max_height {
            height = height.min(max);
        }
        height
    }
}

/// Supplies content sizes and the data extent to the geometry engine.
pub trait SizeOracle: Send + Sync {
    /// Size hint for the cell at `row` (negative for header rows) in `column`.
    fn widget_size(&self, row: i64, column: &Column) -> SizeHint;

    /// Total `(rows, columns)` of the data source.
    fn data_source_size(&self) -> Position;
}

/// A [`SizeOracle`] built from closures.
pub struct FnSizeOracle<S, D> {
    size: S,
    extent: D,
}

impl<S, D> FnSizeOracle<S, D>
where
    S: Fn(i64, &Column) -> SizeHint + Send + Sync,
    D: Fn() -> Position + Send + Sync,
{
    /// Creates an oracle answering hints with `size` and the extent with
    /// `extent`.
    pub fn new(size: S, extent: D) -> Self {
        Self { size, extent }
    }
}

impl<S, D> SizeOracle for FnSizeOracle<S, D>
where
    S: Fn(i64, &Column) -> SizeHint + Send + Sync,
    D: Fn() -> Position + Send + Sync,
{
    fn widget_size(&self, row: i64, column: &Column) -> SizeHint {
        (self.size)(row, column)
    }

    fn data_source_size(&self) -> Position {
        (self.extent)()
    }
}

impl<S, D> fmt::Debug for FnSizeOracle<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSizeOracle").finish_non_exhaustive()
    }
}
