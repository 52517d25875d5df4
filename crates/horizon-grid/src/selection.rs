//! Current cell and selected range, and their highlight rectangles.

use std::fmt;

use horizon_grid_core::{Property, Signal};

use crate::geometry::{CellRect, GridSizes};
use crate::layers::ScrollOffsets;
use crate::position::Position;
use crate::range::{Range, RangeHolder};

/// Selection state of a grid.
///
/// The selected range lives in a [`RangeHolder`] so layers can keep a
/// reference to it and listen for changes.
pub struct Selection {
    current: Property<Option<Position>>,
    range: RangeHolder,
    /// Emitted with the new current cell after it changed.
    pub current_changed: Signal<Option<Position>>,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    pub fn new() -> Self {
        Self {
            current: Property::new(None),
            range: RangeHolder::new(Range::cell((0, 0))),
            current_changed: Signal::new(),
        }
    }

    /// The focused cell.
    pub fn current(&self) -> Option<Position> {
        self.current.get()
    }

    /// The selected range holder.
    pub fn range(&self) -> &RangeHolder {
        &self.range
    }

    /// Focuses `position` and collapses the selection onto it.
    pub fn set_current(&self, position: Option<Position>) {
        if self.current.set(position) {
            self.current_changed.emit(position);
        }
        if let Some(position) = position {
            self.range.set(Range::cell(position));
        }
    }

    /// Extends the selection from its anchor (the current cell) to
    /// `position`, leaving the current cell in place.
    pub fn extend_to(&self, position: Position) {
        let anchor = self.current().unwrap_or(position);
        self.range.set(Range::new(anchor, position));
    }

    /// Highlight rectangles of the visible part of the selection, one per
    /// visible row, each spanning the contiguous run of visible selected
    /// columns.
    pub fn highlight_rects(&self, sizes: &GridSizes, offsets: ScrollOffsets) -> Vec<CellRect> {
        if self.current().is_none() {
            return Vec::new();
        }
        let range = self.range.get();
        let mut rects = Vec::new();
        for row in sizes.rows.iter().filter(|r| r.index >= 0) {
            let mut run: Option<CellRect> = None;
            for column in &sizes.columns {
                let selected = range.contains((row.index, column.index as i64));
                let rect = selected
                    .then(|| sizes.viewport_rect(row.index, column.index, offsets.left, offsets.top))
                    .flatten();
                match (rect, run) {
                    (Some(rect), Some(current)) => run = Some(current.union(rect)),
                    (Some(rect), None) => run = Some(rect),
                    (None, Some(current)) => {
                        rects.push(current);
                        run = None;
                    }
                    (None, None) => {}
                }
            }
            rects.extend(run);
        }
        rects
    }

    /// Rectangle of the focused cell, if it is visible.
    pub fn focus_rect(&self, sizes: &GridSizes, offsets: ScrollOffsets) -> Option<CellRect> {
        let current = self.current()?;
        let column = usize::try_from(current.column).ok()?;
        sizes.viewport_rect(current.row, column, offsets.left, offsets.top)
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("current", &self.current())
            .field("range", &self.range.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, ColumnCollection};
    use crate::geometry::{Anchor, GridGeometry};
    use crate::size::{FnSizeOracle, SizeHint, SizeOracle};
    use crate::styling::Styling;
    use std::sync::Arc;

    fn sizes() -> Arc<GridSizes> {
        let columns = ColumnCollection::new();
        for i in 0..4 {
            columns
                .add(Arc::new(Column::new(format!("c{i}")).with_width(10)))
                .unwrap();
        }
        let oracle: Arc<dyn SizeOracle> = Arc::new(FnSizeOracle::new(
            |_row, _column: &Column| SizeHint::with_height(5),
            || Position::new(10, 4),
        ));
        let geometry = GridGeometry::new(Arc::new(columns), Arc::new(Styling::new()), oracle);
        geometry.set_available_size(40, 20, Anchor::Start(0), Anchor::Start(0), 0, 0);
        geometry.sizes().unwrap()
    }

    #[test]
    fn test_set_current_collapses_range() {
        let selection = Selection::new();
        selection.set_current(Some(Position::new(2, 1)));
        assert_eq!(selection.range().get(), Range::cell((2, 1)));

        selection.extend_to(Position::new(0, 3));
        assert_eq!(selection.range().get(), Range::new((0, 1), (2, 3)));
        assert_eq!(selection.current(), Some(Position::new(2, 1)));
    }

    #[test]
    fn test_highlight_rects_clip_to_window() {
        let sizes = sizes();
        let selection = Selection::new();
        selection.set_current(Some(Position::new(1, 1)));
        selection.extend_to(Position::new(20, 2));

        let rects = selection.highlight_rects(&sizes, ScrollOffsets::default());
        // Rows 1..=4 of the 0..=4 window, columns 1..=2.
        assert_eq!(
            rects,
            vec![
                CellRect::new(10, 5, 20, 5),
                CellRect::new(10, 10, 20, 5),
                CellRect::new(10, 15, 20, 5),
                CellRect::new(10, 20, 20, 5),
            ]
        );
    }

    #[test]
    fn test_focus_rect() {
        let sizes = sizes();
        let selection = Selection::new();
        assert!(selection.focus_rect(&sizes, ScrollOffsets::default()).is_none());

        selection.set_current(Some(Position::new(0, 3)));
        assert_eq!(
            selection.focus_rect(&sizes, ScrollOffsets::default()),
            Some(CellRect::new(30, 0, 10, 5))
        );
        selection.set_current(Some(Position::new(9, 0)));
        assert!(selection.focus_rect(&sizes, ScrollOffsets::default()).is_none());
    }
}
