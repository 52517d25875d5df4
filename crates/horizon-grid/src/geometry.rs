//! The grid geometry engine.
//!
//! [`GridGeometry`] decides which rows and columns of a virtually unbounded
//! grid are on screen and how large each of them is. The result, a
//! [`GridSizes`], is computed lazily and cached until one of its inputs
//! changes: the column collection, the styling record, the viewport size or
//! the scroll anchors.
//!
//! # Column pass
//!
//! The first `num_fixed_columns` columns are always laid out. Scrollable
//! columns follow, starting at the column anchor and moving forward, or
//! moving backward from the last column for [`Anchor::End`]. Each column adds
//! `width + horizontal_spacing` to the running total; the pass stops once the
//! total exceeds the viewport width, keeping the column that overflowed so
//! the right edge is always covered.
//!
//! Flexible columns (see [`Column::is_flexible`]) count their minimum width
//! during the pass, then share the remaining width by flex weight. The last
//! flexible column absorbs the rounding remainder.
//!
//! # Row pass
//!
//! Header rows (`-1, -2, ...`) and fixed rows come first, then scrollable
//! rows from the row anchor, accumulated the same way against the viewport
//! height. A row is as tall as its tallest visible cell, bounded by the
//! styling's row height limits.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use horizon_grid_core::logging::targets;
use horizon_grid_core::{Cached, ConnectionGuard, PerfSpan, Signal};
use parking_lot::Mutex;

use crate::column::{Column, ColumnCollection};
use crate::position::Position;
use crate::range::Range;
use crate::size::SizeOracle;
use crate::styling::Styling;

/// Where the scrollable part of an axis starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// The first scrollable item shown is this index.
    Start(usize),
    /// The window ends at the last item.
    End,
}

impl Anchor {
    /// Converts a signed start index, where any negative value anchors at
    /// the end.
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index).map_or(Anchor::End, Anchor::Start)
    }

    /// The signed form of this anchor; `End` is `-1`.
    pub fn to_index(self) -> i64 {
        match self {
            Anchor::Start(index) => index as i64,
            Anchor::End => -1,
        }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::Start(0)
    }
}

/// A visible column and its resolved width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSize {
    pub index: usize,
    pub width: i32,
}

/// A visible row and its resolved height. Header rows have negative indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSize {
    pub index: i64,
    pub height: i32,
}

/// A pixel rectangle relative to the top-left corner of the grid viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CellRect {
    /// Creates a rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shifts the rectangle by `(dx, dy)`.
    #[must_use]
    pub const fn translated(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// The smallest rectangle containing both.
    #[must_use]
    pub fn union(self, other: CellRect) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Self::new(x, y, right - x, bottom - y)
    }
}

/// The visible window computed by [`GridGeometry`].
///
/// Columns are listed fixed columns first, then scrolled columns, each group
/// in index order. Rows are listed header rows first, then fixed rows, then
/// scrolled rows. Pixel offsets are cumulative in list order, with the
/// styling's spacing between adjacent entries. They are resolved once, so
/// per-cell lookups do not walk the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSizes {
    pub columns: Vec<ColumnSize>,
    pub rows: Vec<RowSize>,
    vertical_spacing: i32,
    fixed_columns: usize,
    leading_rows: usize,
    column_slots: HashMap<usize, Slot>,
    row_slots: HashMap<i64, Slot>,
    total_width: i32,
}

/// Placement of one visible column or row along its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    start: i32,
    size: i32,
    scrolled: bool,
}

/// Resolves the start offset of every entry, keyed by item index.
fn slots<K: std::hash::Hash + Eq>(
    entries: impl Iterator<Item = (K, i32)>,
    spacing: i32,
    leading: usize,
) -> HashMap<K, Slot> {
    let mut start = 0;
    entries
        .enumerate()
        .map(|(order, (key, size))| {
            let slot = Slot {
                start,
                size,
                scrolled: order >= leading,
            };
            start += size + spacing;
            (key, slot)
        })
        .collect()
}

impl GridSizes {
    fn new(
        columns: Vec<ColumnSize>,
        rows: Vec<RowSize>,
        horizontal_spacing: i32,
        vertical_spacing: i32,
        fixed_columns: usize,
        leading_rows: usize,
    ) -> Self {
        let column_slots = slots(
            columns.iter().map(|c| (c.index, c.width)),
            horizontal_spacing,
            fixed_columns,
        );
        let row_slots = slots(
            rows.iter().map(|r| (r.index, r.height)),
            vertical_spacing,
            leading_rows,
        );
        let total_width = extent(columns.iter().map(|c| c.width), horizontal_spacing);
        Self {
            columns,
            rows,
            vertical_spacing,
            fixed_columns,
            leading_rows,
            column_slots,
            row_slots,
            total_width,
        }
    }

    /// Indices of the visible columns in display order.
    pub fn column_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().map(|c| c.index)
    }

    /// Indices of the visible rows in display order.
    pub fn row_indices(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.iter().map(|r| r.index)
    }

    /// Widths of the visible columns in display order.
    pub fn column_widths(&self) -> Vec<i32> {
        self.columns.iter().map(|c| c.width).collect()
    }

    /// Heights of the visible rows in display order.
    pub fn row_heights(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.height).collect()
    }

    /// Whether the cell `(row, column)` is part of the window.
    pub fn contains(&self, row: i64, column: usize) -> bool {
        self.has_row(row) && self.has_column(column)
    }

    /// Whether `row` is part of the window.
    pub fn has_row(&self, row: i64) -> bool {
        self.row_slots.contains_key(&row)
    }

    /// Whether `column` is part of the window.
    pub fn has_column(&self, column: usize) -> bool {
        self.column_slots.contains_key(&column)
    }

    /// Resolved width of a visible column.
    pub fn column_width(&self, column: usize) -> Option<i32> {
        self.column_slots.get(&column).map(|slot| slot.size)
    }

    /// Resolved height of a visible row.
    pub fn row_height(&self, row: i64) -> Option<i32> {
        self.row_slots.get(&row).map(|slot| slot.size)
    }

    /// Left edge of a visible column.
    pub fn column_left(&self, column: usize) -> Option<i32> {
        self.column_slots.get(&column).map(|slot| slot.start)
    }

    /// Top edge of a visible row.
    pub fn row_top(&self, row: i64) -> Option<i32> {
        self.row_slots.get(&row).map(|slot| slot.start)
    }

    /// Width covered by all visible columns, including the spacing between
    /// them.
    pub fn total_width(&self) -> i32 {
        self.total_width
    }

    /// Height covered by all visible rows, including the spacing between
    /// them.
    pub fn total_height(&self) -> i32 {
        extent(self.rows.iter().map(|r| r.height), self.vertical_spacing)
    }

    /// The fixed columns.
    pub fn fixed_columns(&self) -> &[ColumnSize] {
        &self.columns[..self.fixed_columns]
    }

    /// The scrolled columns.
    pub fn scroll_columns(&self) -> &[ColumnSize] {
        &self.columns[self.fixed_columns..]
    }

    /// The header and fixed rows.
    pub fn leading_rows(&self) -> &[RowSize] {
        &self.rows[..self.leading_rows]
    }

    /// The scrolled rows.
    pub fn scroll_rows(&self) -> &[RowSize] {
        &self.rows[self.leading_rows..]
    }

    /// First scrolled column index.
    pub fn first_scroll_column(&self) -> Option<usize> {
        self.scroll_columns().first().map(|c| c.index)
    }

    /// Last scrolled column index.
    pub fn last_scroll_column(&self) -> Option<usize> {
        self.scroll_columns().last().map(|c| c.index)
    }

    /// First scrolled row index.
    pub fn first_scroll_row(&self) -> Option<i64> {
        self.scroll_rows().first().map(|r| r.index)
    }

    /// Last scrolled row index.
    pub fn last_scroll_row(&self) -> Option<i64> {
        self.scroll_rows().last().map(|r| r.index)
    }

    /// Pixel rectangle of a visible cell.
    pub fn cell_rect(&self, row: i64, column: usize) -> Option<CellRect> {
        let column = self.column_slots.get(&column)?;
        let row = self.row_slots.get(&row)?;
        Some(CellRect::new(column.start, row.start, column.size, row.size))
    }

    /// Pixel rectangle spanning a whole visible row.
    pub fn row_rect(&self, row: i64) -> Option<CellRect> {
        let row = self.row_slots.get(&row)?;
        Some(CellRect::new(0, row.start, self.total_width, row.size))
    }

    /// Rectangle of a visible cell as shown in the viewport.
    ///
    /// Scrolled columns shift left by `left_offset` and scrolled rows shift
    /// up by `top_offset`; fixed columns and leading rows stay put.
    pub fn viewport_rect(
        &self,
        row: i64,
        column: usize,
        left_offset: i32,
        top_offset: i32,
    ) -> Option<CellRect> {
        let rect = self.cell_rect(row, column)?;
        Some(rect.translated(
            self.column_shift(column, left_offset),
            self.row_shift(row, top_offset),
        ))
    }

    /// Rectangle of a whole visible row as shown in the viewport.
    pub fn viewport_row_rect(&self, row: i64, top_offset: i32) -> Option<CellRect> {
        let rect = self.row_rect(row)?;
        Some(rect.translated(0, self.row_shift(row, top_offset)))
    }

    fn column_shift(&self, column: usize, left_offset: i32) -> i32 {
        match self.column_slots.get(&column) {
            Some(slot) if slot.scrolled => -left_offset,
            _ => 0,
        }
    }

    fn row_shift(&self, row: i64, top_offset: i32) -> i32 {
        match self.row_slots.get(&row) {
            Some(slot) if slot.scrolled => -top_offset,
            _ => 0,
        }
    }

    /// The bounding range of the visible data cells (header rows excluded).
    pub fn data_range(&self) -> Option<Range> {
        let rows = self.rows.iter().map(|r| r.index).filter(|&r| r >= 0);
        let (min_row, max_row) = min_max(rows)?;
        let (min_column, max_column) = min_max(self.columns.iter().map(|c| c.index as i64))?;
        Some(Range::new((min_row, min_column), (max_row, max_column)))
    }

    /// Every visible cell position, rows in display order.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.rows.iter().flat_map(move |row| {
            self.columns
                .iter()
                .map(move |column| Position::new(row.index, column.index as i64))
        })
    }
}

fn extent(sizes: impl Iterator<Item = i32>, spacing: i32) -> i32 {
    let mut total = 0;
    let mut count = 0;
    for size in sizes {
        total += size;
        count += 1;
    }
    if count > 1 {
        total += spacing * (count - 1);
    }
    total
}

fn min_max(values: impl Iterator<Item = i64>) -> Option<(i64, i64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Viewport {
    width: Option<i32>,
    height: Option<i32>,
    start_row: Anchor,
    start_column: Anchor,
    left_offset: i32,
    top_offset: i32,
}

impl Viewport {
    fn key(&self) -> (Option<i32>, Option<i32>, Anchor, Anchor) {
        (self.width, self.height, self.start_row, self.start_column)
    }
}

/// Computes and caches the visible window of the grid.
///
/// The engine subscribes to its column collection and styling record; any
/// change from either marks the cached [`GridSizes`] dirty and emits
/// [`invalidated`](Self::invalidated). Recomputation happens on the next
/// call to [`sizes`](Self::sizes), never inline.
pub struct GridGeometry {
    columns: Arc<ColumnCollection>,
    styling: Arc<Styling>,
    oracle: Arc<dyn SizeOracle>,
    viewport: Mutex<Viewport>,
    sizes: Cached<GridSizes>,
    invalidated: Arc<Signal<()>>,
    _subscriptions: Vec<ConnectionGuard>,
}

impl GridGeometry {
    /// Creates an engine over the given inputs. No sizes are available until
    /// [`set_available_size`](Self::set_available_size) supplies a viewport.
    pub fn new(
        columns: Arc<ColumnCollection>,
        styling: Arc<Styling>,
        oracle: Arc<dyn SizeOracle>,
    ) -> Self {
        let sizes = Cached::new();
        let invalidated = Arc::new(Signal::new());

        let on_styling = {
            let invalidator = sizes.invalidator();
            let invalidated = invalidated.clone();
            styling.changed.connect_scoped(move |property| {
                if invalidator.invalidate() {
                    tracing::trace!(target: targets::GEOMETRY, ?property, "styling changed");
                    invalidated.emit(());
                }
            })
        };
        let on_columns = {
            let invalidator = sizes.invalidator();
            let invalidated = invalidated.clone();
            columns.changed().connect_scoped(move |change| {
                if invalidator.invalidate() {
                    tracing::trace!(target: targets::GEOMETRY, kind = ?change.kind, "columns changed");
                    invalidated.emit(());
                }
            })
        };

        Self {
            columns,
            styling,
            oracle,
            viewport: Mutex::new(Viewport::default()),
            sizes,
            invalidated,
            _subscriptions: vec![on_styling, on_columns],
        }
    }

    /// The column collection laid out by this engine.
    pub fn columns(&self) -> &Arc<ColumnCollection> {
        &self.columns
    }

    /// The styling record used by this engine.
    pub fn styling(&self) -> &Arc<Styling> {
        &self.styling
    }

    /// The size oracle used by this engine.
    pub fn oracle(&self) -> &Arc<dyn SizeOracle> {
        &self.oracle
    }

    /// Emitted when the cached sizes go from valid to dirty.
    pub fn invalidated(&self) -> &Signal<()> {
        &self.invalidated
    }

    /// Records the viewport and scroll anchors.
    ///
    /// Returns `true` if the window has to be recomputed, which is the case
    /// only when the size or one of the anchors differs from the previous
    /// call. The sub-cell offsets are stored but never invalidate.
    pub fn set_available_size(
        &self,
        width: i32,
        height: i32,
        start_row: Anchor,
        start_column: Anchor,
        left_offset: i32,
        top_offset: i32,
    ) -> bool {
        let next = Viewport {
            width: Some(width),
            height: Some(height),
            start_row,
            start_column,
            left_offset,
            top_offset,
        };
        let changed = {
            let mut viewport = self.viewport.lock();
            let changed = viewport.key() != next.key();
            *viewport = next;
            changed
        };
        if changed {
            tracing::debug!(
                target: targets::GEOMETRY,
                width,
                height,
                start_row = start_row.to_index(),
                start_column = start_column.to_index(),
                "viewport changed"
            );
            self.invalidate();
        }
        changed
    }

    /// Available `(width, height)`, if a viewport has been set.
    pub fn available_size(&self) -> Option<(i32, i32)> {
        let viewport = self.viewport.lock();
        Some((viewport.width?, viewport.height?))
    }

    /// Current row anchor.
    pub fn start_row(&self) -> Anchor {
        self.viewport.lock().start_row
    }

    /// Current column anchor.
    pub fn start_column(&self) -> Anchor {
        self.viewport.lock().start_column
    }

    /// Horizontal sub-cell scroll offset.
    pub fn left_offset(&self) -> i32 {
        self.viewport.lock().left_offset
    }

    /// Vertical sub-cell scroll offset.
    pub fn top_offset(&self) -> i32 {
        self.viewport.lock().top_offset
    }

    /// Marks the cached sizes dirty.
    pub fn invalidate(&self) {
        if self.sizes.invalidate() {
            self.invalidated.emit(());
        }
    }

    /// Whether the next call to [`sizes`](Self::sizes) recomputes.
    pub fn is_dirty(&self) -> bool {
        self.sizes.is_dirty()
    }

    /// The current window, or `None` while the viewport is empty or unset.
    ///
    /// Repeated calls without an intervening invalidation return the same
    /// `Arc`.
    pub fn sizes(&self) -> Option<Arc<GridSizes>> {
        self.sizes.get_or_compute(|| self.compute())
    }

    fn compute(&self) -> Option<GridSizes> {
        let viewport = *self.viewport.lock();
        let (width, height) = match (viewport.width, viewport.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return None,
        };

        let _perf = PerfSpan::new("grid_geometry.compute");
        let columns = self.columns.columns();
        let fixed_columns = (self.styling.num_fixed_columns() as usize).min(columns.len());
        let column_sizes = self.layout_columns(&columns, fixed_columns, width, viewport.start_column);
        let (row_sizes, leading_rows) =
            self.layout_rows(&columns, &column_sizes, height, viewport.start_row);

        tracing::trace!(
            target: targets::GEOMETRY,
            columns = column_sizes.len(),
            rows = row_sizes.len(),
            "window computed"
        );

        Some(GridSizes::new(
            column_sizes,
            row_sizes,
            self.styling.horizontal_spacing(),
            self.styling.vertical_spacing(),
            fixed_columns,
            leading_rows,
        ))
    }

    fn layout_columns(
        &self,
        columns: &[Arc<Column>],
        fixed: usize,
        available: i32,
        anchor: Anchor,
    ) -> Vec<ColumnSize> {
        let spacing = self.styling.horizontal_spacing();
        let mut picked: Vec<(usize, Option<i32>)> = Vec::new();
        let mut total = 0;
        let mut total_flex = 0u64;

        let mut take = |index: usize, picked: &mut Vec<(usize, Option<i32>)>| {
            let column = &columns[index];
            if column.is_flexible() {
                total_flex += u64::from(column.flex());
                total += column.min_width().unwrap_or(0) + spacing;
                picked.push((index, None));
            } else {
                let width = fixed_width(column);
                total += width + spacing;
                picked.push((index, Some(width)));
            }
            total
        };

        let mut filled = 0;
        for index in 0..fixed {
            filled = take(index, &mut picked);
        }

        let mut scrolled = Vec::new();
        match anchor {
            Anchor::Start(start) => {
                for index in start.max(fixed)..columns.len() {
                    if filled > available {
                        break;
                    }
                    filled = take(index, &mut scrolled);
                }
            }
            Anchor::End => {
                for index in (fixed..columns.len()).rev() {
                    if filled > available {
                        break;
                    }
                    filled = take(index, &mut scrolled);
                }
                scrolled.reverse();
            }
        }
        picked.extend(scrolled);

        distribute_flex(columns, &mut picked, available, spacing, total_flex)
    }

    fn layout_rows(
        &self,
        columns: &[Arc<Column>],
        visible: &[ColumnSize],
        available: i32,
        anchor: Anchor,
    ) -> (Vec<RowSize>, usize) {
        let spacing = self.styling.vertical_spacing();
        let data_rows = self.oracle.data_source_size().row.max(0);
        let fixed_rows = i64::from(self.styling.num_fixed_rows()).min(data_rows);
        let header_rows = i64::from(self.styling.num_header_rows());

        let mut rows = Vec::new();
        let mut filled = 0;
        let mut push = |index: i64, rows: &mut Vec<RowSize>| {
            let height = self.row_height(index, columns, visible);
            filled += height + spacing;
            rows.push(RowSize { index, height });
            filled
        };

        let mut total = 0;
        for index in (1..=header_rows).map(|n| -n) {
            total = push(index, &mut rows);
        }
        for index in 0..fixed_rows {
            total = push(index, &mut rows);
        }
        let leading = rows.len();

        let mut scrolled = Vec::new();
        match anchor {
            Anchor::Start(start) => {
                let start = (start as i64).max(fixed_rows);
                for index in start..data_rows {
                    if total > available {
                        break;
                    }
                    total = push(index, &mut scrolled);
                }
            }
            Anchor::End => {
                for index in (fixed_rows..data_rows).rev() {
                    if total > available {
                        break;
                    }
                    total = push(index, &mut scrolled);
                }
                scrolled.reverse();
            }
        }
        rows.extend(scrolled);
        (rows, leading)
    }

    fn row_height(&self, row: i64, columns: &[Arc<Column>], visible: &[ColumnSize]) -> i32 {
        let max_row_height = self.styling.max_row_height();
        let mut height = 0;
        for entry in visible {
            let hint = self.oracle.widget_size(row, &columns[entry.index]);
            let cell = hint.resolved_height();
            if let Some(max) = max_row_height
                && cell >= max
            {
                height = max;
                break;
            }
            height = height.max(cell);
        }
        self.styling.clamp_row_height(height)
    }
}

/// Width of a non-flexible column: its explicit width raised to its minimum
/// and capped by its maximum.
fn fixed_width(column: &Column) -> i32 {
    let width = column.width().unwrap_or(0).max(column.min_width().unwrap_or(0));
    match column.max_width() {
        Some(max) => width.min(max),
        None => width,
    }
}

fn distribute_flex(
    columns: &[Arc<Column>],
    picked: &mut [(usize, Option<i32>)],
    available: i32,
    spacing: i32,
    total_flex: u64,
) -> Vec<ColumnSize> {
    if total_flex > 0 {
        let fixed_total: i32 = picked.iter().filter_map(|&(_, width)| width).sum();
        let spacing_total = spacing * picked.len() as i32;
        let remaining = (available - fixed_total - spacing_total).max(0);

        let flexible: Vec<usize> = picked
            .iter()
            .enumerate()
            .filter(|(_, (_, width))| width.is_none())
            .map(|(slot, _)| slot)
            .collect();
        let mut assigned = 0;
        for (n, &slot) in flexible.iter().enumerate() {
            let column = &columns[picked[slot].0];
            let share = if n + 1 == flexible.len() {
                remaining - assigned
            } else {
                (i64::from(remaining) * i64::from(column.flex()) / total_flex as i64) as i32
            };
            let mut width = share.max(column.min_width().unwrap_or(0));
            if let Some(max) = column.max_width() {
                width = width.min(max);
            }
            assigned += width;
            picked[slot].1 = Some(width);
        }
    }

    picked
        .iter()
        .map(|&(index, width)| ColumnSize {
            index,
            width: width.unwrap_or(0),
        })
        .collect()
}

impl fmt::Debug for GridGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridGeometry")
            .field("viewport", &*self.viewport.lock())
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GridGeometry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::{FnSizeOracle, SizeHint};

    const ROW_HEIGHTS: [i32; 6] = [30, 20, 20, 50, 40, 40];

    fn fixed_columns(widths: &[i32]) -> Arc<ColumnCollection> {
        let columns = ColumnCollection::new();
        for (i, &w) in widths.iter().enumerate() {
            columns
                .add(Arc::new(Column::new(format!("c{i}")).with_width(w)))
                .unwrap();
        }
        Arc::new(columns)
    }

    fn oracle(rows: i64) -> Arc<dyn SizeOracle> {
        Arc::new(FnSizeOracle::new(
            |row, _column: &Column| {
                let height = usize::try_from(row)
                    .ok()
                    .and_then(|r| ROW_HEIGHTS.get(r).copied())
                    .unwrap_or(25);
                SizeHint::with_height(height)
            },
            move || Position::new(rows, 5),
        ))
    }

    fn geometry(columns: Arc<ColumnCollection>) -> GridGeometry {
        GridGeometry::new(columns, Arc::new(Styling::new()), oracle(6))
    }

    #[test]
    fn test_no_viewport_no_sizes() {
        let geometry = geometry(fixed_columns(&[50, 51]));
        assert!(geometry.sizes().is_none());

        geometry.set_available_size(0, 75, Anchor::Start(0), Anchor::Start(0), 0, 0);
        assert!(geometry.sizes().is_none());
    }

    #[test]
    fn test_greedy_window() {
        let geometry = geometry(fixed_columns(&[50, 51, 52, 53, 54]));
        geometry.set_available_size(125, 75, Anchor::Start(0), Anchor::Start(0), 0, 0);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.column_widths(), vec![50, 51, 52]);
        assert_eq!(sizes.row_heights(), vec![30, 20, 20, 50]);

        geometry.set_available_size(125, 75, Anchor::Start(0), Anchor::Start(1), 0, 0);
        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.column_widths(), vec![51, 52, 53]);
    }

    #[test]
    fn test_fixed_columns_persist_under_scroll() {
        let geometry = geometry(fixed_columns(&[50, 51, 52, 53, 54]));
        geometry.styling().set_num_fixed_columns(1);
        geometry.set_available_size(125, 75, Anchor::Start(0), Anchor::Start(2), 0, 0);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.column_indices().collect::<Vec<_>>(), vec![0, 2, 3]);
        assert_eq!(sizes.fixed_columns().len(), 1);
        assert_eq!(sizes.first_scroll_column(), Some(2));
    }

    #[test]
    fn test_sizes_are_cached() {
        let geometry = geometry(fixed_columns(&[50, 51, 52]));
        geometry.set_available_size(125, 75, Anchor::Start(0), Anchor::Start(0), 0, 0);

        let first = geometry.sizes().unwrap();
        let second = geometry.sizes().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(!geometry.set_available_size(125, 75, Anchor::Start(0), Anchor::Start(0), 7, 3));
        assert!(Arc::ptr_eq(&first, &geometry.sizes().unwrap()));
        assert_eq!(geometry.left_offset(), 7);
        assert_eq!(geometry.top_offset(), 3);
    }

    #[test]
    fn test_styling_change_invalidates() {
        let geometry = geometry(fixed_columns(&[50, 51, 52, 53, 54]));
        geometry.set_available_size(125, 75, Anchor::Start(0), Anchor::Start(2), 0, 0);
        let before = geometry.sizes().unwrap();
        assert_eq!(before.column_indices().collect::<Vec<_>>(), vec![2, 3, 4]);

        geometry.styling().set_num_fixed_columns(1);
        assert!(geometry.is_dirty());

        let after = geometry.sizes().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.column_indices().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_column_change_invalidates() {
        let columns = fixed_columns(&[50, 51, 52]);
        let geometry = geometry(columns.clone());
        geometry.set_available_size(500, 75, Anchor::Start(0), Anchor::Start(0), 0, 0);
        assert_eq!(geometry.sizes().unwrap().columns.len(), 3);

        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let fired_clone = fired.clone();
        geometry.invalidated().connect(move |_| {
            fired_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        columns.get_column(1).unwrap().set_width(Some(10));
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(geometry.sizes().unwrap().column_widths(), vec![50, 10, 52]);

        let removed = columns.get_column(0).unwrap();
        columns.remove(&removed).unwrap();
        assert_eq!(geometry.sizes().unwrap().column_widths(), vec![10, 52]);
    }

    #[test]
    fn test_end_anchor() {
        let geometry = geometry(fixed_columns(&[50, 51, 52, 53, 54]));
        geometry.set_available_size(125, 75, Anchor::End, Anchor::End, 0, 0);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.column_indices().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(sizes.row_indices().collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn test_header_and_fixed_rows_first() {
        let geometry = geometry(fixed_columns(&[50]));
        geometry.styling().set_num_header_rows(2);
        geometry.styling().set_num_fixed_rows(1);
        geometry.set_available_size(100, 120, Anchor::Start(3), Anchor::Start(0), 0, 0);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.row_indices().collect::<Vec<_>>(), vec![-1, -2, 0, 3]);
        assert_eq!(sizes.leading_rows().len(), 3);
        assert_eq!(sizes.first_scroll_row(), Some(3));
        assert_eq!(sizes.last_scroll_row(), Some(3));
    }

    #[test]
    fn test_row_height_bounds() {
        let geometry = geometry(fixed_columns(&[50, 50]));
        geometry.styling().set_min_row_height(25);
        geometry.styling().set_max_row_height(Some(45));
        geometry.set_available_size(100, 1000, Anchor::Start(0), Anchor::Start(0), 0, 0);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.row_heights(), vec![30, 25, 25, 45, 40, 40]);
    }

    #[test]
    fn test_tallest_cell_wins() {
        let columns = fixed_columns(&[50, 50]);
        let oracle: Arc<dyn SizeOracle> = Arc::new(FnSizeOracle::new(
            |_row, column: &Column| {
                SizeHint::with_height(if column.path() == "c1" { 33 } else { 12 })
            },
            || Position::new(2, 2),
        ));
        let geometry = GridGeometry::new(columns, Arc::new(Styling::new()), oracle);
        geometry.set_available_size(100, 100, Anchor::Start(0), Anchor::Start(0), 0, 0);
        assert_eq!(geometry.sizes().unwrap().row_heights(), vec![33, 33]);
    }

    #[test]
    fn test_flex_distribution() {
        let columns = ColumnCollection::new();
        columns.add(Arc::new(Column::new("fixed").with_width(40))).unwrap();
        columns.add(Arc::new(Column::new("one").with_flex(1))).unwrap();
        columns.add(Arc::new(Column::new("two").with_flex(2))).unwrap();
        let geometry = geometry(Arc::new(columns));
        geometry.set_available_size(141, 75, Anchor::Start(0), Anchor::Start(0), 0, 0);

        let sizes = geometry.sizes().unwrap();
        // 101 remaining: floor(101 / 3) = 33, the last flex column takes 68.
        assert_eq!(sizes.column_widths(), vec![40, 33, 68]);
        assert_eq!(sizes.total_width(), 141);
    }

    #[test]
    fn test_flex_respects_min_and_max() {
        let columns = ColumnCollection::new();
        columns
            .add(Arc::new(Column::new("a").with_flex(1).with_max_width(20)))
            .unwrap();
        columns
            .add(Arc::new(Column::new("b").with_flex(1).with_min_width(70)))
            .unwrap();
        let geometry = geometry(Arc::new(columns));
        geometry.set_available_size(100, 75, Anchor::Start(0), Anchor::Start(0), 0, 0);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.column_widths(), vec![20, 80]);
    }

    #[test]
    fn test_offsets_and_rects() {
        let geometry = geometry(fixed_columns(&[50, 51, 52]));
        geometry.styling().set_horizontal_spacing(2);
        geometry.styling().set_vertical_spacing(1);
        geometry.set_available_size(500, 75, Anchor::Start(0), Anchor::Start(0), 0, 0);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.column_left(0), Some(0));
        assert_eq!(sizes.column_left(1), Some(52));
        assert_eq!(sizes.column_left(2), Some(105));
        assert_eq!(sizes.total_width(), 50 + 51 + 52 + 4);
        assert_eq!(sizes.row_top(1), Some(31));
        assert_eq!(sizes.cell_rect(1, 2), Some(CellRect::new(105, 31, 52, 20)));
        assert_eq!(sizes.cell_rect(1, 9), None);
        assert_eq!(sizes.data_range(), Some(Range::new((0, 0), (3, 2))));
    }

    #[test]
    fn test_viewport_rect_shifts_scrolled_cells_only() {
        let geometry = geometry(fixed_columns(&[50, 51, 52]));
        geometry.styling().set_num_fixed_columns(1);
        geometry.styling().set_num_fixed_rows(1);
        geometry.set_available_size(500, 200, Anchor::Start(0), Anchor::Start(0), 0, 0);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.viewport_rect(0, 0, 5, 7), sizes.cell_rect(0, 0));
        assert_eq!(
            sizes.viewport_rect(1, 1, 5, 7),
            Some(CellRect::new(45, 23, 51, 20))
        );
        assert_eq!(
            sizes.viewport_row_rect(2, 7),
            Some(CellRect::new(0, 43, 153, 20))
        );
    }

    #[test]
    fn test_lookups_match_display_order() {
        let geometry = geometry(fixed_columns(&[50, 51, 52, 53, 54]));
        geometry.styling().set_num_fixed_columns(1);
        geometry.styling().set_horizontal_spacing(3);
        geometry.styling().set_vertical_spacing(2);
        geometry.set_available_size(160, 90, Anchor::Start(1), Anchor::Start(3), 4, 6);

        let sizes = geometry.sizes().unwrap();
        assert_eq!(sizes.column_indices().collect::<Vec<_>>(), vec![0, 3, 4]);

        let mut left = 0;
        for (order, column) in sizes.columns.iter().enumerate() {
            assert_eq!(sizes.column_left(column.index), Some(left));
            assert_eq!(sizes.column_width(column.index), Some(column.width));
            let shift = if order == 0 { 0 } else { -4 };
            let mut top = 0;
            for row in &sizes.rows {
                assert_eq!(
                    sizes.viewport_rect(row.index, column.index, 4, 6),
                    Some(CellRect::new(left + shift, top - 6, column.width, row.height))
                );
                top += row.height + 2;
            }
            left += column.width + 3;
        }
        assert!(!sizes.has_column(1));
        assert_eq!(sizes.column_left(1), None);
        assert_eq!(sizes.row_top(0), None);
    }

    #[test]
    fn test_anchor_from_index() {
        assert_eq!(Anchor::from_index(-1), Anchor::End);
        assert_eq!(Anchor::from_index(4), Anchor::Start(4));
        assert_eq!(Anchor::End.to_index(), -1);
    }
}
