//! The scrolling grid container.
//!
//! [`ScrollingGrid`] ties the pieces together: it turns viewport resizes,
//! absolute scrolls and wheel rolls into geometry inputs, makes sure the
//! data source has the new window before any widget is bound, and then
//! reconciles the background, header and body layers.
//!
//! Updates are coalesced. While an update is in flight, further calls to
//! [`update`](ScrollingGrid::update) only mark another pass as pending, and
//! the running update loops until nothing is pending. Every input change
//! bumps a generation counter; a pass whose fetch resolves after the
//! generation moved on is discarded instead of reconciled, so a slow fetch
//! never paints a window the user has already scrolled away from.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use horizon_grid_core::logging::targets;
use horizon_grid_core::{ConnectionGuard, Signal};
use parking_lot::Mutex;

use crate::column::ColumnChangeKind;
use crate::data_source::DataSource;
use crate::error::Result;
use crate::factory::{ReconcileStats, WidgetBuilder};
use crate::geometry::{Anchor, CellRect, GridGeometry, GridSizes};
use crate::layers::{BodyLayer, HeaderLayer, RowBackgroundLayer, ScrollOffsets};
use crate::selection::Selection;

/// State of one scroll bar, in items of the scrollable part of an axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollBar {
    /// First visible scrollable item.
    pub position: usize,
    /// Number of visible scrollable items.
    pub page: usize,
    /// Number of scrollable items.
    pub total: usize,
}

/// Both scroll bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollBars {
    pub vertical: ScrollBar,
    pub horizontal: ScrollBar,
}

/// The result of [`ScrollingGrid::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The layers were reconciled. `discarded` counts passes thrown away
    /// because the inputs changed while their fetch was in flight.
    Applied {
        stats: ReconcileStats,
        discarded: usize,
    },
    /// Another update was running; it will run one more pass.
    Coalesced,
    /// No viewport has been set, or it is empty.
    NoViewport,
}

enum Pass {
    Applied(ReconcileStats),
    Stale,
    NoViewport,
}

#[derive(Debug, Clone, Copy, Default)]
struct ScrollState {
    width: i32,
    height: i32,
    start_row: Anchor,
    start_column: Anchor,
    offsets: ScrollOffsets,
}

/// A virtualized grid over a data source.
pub struct ScrollingGrid<D: DataSource, B: WidgetBuilder> {
    geometry: Arc<GridGeometry>,
    source: Arc<D>,
    background: RowBackgroundLayer<B, D::Model>,
    header: HeaderLayer<B, D::Model>,
    body: BodyLayer<B, D::Model>,
    selection: Selection,
    state: Mutex<ScrollState>,
    updating: AtomicBool,
    pending: AtomicBool,
    generation: Arc<AtomicU64>,
    columns_reset: Arc<AtomicBool>,
    /// Emitted with the counters of every applied update pass.
    pub updated: Signal<ReconcileStats>,
    _subscriptions: Vec<ConnectionGuard>,
}

impl<D: DataSource, B: WidgetBuilder> ScrollingGrid<D, B> {
    /// Creates a grid showing `source` with widgets from `builder`.
    ///
    /// Size changes of the source invalidate the geometry; every geometry
    /// invalidation starts a new generation. Replacing the whole column set
    /// disposes every widget on the next update.
    pub fn new(geometry: Arc<GridGeometry>, source: Arc<D>, builder: Arc<B>) -> Self {
        let columns = geometry.columns().clone();
        let generation = Arc::new(AtomicU64::new(0));
        let columns_reset = Arc::new(AtomicBool::new(false));

        let on_invalidated = {
            let generation = generation.clone();
            geometry.invalidated().connect_scoped(move |_| {
                generation.fetch_add(1, Ordering::AcqRel);
            })
        };
        let on_resized = {
            let geometry = Arc::downgrade(&geometry);
            source.size_changed().connect_scoped(move |size| {
                if let Some(geometry) = geometry.upgrade() {
                    tracing::debug!(target: targets::SCROLL, rows = size.row, "data source resized");
                    geometry.invalidate();
                }
            })
        };

        let on_columns = {
            let columns_reset = columns_reset.clone();
            columns.changed().connect_scoped(move |change| {
                if change.kind == ColumnChangeKind::Reset {
                    columns_reset.store(true, Ordering::Release);
                }
            })
        };

        Self {
            background: RowBackgroundLayer::new(builder.clone(), columns.clone()),
            header: HeaderLayer::new(builder.clone(), columns.clone()),
            body: BodyLayer::new(builder, columns),
            geometry,
            source,
            selection: Selection::new(),
            state: Mutex::new(ScrollState::default()),
            updating: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            generation,
            columns_reset,
            updated: Signal::new(),
            _subscriptions: vec![on_invalidated, on_resized, on_columns],
        }
    }

    pub fn geometry(&self) -> &Arc<GridGeometry> {
        &self.geometry
    }

    pub fn source(&self) -> &Arc<D> {
        &self.source
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn header(&self) -> &HeaderLayer<B, D::Model> {
        &self.header
    }

    pub fn body(&self) -> &BodyLayer<B, D::Model> {
        &self.body
    }

    pub fn background(&self) -> &RowBackgroundLayer<B, D::Model> {
        &self.background
    }

    /// Current row and column anchors.
    pub fn anchors(&self) -> (Anchor, Anchor) {
        let state = self.state.lock();
        (state.start_row, state.start_column)
    }

    /// Current generation; advances whenever the window inputs change.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether an update is running.
    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    /// Sets the viewport size. Returns `true` if the window must be
    /// recomputed.
    pub fn resize(&self, width: i32, height: i32) -> bool {
        self.apply(|state| {
            state.width = width;
            state.height = height;
        })
    }

    /// Scrolls to absolute anchors.
    pub fn scroll_to(&self, start_row: Anchor, start_column: Anchor) -> bool {
        self.apply(|state| {
            state.start_row = start_row;
            state.start_column = start_column;
        })
    }

    /// Sets the sub-cell scroll offsets. Never invalidates the window.
    pub fn set_offsets(&self, offsets: ScrollOffsets) {
        self.apply(|state| state.offsets = offsets);
    }

    /// Scrolls by whole rows and columns, as a wheel does.
    ///
    /// The start never moves into the fixed rows or columns. Rolling forward
    /// once the last item is visible anchors the axis at the end; rolling
    /// back from an end anchor continues from the first visible item.
    pub fn roll(&self, d_rows: i64, d_columns: i64) -> bool {
        let Some(sizes) = self.geometry.sizes() else {
            return false;
        };
        let styling = self.geometry.styling();
        let total_rows = self.source.size().row.max(0);
        let total_columns = self.geometry.columns().len() as i64;
        let (start_row, start_column) = self.anchors();

        let start_row = rolled(
            start_row,
            d_rows,
            sizes.first_scroll_row(),
            sizes.last_scroll_row(),
            i64::from(styling.num_fixed_rows()),
            total_rows,
        );
        let start_column = rolled(
            start_column,
            d_columns,
            sizes.first_scroll_column().map(|c| c as i64),
            sizes.last_scroll_column().map(|c| c as i64),
            i64::from(styling.num_fixed_columns()),
            total_columns,
        );
        tracing::trace!(target: targets::SCROLL, d_rows, d_columns, ?start_row, ?start_column, "roll");
        self.scroll_to(start_row, start_column)
    }

    /// Scroll bar state for the current window.
    pub fn scroll_bars(&self) -> Option<ScrollBars> {
        let sizes = self.geometry.sizes()?;
        let styling = self.geometry.styling();
        let fixed_rows = i64::from(styling.num_fixed_rows());
        let fixed_columns = i64::from(styling.num_fixed_columns());
        let total_rows = self.source.size().row;
        let total_columns = self.geometry.columns().len() as i64;

        Some(ScrollBars {
            vertical: ScrollBar {
                position: to_count(sizes.first_scroll_row().unwrap_or(fixed_rows) - fixed_rows),
                page: sizes.scroll_rows().len(),
                total: to_count(total_rows - fixed_rows),
            },
            horizontal: ScrollBar {
                position: to_count(
                    sizes
                        .first_scroll_column()
                        .map_or(fixed_columns, |c| c as i64)
                        - fixed_columns,
                ),
                page: sizes.scroll_columns().len(),
                total: to_count(total_columns - fixed_columns),
            },
        })
    }

    /// Selection highlight rectangles for the current window.
    pub fn selection_rects(&self) -> Vec<CellRect> {
        let offsets = self.state.lock().offsets;
        self.geometry
            .sizes()
            .map(|sizes| self.selection.highlight_rects(&sizes, offsets))
            .unwrap_or_default()
    }

    /// Fetches the current window and reconciles every layer.
    ///
    /// Calls made while an update is running return
    /// [`UpdateOutcome::Coalesced`] at once and are folded into one more
    /// pass of the running update. Dropping the returned future ends the
    /// update; the next call starts a fresh one.
    pub async fn update(&self) -> Result<UpdateOutcome> {
        if self.updating.swap(true, Ordering::AcqRel) {
            self.pending.store(true, Ordering::Release);
            tracing::debug!(target: targets::SCROLL, "update coalesced");
            return Ok(UpdateOutcome::Coalesced);
        }
        let _updating = UpdatingGuard(&self.updating);
        self.run_passes().await
    }

    async fn run_passes(&self) -> Result<UpdateOutcome> {
        let mut stats = ReconcileStats::default();
        let mut applied = false;
        let mut discarded = 0;
        loop {
            self.pending.store(false, Ordering::Release);
            match self.pass().await? {
                Pass::Applied(pass) => {
                    stats += pass;
                    applied = true;
                }
                Pass::Stale => {
                    discarded += 1;
                    self.pending.store(true, Ordering::Release);
                }
                Pass::NoViewport => {}
            }
            if !self.pending.load(Ordering::Acquire) {
                break;
            }
        }
        Ok(if applied {
            UpdateOutcome::Applied { stats, discarded }
        } else {
            UpdateOutcome::NoViewport
        })
    }

    async fn pass(&self) -> Result<Pass> {
        let generation = self.generation();
        let Some(sizes) = self.geometry.sizes() else {
            return Ok(Pass::NoViewport);
        };

        if let Some(range) = sizes.data_range()
            && !self.source.is_available(&range)
        {
            self.source.make_available(range).await?;
        }

        if self.generation() != generation {
            tracing::debug!(target: targets::SCROLL, generation, "stale fetch discarded");
            return Ok(Pass::Stale);
        }

        let stats = self.reconcile(&sizes)?;
        self.updated.emit(stats);
        Ok(Pass::Applied(stats))
    }

    fn reconcile(&self, sizes: &GridSizes) -> Result<ReconcileStats> {
        let offsets = self.state.lock().offsets;
        let mut stats = ReconcileStats::default();
        if self.columns_reset.swap(false, Ordering::AcqRel) {
            stats.disposed += self.header.factory().dispose_all_widgets()
                + self.body.factory().dispose_all_widgets()
                + self.background.factory().dispose_all_widgets();
            tracing::debug!(target: targets::SCROLL, disposed = stats.disposed, "columns reset");
        }
        stats += self.background.refresh(sizes, offsets)?;
        stats += self.header.refresh(sizes, offsets)?;
        stats += self.body.refresh(sizes, &*self.source, offsets)?;
        Ok(stats)
    }

    fn apply(&self, change: impl FnOnce(&mut ScrollState)) -> bool {
        let state = {
            let mut state = self.state.lock();
            change(&mut state);
            *state
        };
        self.geometry.set_available_size(
            state.width,
            state.height,
            state.start_row,
            state.start_column,
            state.offsets.left,
            state.offsets.top,
        )
    }
}

/// Clears the in-flight flag when an update finishes or is dropped.
struct UpdatingGuard<'a>(&'a AtomicBool);

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The anchor after rolling `delta` items along one axis.
fn rolled(
    anchor: Anchor,
    delta: i64,
    first_visible: Option<i64>,
    last_visible: Option<i64>,
    fixed: i64,
    total: i64,
) -> Anchor {
    if delta == 0 || total <= fixed {
        return anchor;
    }
    if delta > 0 && last_visible.is_some_and(|last| last >= total - 1) {
        return Anchor::End;
    }
    let current = match anchor {
        Anchor::Start(index) => index as i64,
        Anchor::End => first_visible.unwrap_or(fixed),
    };
    let next = (current.max(fixed) + delta).clamp(fixed, total - 1);
    Anchor::Start(next as usize)
}

fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

impl<D: DataSource, B: WidgetBuilder> fmt::Debug for ScrollingGrid<D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollingGrid")
            .field("state", &*self.state.lock())
            .field("updating", &self.updating.load(Ordering::Acquire))
            .field("generation", &self.generation.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, ColumnCollection};
    use crate::data::{CellValue, RecordModel};
    use crate::data_source::ArrayDataSource;
    use crate::factory::tests::TestBuilder;
    use crate::position::Position;
    use crate::range::Range;
    use crate::size::{FnSizeOracle, SizeHint, SizeOracle};
    use crate::styling::Styling;
    use std::sync::atomic::AtomicUsize;

    /// An array source that pretends every fetch takes a few scheduler turns.
    struct SlowSource {
        inner: ArrayDataSource,
        fetched: Mutex<Option<Range>>,
        fetches: AtomicUsize,
    }

    impl DataSource for SlowSource {
        type Model = RecordModel;

        fn is_available(&self, range: &Range) -> bool {
            self.fetched.lock().is_some_and(|fetched| fetched.eclipses(range))
        }

        async fn make_available(&self, range: Range) -> Result<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            *self.fetched.lock() = Some(range);
            Ok(())
        }

        fn model_for_position(&self, pos: Position) -> Option<Arc<RecordModel>> {
            self.inner.model_for_position(pos)
        }

        fn position_of_model(&self, model: &Arc<RecordModel>) -> Option<Position> {
            self.inner.position_of_model(model)
        }

        fn size(&self) -> Position {
            self.inner.size()
        }

        fn size_changed(&self) -> &Signal<Position> {
            self.inner.size_changed()
        }
    }

    fn records(rows: i64) -> ArrayDataSource {
        ArrayDataSource::with_rows(
            3,
            (0..rows).map(|i| RecordModel::from_values([("c0", CellValue::from(i))])),
        )
    }

    fn geometry_for(rows: Arc<dyn Fn() -> i64 + Send + Sync>) -> Arc<GridGeometry> {
        let columns = ColumnCollection::new();
        for i in 0..3 {
            columns
                .add(Arc::new(Column::new(format!("c{i}")).with_width(20)))
                .unwrap();
        }
        let oracle: Arc<dyn SizeOracle> = Arc::new(FnSizeOracle::new(
            |_row, _column: &Column| SizeHint::with_height(10),
            move || Position::new(rows(), 3),
        ));
        Arc::new(GridGeometry::new(
            Arc::new(columns),
            Arc::new(Styling::new()),
            oracle,
        ))
    }

    fn array_grid(rows: i64) -> ScrollingGrid<ArrayDataSource, TestBuilder> {
        let source = Arc::new(records(rows));
        let extent = source.clone();
        let geometry = geometry_for(Arc::new(move || extent.size().row));
        ScrollingGrid::new(geometry, source, Arc::new(TestBuilder))
    }

    fn slow_grid(rows: i64) -> ScrollingGrid<SlowSource, TestBuilder> {
        let source = Arc::new(SlowSource {
            inner: records(rows),
            fetched: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        });
        let extent = source.clone();
        let geometry = geometry_for(Arc::new(move || extent.size().row));
        ScrollingGrid::new(geometry, source, Arc::new(TestBuilder))
    }

    fn body_rows<D: DataSource>(grid: &ScrollingGrid<D, TestBuilder>) -> Vec<i64> {
        let mut rows: Vec<i64> = grid
            .body()
            .factory()
            .positions()
            .into_iter()
            .map(|p| p.row)
            .collect();
        rows.dedup();
        rows
    }

    #[tokio::test]
    async fn test_update_without_viewport() {
        let grid = array_grid(10);
        assert_eq!(grid.update().await.unwrap(), UpdateOutcome::NoViewport);
    }

    #[tokio::test]
    async fn test_update_fills_layers() {
        let grid = array_grid(10);
        grid.resize(60, 25);

        let outcome = grid.update().await.unwrap();
        let UpdateOutcome::Applied { stats, discarded } = outcome else {
            panic!("expected an applied update, got {outcome:?}");
        };
        assert_eq!(discarded, 0);
        // 3 rows x 3 columns of body cells plus 3 row backgrounds.
        assert_eq!(stats.created, 12);
        assert_eq!(body_rows(&grid), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_scroll_moves_window() {
        let grid = array_grid(10);
        grid.resize(60, 25);
        grid.update().await.unwrap();

        grid.scroll_to(Anchor::Start(1), Anchor::Start(0));
        let UpdateOutcome::Applied { stats, .. } = grid.update().await.unwrap() else {
            panic!("expected an applied update");
        };
        // Row 0 leaves and row 3 enters, in the body and background layers.
        assert_eq!(stats.created, 4);
        assert_eq!(stats.disposed, 4);
        assert_eq!(body_rows(&grid), vec![1, 2, 3]);
    }

    #[test]
    fn test_roll_clamps_and_anchors_at_end() {
        let grid = array_grid(10);
        grid.resize(60, 25);

        grid.roll(-5, 0);
        assert_eq!(grid.anchors().0, Anchor::Start(0));

        grid.roll(4, 0);
        assert_eq!(grid.anchors().0, Anchor::Start(4));

        grid.roll(100, 0);
        assert_eq!(grid.anchors().0, Anchor::Start(9));
        grid.roll(1, 0);
        assert_eq!(grid.anchors().0, Anchor::End);

        let sizes = grid.geometry().sizes().unwrap();
        assert_eq!(sizes.row_indices().collect::<Vec<_>>(), vec![7, 8, 9]);
        grid.roll(-1, 0);
        assert_eq!(grid.anchors().0, Anchor::Start(6));
    }

    #[test]
    fn test_scroll_bars() {
        let grid = array_grid(10);
        grid.resize(40, 25);
        grid.scroll_to(Anchor::Start(2), Anchor::Start(1));

        let bars = grid.scroll_bars().unwrap();
        assert_eq!(
            bars.vertical,
            ScrollBar {
                position: 2,
                page: 3,
                total: 10
            }
        );
        assert_eq!(
            bars.horizontal,
            ScrollBar {
                position: 1,
                page: 2,
                total: 3
            }
        );
    }

    #[test]
    fn test_source_growth_invalidates_geometry() {
        let grid = array_grid(2);
        grid.resize(60, 100);
        assert_eq!(grid.geometry().sizes().unwrap().rows.len(), 2);

        grid.source().push(RecordModel::new());
        assert!(grid.geometry().is_dirty());
        assert_eq!(grid.geometry().sizes().unwrap().rows.len(), 3);
    }

    #[tokio::test]
    async fn test_column_reset_rebuilds_widgets() {
        let grid = array_grid(10);
        grid.resize(60, 25);
        grid.update().await.unwrap();
        let before = grid.body().factory().widget_at(Position::new(0, 0)).unwrap();

        grid.geometry()
            .columns()
            .set_columns(vec![Arc::new(Column::new("c0").with_width(60))])
            .unwrap();
        let UpdateOutcome::Applied { stats, .. } = grid.update().await.unwrap() else {
            panic!("expected an applied update");
        };
        // 9 body cells and 3 backgrounds go; 3 body cells and 3 backgrounds return.
        assert_eq!(stats.disposed, 12);
        assert_eq!(stats.created, 6);

        let after = grid.body().factory().widget_at(Position::new(0, 0)).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.lock().text, "0");
    }

    #[tokio::test]
    async fn test_overlapping_updates_are_coalesced() {
        let grid = slow_grid(10);
        grid.resize(60, 25);

        let (first, second, third) = tokio::join!(grid.update(), grid.update(), grid.update());

        assert!(matches!(first.unwrap(), UpdateOutcome::Applied { .. }));
        assert_eq!(second.unwrap(), UpdateOutcome::Coalesced);
        assert_eq!(third.unwrap(), UpdateOutcome::Coalesced);
        // The coalesced pass finds the window already available.
        assert_eq!(grid.source().fetches.load(Ordering::SeqCst), 1);
        assert!(!grid.is_updating());
    }

    #[tokio::test]
    async fn test_stale_fetch_is_discarded() {
        let grid = slow_grid(20);
        grid.resize(60, 25);

        let scroll = async {
            tokio::task::yield_now().await;
            grid.scroll_to(Anchor::Start(10), Anchor::Start(0));
        };
        let (outcome, ()) = tokio::join!(grid.update(), scroll);

        let UpdateOutcome::Applied { discarded, .. } = outcome.unwrap() else {
            panic!("expected an applied update");
        };
        assert_eq!(discarded, 1);
        assert_eq!(body_rows(&grid), vec![10, 11, 12]);
        assert_eq!(grid.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_removed_column_rebinds_cells() {
        let source = Arc::new(ArrayDataSource::with_rows(
            3,
            (0..10).map(|i| {
                RecordModel::from_values([("c0", CellValue::from(i)), ("c1", CellValue::from("b"))])
            }),
        ));
        let extent = source.clone();
        let geometry = geometry_for(Arc::new(move || extent.size().row));
        let grid = ScrollingGrid::new(geometry, source, Arc::new(TestBuilder));
        grid.resize(60, 25);
        grid.update().await.unwrap();
        let cell = Position::new(0, 0);
        assert_eq!(grid.body().factory().widget_at(cell).unwrap().lock().text, "0");

        let columns = grid.geometry().columns().clone();
        assert!(columns.remove(&columns.get_column(0).unwrap()).unwrap());
        grid.update().await.unwrap();

        assert_eq!(columns.get_column(0).unwrap().path(), "c1");
        assert_eq!(grid.body().factory().widget_at(cell).unwrap().lock().text, "b");
        assert!(grid.body().factory().positions().iter().all(|p| p.column < 2));
    }

    #[tokio::test]
    async fn test_dropped_update_does_not_block_later_ones() {
        let grid = slow_grid(10);
        grid.resize(60, 25);

        tokio::select! {
            biased;
            _ = grid.update() => panic!("the fetch should still be pending"),
            _ = tokio::task::yield_now() => {}
        }
        assert!(!grid.is_updating());

        let outcome = grid.update().await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Applied { .. }));
        assert_eq!(body_rows(&grid), vec![0, 1, 2]);
    }
}
