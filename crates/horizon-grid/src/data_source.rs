//! The data source contract and an in-memory implementation.
//!
//! A data source owns the row models of the grid. Before the grid binds
//! widgets for a window it asks the source to make that window available;
//! sources backed by slow storage fetch asynchronously and cache what they
//! fetched. Positions the source cannot (yet) serve read as `None` and
//! render blank.

use std::future::Future;
use std::sync::Arc;

use horizon_grid_core::Signal;
use horizon_grid_core::logging::targets;
use parking_lot::RwLock;

use crate::column::Column;
use crate::data::{CellValue, RecordModel, RowModel};
use crate::error::Result;
use crate::position::Position;
use crate::range::Range;

/// Supplies row models to the grid.
pub trait DataSource: Send + Sync {
    /// The row model type handed out for each row.
    type Model: RowModel;

    /// Whether every cell of `range` can be served without fetching.
    fn is_available(&self, range: &Range) -> bool;

    /// Fetches `range`, plus column zero of every row in it.
    ///
    /// Resolves once [`is_available`](Self::is_available) holds for `range`.
    fn make_available(&self, range: Range) -> impl Future<Output = Result<()>> + Send;

    /// The model for the row at `pos`, if the source currently has one.
    fn model_for_position(&self, pos: Position) -> Option<Arc<Self::Model>>;

    /// The position (row, column 0) of `model`.
    fn position_of_model(&self, model: &Arc<Self::Model>) -> Option<Position>;

    /// Total `(rows, columns)`.
    fn size(&self) -> Position;

    /// Emitted with the new size after rows are added or removed.
    fn size_changed(&self) -> &Signal<Position>;

    /// Reads the value displayed at `pos` in `column`; `Empty` when no model
    /// is available.
    fn value_at(&self, pos: Position, column: &Column) -> CellValue {
        self.model_for_position(pos)
            .map(|model| model.value(column.path()))
            .unwrap_or_default()
    }
}

/// An in-memory data source over a vector of [`RecordModel`]s.
///
/// Everything is always available. Removing or evicting a row disposes its
/// model, which exercises the widget layer's tolerance for models that
/// disappear while still bound.
pub struct ArrayDataSource {
    rows: RwLock<Vec<Arc<RecordModel>>>,
    column_count: usize,
    size_changed: Signal<Position>,
}

impl ArrayDataSource {
    /// Creates an empty source reporting `column_count` columns.
    pub fn new(column_count: usize) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            column_count,
            size_changed: Signal::new(),
        }
    }

    /// Creates a source holding `rows`.
    pub fn with_rows(column_count: usize, rows: impl IntoIterator<Item = RecordModel>) -> Self {
        let source = Self::new(column_count);
        source
            .rows
            .write()
            .extend(rows.into_iter().map(Arc::new));
        source
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Appends a row and returns its model.
    pub fn push(&self, record: RecordModel) -> Arc<RecordModel> {
        let model = Arc::new(record);
        self.rows.write().push(model.clone());
        self.size_changed.emit(self.size());
        model
    }

    /// Removes the row at `row` and disposes its model.
    pub fn remove(&self, row: usize) -> Option<Arc<RecordModel>> {
        let removed = {
            let mut rows = self.rows.write();
            (row < rows.len()).then(|| rows.remove(row))
        }?;
        removed.dispose();
        self.size_changed.emit(self.size());
        Some(removed)
    }

    /// Disposes the model of `row` and replaces it with a fresh one holding
    /// the same values.
    pub fn evict(&self, row: usize) -> bool {
        let mut rows = self.rows.write();
        let Some(slot) = rows.get_mut(row) else {
            return false;
        };
        let fresh = Arc::new(RecordModel::from_values(slot.to_map()));
        let stale = std::mem::replace(slot, fresh);
        drop(rows);
        stale.dispose();
        tracing::trace!(target: targets::DATA_SOURCE, row, "model evicted");
        true
    }

    fn row_index(&self, pos: Position) -> Option<usize> {
        usize::try_from(pos.row).ok()
    }
}

impl DataSource for ArrayDataSource {
    type Model = RecordModel;

    fn is_available(&self, _range: &Range) -> bool {
        true
    }

    async fn make_available(&self, range: Range) -> Result<()> {
        tracing::trace!(target: targets::DATA_SOURCE, %range, "range requested");
        Ok(())
    }

    fn model_for_position(&self, pos: Position) -> Option<Arc<RecordModel>> {
        let row = self.row_index(pos)?;
        self.rows.read().get(row).cloned()
    }

    fn position_of_model(&self, model: &Arc<RecordModel>) -> Option<Position> {
        self.rows
            .read()
            .iter()
            .position(|m| Arc::ptr_eq(m, model))
            .map(|row| Position::new(row as i64, 0))
    }

    fn size(&self) -> Position {
        Position::new(self.len() as i64, self.column_count as i64)
    }

    fn size_changed(&self) -> &Signal<Position> {
        &self.size_changed
    }
}

impl std::fmt::Debug for ArrayDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayDataSource")
            .field("rows", &self.len())
            .field("column_count", &self.column_count)
            .finish()
    }
}

static_assertions::assert_impl_all!(ArrayDataSource: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn source() -> ArrayDataSource {
        ArrayDataSource::with_rows(
            2,
            (0..3).map(|i| RecordModel::from_values([("name", CellValue::from(format!("row {i}")))])),
        )
    }

    #[test]
    fn test_models_and_positions() {
        let source = source();
        assert_eq!(source.size(), Position::new(3, 2));

        let model = source.model_for_position(Position::new(1, 1)).unwrap();
        assert_eq!(model.value("name").as_text(), Some("row 1"));
        assert_eq!(source.position_of_model(&model), Some(Position::new(1, 0)));

        assert!(source.model_for_position(Position::new(3, 0)).is_none());
        assert!(source.model_for_position(Position::new(-1, 0)).is_none());
    }

    #[test]
    fn test_value_at_blank_when_missing() {
        let source = source();
        let column = Column::new("name");
        assert_eq!(
            source.value_at(Position::new(2, 0), &column),
            CellValue::from("row 2")
        );
        assert!(source.value_at(Position::new(9, 0), &column).is_empty());
    }

    #[test]
    fn test_size_changed_on_push_and_remove() {
        let source = source();
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sizes_clone = sizes.clone();
        source
            .size_changed()
            .connect(move |size| sizes_clone.lock().push(size.row));

        source.push(RecordModel::new());
        let removed = source.remove(0).unwrap();
        assert!(removed.is_disposed());
        assert!(source.remove(10).is_none());

        assert_eq!(*sizes.lock(), vec![4, 3]);
    }

    #[test]
    fn test_evict_disposes_and_replaces() {
        let source = source();
        let before = source.model_for_position(Position::new(0, 0)).unwrap();
        assert!(source.evict(0));
        let after = source.model_for_position(Position::new(0, 0)).unwrap();

        assert!(before.is_disposed());
        assert!(!after.is_disposed());
        assert_eq!(after.value("name"), before.value("name"));
        assert!(!source.evict(99));
    }

    #[tokio::test]
    async fn test_always_available() {
        let source = source();
        let range = Range::new((0, 0), (100, 5));
        assert!(source.is_available(&range));
        source.make_available(range).await.unwrap();
    }
}
