//! Widget layers driven by the geometry engine.
//!
//! Each layer owns a [`WidgetFactory`] and turns a [`GridSizes`] window into
//! the cells that factory should hold. All layers read rectangles from the
//! same `GridSizes`, so headers, backgrounds and body cells line up exactly.

use std::sync::Arc;

use crate::column::{Column, ColumnCollection};
use crate::column_label::column_label;
use crate::data::{CellValue, RowModel};
use crate::data_source::DataSource;
use crate::error::Result;
use crate::factory::{CellSource, LayerKind, ReconcileStats, WidgetBuilder, WidgetFactory};
use crate::geometry::GridSizes;
use crate::position::Position;

/// Sub-cell scroll offsets applied to scrolled rows and columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollOffsets {
    pub left: i32,
    pub top: i32,
}

/// The text a header cell shows: the caption, or the spreadsheet letter of
/// the column when the caption is empty.
pub fn header_text(column: &Column, index: usize) -> String {
    let caption = column.caption();
    if caption.is_empty() {
        column_label(index)
    } else {
        caption
    }
}

/// Header cells, one per visible column and header row.
///
/// The first header row (`-1`) shows [`header_text`]; deeper header rows are
/// left blank for the host to fill.
pub struct HeaderLayer<B: WidgetBuilder, M: RowModel> {
    factory: WidgetFactory<B, M>,
    columns: Arc<ColumnCollection>,
}

impl<B: WidgetBuilder, M: RowModel> HeaderLayer<B, M> {
    pub fn new(builder: Arc<B>, columns: Arc<ColumnCollection>) -> Self {
        Self {
            factory: WidgetFactory::new(LayerKind::Header, builder, columns.clone()),
            columns,
        }
    }

    pub fn factory(&self) -> &WidgetFactory<B, M> {
        &self.factory
    }

    /// Reconciles the header widgets with `sizes`.
    pub fn refresh(&self, sizes: &GridSizes, offsets: ScrollOffsets) -> Result<ReconcileStats> {
        let mut cells = Vec::new();
        for row in sizes.rows.iter().filter(|r| r.index < 0) {
            for column in &sizes.columns {
                let Some(rect) = sizes.viewport_rect(row.index, column.index, offsets.left, offsets.top)
                else {
                    continue;
                };
                let source = if row.index == -1 {
                    let descriptor = self.columns.get_column(column.index)?;
                    CellSource::Value(CellValue::Text(header_text(&descriptor, column.index)))
                } else {
                    CellSource::Blank
                };
                cells.push((Position::new(row.index, column.index as i64), rect, source));
            }
        }
        self.factory.reconcile(cells)
    }
}

/// Data cells, each bound to the row model of its position.
///
/// Cells whose model the data source cannot serve yet render blank.
pub struct BodyLayer<B: WidgetBuilder, M: RowModel> {
    factory: WidgetFactory<B, M>,
}

impl<B: WidgetBuilder, M: RowModel> BodyLayer<B, M> {
    pub fn new(builder: Arc<B>, columns: Arc<ColumnCollection>) -> Self {
        Self {
            factory: WidgetFactory::new(LayerKind::Body, builder, columns),
        }
    }

    pub fn factory(&self) -> &WidgetFactory<B, M> {
        &self.factory
    }

    /// Reconciles the body widgets with `sizes`, binding models from
    /// `source`.
    pub fn refresh<D>(&self, sizes: &GridSizes, source: &D, offsets: ScrollOffsets) -> Result<ReconcileStats>
    where
        D: DataSource<Model = M>,
    {
        let mut cells = Vec::with_capacity(sizes.rows.len() * sizes.columns.len());
        for row in sizes.rows.iter().filter(|r| r.index >= 0) {
            let model = source.model_for_position(Position::new(row.index, 0));
            for column in &sizes.columns {
                let Some(rect) = sizes.viewport_rect(row.index, column.index, offsets.left, offsets.top)
                else {
                    continue;
                };
                let cell = match &model {
                    Some(model) => CellSource::Model(model.clone()),
                    None => CellSource::Blank,
                };
                cells.push((Position::new(row.index, column.index as i64), rect, cell));
            }
        }
        self.factory.reconcile(cells)
    }
}

/// One full-width background widget per visible data row.
///
/// Background widgets sit at column `-1` and receive `CellValue::Bool(odd)`
/// so that builders can stripe alternate rows.
pub struct RowBackgroundLayer<B: WidgetBuilder, M: RowModel> {
    factory: WidgetFactory<B, M>,
}

impl<B: WidgetBuilder, M: RowModel> RowBackgroundLayer<B, M> {
    /// The column index background widgets are pooled under.
    pub const ROW_SPAN: i64 = -1;

    pub fn new(builder: Arc<B>, columns: Arc<ColumnCollection>) -> Self {
        Self {
            factory: WidgetFactory::new(LayerKind::RowBackground, builder, columns),
        }
    }

    pub fn factory(&self) -> &WidgetFactory<B, M> {
        &self.factory
    }

    /// Whether `row` is an odd (striped) data row.
    pub fn is_odd(row: i64) -> bool {
        row.rem_euclid(2) == 1
    }

    /// Reconciles the background widgets with `sizes`.
    pub fn refresh(&self, sizes: &GridSizes, offsets: ScrollOffsets) -> Result<ReconcileStats> {
        let cells = sizes
            .rows
            .iter()
            .filter(|r| r.index >= 0)
            .filter_map(|row| {
                let rect = sizes.viewport_row_rect(row.index, offsets.top)?;
                Some((
                    Position::new(row.index, Self::ROW_SPAN),
                    rect,
                    CellSource::Value(CellValue::Bool(Self::is_odd(row.index))),
                ))
            });
        self.factory.reconcile(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RecordModel;
    use crate::data_source::ArrayDataSource;
    use crate::factory::tests::TestBuilder;
    use crate::geometry::{Anchor, GridGeometry};
    use crate::size::{FnSizeOracle, SizeHint, SizeOracle};
    use crate::styling::Styling;

    fn setup(rows: i64) -> (Arc<ColumnCollection>, GridGeometry, ArrayDataSource) {
        let columns = Arc::new(
            ColumnCollection::from_columns([
                Arc::new(Column::new("name").with_caption("Name").with_width(40)),
                Arc::new(Column::new("size").with_width(40)),
            ])
            .unwrap(),
        );
        let oracle: Arc<dyn SizeOracle> = Arc::new(FnSizeOracle::new(
            |_row, _column: &Column| SizeHint::with_height(10),
            move || Position::new(rows, 2),
        ));
        let styling = Arc::new(Styling::new());
        styling.set_num_header_rows(1);
        let geometry = GridGeometry::new(columns.clone(), styling, oracle);
        let source = ArrayDataSource::with_rows(
            2,
            (0..rows).map(|i| RecordModel::from_values([("name", CellValue::from(format!("r{i}")))])),
        );
        (columns, geometry, source)
    }

    #[test]
    fn test_header_text() {
        assert_eq!(header_text(&Column::new("a").with_caption("Name"), 0), "Name");
        assert_eq!(header_text(&Column::new("a"), 27), "AB");
    }

    #[test]
    fn test_header_layer_labels() {
        let (columns, geometry, _source) = setup(3);
        geometry.set_available_size(100, 100, Anchor::Start(0), Anchor::Start(0), 0, 0);
        let layer: HeaderLayer<TestBuilder, RecordModel> =
            HeaderLayer::new(Arc::new(TestBuilder), columns);

        layer
            .refresh(&geometry.sizes().unwrap(), ScrollOffsets::default())
            .unwrap();

        let name = layer.factory().widget_at(Position::new(-1, 0)).unwrap();
        let size = layer.factory().widget_at(Position::new(-1, 1)).unwrap();
        assert_eq!(name.lock().text, "Name");
        assert_eq!(size.lock().text, "B");
        assert_eq!(layer.factory().len(), 2);
    }

    #[test]
    fn test_body_layer_binds_models() {
        let (columns, geometry, source) = setup(3);
        geometry.set_available_size(100, 100, Anchor::Start(0), Anchor::Start(0), 0, 0);
        let layer = BodyLayer::new(Arc::new(TestBuilder), columns);

        let stats = layer
            .refresh(&geometry.sizes().unwrap(), &source, ScrollOffsets::default())
            .unwrap();
        assert_eq!(stats.created, 6);

        let cell = layer.factory().widget_at(Position::new(2, 0)).unwrap();
        assert_eq!(cell.lock().text, "r2");
        assert_eq!(
            cell.lock().rect,
            Some(crate::geometry::CellRect::new(0, 30, 40, 10))
        );

        source
            .model_for_position(Position::new(2, 0))
            .unwrap()
            .set("name", "renamed");
        assert_eq!(cell.lock().text, "renamed");
    }

    #[test]
    fn test_body_layer_blank_without_model() {
        let (columns, geometry, source) = setup(3);
        // The oracle reports more rows than the source holds.
        source.remove(2);
        geometry.set_available_size(100, 100, Anchor::Start(0), Anchor::Start(0), 0, 0);
        let layer = BodyLayer::new(Arc::new(TestBuilder), columns);

        layer
            .refresh(&geometry.sizes().unwrap(), &source, ScrollOffsets::default())
            .unwrap();
        let cell = layer.factory().widget_at(Position::new(2, 0)).unwrap();
        assert_eq!(cell.lock().text, "");
        assert!(!layer.factory().is_bound(Position::new(2, 0)));
    }

    #[test]
    fn test_row_background_stripes() {
        let (columns, geometry, _source) = setup(4);
        geometry.set_available_size(100, 100, Anchor::Start(0), Anchor::Start(0), 0, 0);
        let layer: RowBackgroundLayer<TestBuilder, RecordModel> =
            RowBackgroundLayer::new(Arc::new(TestBuilder), columns);

        layer
            .refresh(&geometry.sizes().unwrap(), ScrollOffsets::default())
            .unwrap();

        assert_eq!(
            layer.factory().positions(),
            (0..4).map(|r| Position::new(r, -1)).collect::<Vec<_>>()
        );
        let odd = layer.factory().widget_at(Position::new(1, -1)).unwrap();
        let even = layer.factory().widget_at(Position::new(2, -1)).unwrap();
        assert_eq!(odd.lock().text, "true");
        assert_eq!(even.lock().text, "false");
        assert_eq!(odd.lock().rect.map(|r| r.width), Some(80));
    }
}
