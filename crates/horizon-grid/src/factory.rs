//! Widget recycling.
//!
//! A [`WidgetFactory`] keeps a pool of live widgets keyed by the cell
//! [`Position`] they display. On every window change the owning layer calls
//! [`reconcile`](WidgetFactory::reconcile) with the cells of the new window;
//! the factory disposes widgets whose cell left the window, creates and
//! binds widgets for cells that entered it, and repositions the rest. The
//! work is proportional to the window, never to the dataset.
//!
//! Widgets are opaque to the factory. A [`WidgetBuilder`] creates them,
//! pushes values into them and releases them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::AddAssign;
use std::sync::Arc;

use horizon_grid_core::ConnectionId;
use horizon_grid_core::logging::targets;
use parking_lot::Mutex;

use crate::column::{Column, ColumnCollection};
use crate::data::{CellValue, RowModel};
use crate::error::Result;
use crate::geometry::CellRect;
use crate::position::Position;

/// The layer a widget belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Header cells (negative rows).
    Header,
    /// Data cells.
    Body,
    /// One widget per data row, spanning the whole row.
    RowBackground,
}

/// Creates, updates and releases the widgets of a grid.
pub trait WidgetBuilder: Send + Sync + 'static {
    /// The widget type.
    type Widget: Send + 'static;

    /// Creates a widget for the cell at `position`. Row-spanning widgets
    /// have no column.
    fn create(&self, layer: LayerKind, position: Position, column: Option<&Column>)
    -> Self::Widget;

    /// Shows `value` in `widget`.
    fn update(&self, widget: &mut Self::Widget, value: &CellValue);

    /// Moves `widget` to `rect`.
    fn place(&self, _widget: &mut Self::Widget, _rect: CellRect) {}

    /// Releases `widget` after it left the pool.
    fn dispose(&self, _widget: &mut Self::Widget) {}
}

/// Shared handle to a pooled widget.
pub type WidgetHandle<W> = Arc<Mutex<W>>;

/// What a widget shows during reconciliation.
pub enum CellSource<M> {
    /// Bind to a row model and follow its changes.
    Model(Arc<M>),
    /// Show a fixed value.
    Value(CellValue),
    /// Show nothing; used for cells whose model is not available yet.
    Blank,
}

impl<M> fmt::Debug for CellSource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellSource::Model(_) => f.write_str("Model"),
            CellSource::Value(value) => f.debug_tuple("Value").field(value).finish(),
            CellSource::Blank => f.write_str("Blank"),
        }
    }
}

/// Counters of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub disposed: usize,
    pub repositioned: usize,
}

impl ReconcileStats {
    /// Number of pool mutations (creates plus disposes).
    pub fn churn(&self) -> usize {
        self.created + self.disposed
    }
}

impl AddAssign for ReconcileStats {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.disposed += other.disposed;
        self.repositioned += other.repositioned;
    }
}

/// Lifetime counters of a factory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactoryStats {
    pub created: usize,
    pub disposed: usize,
}

struct Binding<M> {
    model: Arc<M>,
    connection: Option<ConnectionId>,
}

struct PooledWidget<W, M> {
    widget: WidgetHandle<W>,
    column: Option<Arc<Column>>,
    binding: Option<Binding<M>>,
    rect: Option<CellRect>,
}

/// A pool of widgets keyed by cell position.
pub struct WidgetFactory<B: WidgetBuilder, M: RowModel> {
    layer: LayerKind,
    builder: Arc<B>,
    columns: Arc<ColumnCollection>,
    pool: Mutex<HashMap<Position, PooledWidget<B::Widget, M>>>,
    stats: Mutex<FactoryStats>,
}

impl<B: WidgetBuilder, M: RowModel> WidgetFactory<B, M> {
    /// Creates an empty factory for `layer`.
    pub fn new(layer: LayerKind, builder: Arc<B>, columns: Arc<ColumnCollection>) -> Self {
        Self {
            layer,
            builder,
            columns,
            pool: Mutex::new(HashMap::new()),
            stats: Mutex::new(FactoryStats::default()),
        }
    }

    /// The layer this factory serves.
    pub fn layer(&self) -> LayerKind {
        self.layer
    }

    /// Lifetime create/dispose counters.
    pub fn stats(&self) -> FactoryStats {
        *self.stats.lock()
    }

    /// Number of pooled widgets.
    pub fn len(&self) -> usize {
        self.pool.lock().len()
    }

    /// Returns `true` if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.pool.lock().is_empty()
    }

    /// Positions of the pooled widgets, sorted row-major.
    pub fn positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.pool.lock().keys().copied().collect();
        positions.sort();
        positions
    }

    /// Every pooled widget with its position.
    pub fn widgets(&self) -> Vec<(Position, WidgetHandle<B::Widget>)> {
        self.pool
            .lock()
            .iter()
            .map(|(pos, pooled)| (*pos, pooled.widget.clone()))
            .collect()
    }

    /// The pooled widget at `position`, if any.
    pub fn widget_at(&self, position: Position) -> Option<WidgetHandle<B::Widget>> {
        self.pool.lock().get(&position).map(|p| p.widget.clone())
    }

    /// The last rectangle the widget at `position` was placed at.
    pub fn rect_at(&self, position: Position) -> Option<CellRect> {
        self.pool.lock().get(&position).and_then(|p| p.rect)
    }

    /// Whether the widget at `position` is bound to a model.
    pub fn is_bound(&self, position: Position) -> bool {
        self.pool
            .lock()
            .get(&position)
            .is_some_and(|p| p.binding.is_some())
    }

    /// Returns the pooled widget for `(row, column)`, creating it if needed.
    ///
    /// A negative `column` creates a row-spanning widget with no column.
    pub fn get_widget_for(&self, row: i64, column: i64) -> Result<WidgetHandle<B::Widget>> {
        let position = Position::new(row, column);
        if let Some(existing) = self.widget_at(position) {
            return Ok(existing);
        }

        let column = match usize::try_from(column) {
            Ok(index) => Some(self.columns.get_column(index)?),
            Err(_) => None,
        };
        let widget = Arc::new(Mutex::new(self.builder.create(
            self.layer,
            position,
            column.as_deref(),
        )));
        self.pool.lock().insert(
            position,
            PooledWidget {
                widget: widget.clone(),
                column,
                binding: None,
                rect: None,
            },
        );
        self.stats.lock().created += 1;
        tracing::trace!(target: targets::FACTORY, layer = ?self.layer, %position, "widget created");
        Ok(widget)
    }

    /// Binds the widget at `position` to `model`, replacing any previous
    /// binding. Returns `false` if no widget is pooled there.
    ///
    /// The widget shows the model's value for its column's path and follows
    /// later changes of that path until unbound.
    pub fn bind_widget(&self, position: Position, model: Arc<M>) -> bool {
        self.unbind_widget(position);

        let (widget, column) = match self.pool.lock().get(&position) {
            Some(pooled) => (pooled.widget.clone(), pooled.column.clone()),
            None => return false,
        };

        let connection = column.map(|column| {
            let path = column.path().to_string();
            self.builder
                .update(&mut widget.lock(), &model.value(&path));

            let builder = self.builder.clone();
            let weak_widget = Arc::downgrade(&widget);
            let weak_model = Arc::downgrade(&model);
            model.changed().connect(move |changed_path| {
                if *changed_path != path {
                    return;
                }
                if let (Some(widget), Some(model)) = (weak_widget.upgrade(), weak_model.upgrade()) {
                    builder.update(&mut widget.lock(), &model.value(&path));
                }
            })
        });

        match self.pool.lock().get_mut(&position) {
            Some(pooled) => {
                pooled.binding = Some(Binding { model, connection });
                true
            }
            None => {
                if let Some(id) = connection {
                    model.changed().disconnect(id);
                }
                false
            }
        }
    }

    /// Tears down the binding of the widget at `position`.
    ///
    /// A model that its data source already disposed is tolerated: the
    /// binding is forgotten without touching the model. Returns `true` if a
    /// binding was removed.
    pub fn unbind_widget(&self, position: Position) -> bool {
        let binding = match self.pool.lock().get_mut(&position) {
            Some(pooled) => pooled.binding.take(),
            None => None,
        };
        let Some(binding) = binding else {
            return false;
        };

        if binding.model.is_disposed() {
            tracing::warn!(
                target: targets::FACTORY,
                %position,
                "unbinding widget from a disposed model"
            );
        } else if let Some(id) = binding.connection {
            binding.model.changed().disconnect(id);
        }
        true
    }

    /// Shows a fixed value in the widget at `position`, dropping any model
    /// binding.
    pub fn set_value(&self, position: Position, value: &CellValue) -> bool {
        self.unbind_widget(position);
        let widget = self.widget_at(position);
        match widget {
            Some(widget) => {
                self.builder.update(&mut widget.lock(), value);
                true
            }
            None => false,
        }
    }

    /// Unbinds, removes and releases the widget at `position`.
    pub fn dispose_widget(&self, position: Position) -> bool {
        self.unbind_widget(position);
        let Some(pooled) = self.pool.lock().remove(&position) else {
            return false;
        };
        self.builder.dispose(&mut pooled.widget.lock());
        self.stats.lock().disposed += 1;
        tracing::trace!(target: targets::FACTORY, layer = ?self.layer, %position, "widget disposed");
        true
    }

    /// Disposes every pooled widget.
    pub fn dispose_all_widgets(&self) -> usize {
        let positions = self.positions();
        positions
            .into_iter()
            .filter(|&pos| self.dispose_widget(pos))
            .count()
    }

    /// Brings the pool in line with a new window.
    ///
    /// `cells` lists every cell of the new window with its rectangle and
    /// what it should show. Widgets for cells not listed are disposed; cells
    /// without a widget get a new one; surviving widgets are moved, and
    /// rebound if their model changed.
    ///
    /// A widget was created for the column that sat at its index back then.
    /// Once the collection is edited another column may sit there, so such
    /// widgets are disposed and created again for the new column.
    pub fn reconcile<I>(&self, cells: I) -> Result<ReconcileStats>
    where
        I: IntoIterator<Item = (Position, CellRect, CellSource<M>)>,
    {
        let cells: Vec<_> = cells.into_iter().collect();
        let wanted: HashSet<Position> = cells.iter().map(|(pos, _, _)| *pos).collect();
        let mut stats = ReconcileStats::default();

        let stale: Vec<Position> = self
            .pool
            .lock()
            .iter()
            .filter(|&(pos, pooled)| !wanted.contains(pos) || !self.shows_column_at(pos, pooled))
            .map(|(pos, _)| *pos)
            .collect();
        for position in stale {
            if self.dispose_widget(position) {
                stats.disposed += 1;
            }
        }

        for (position, rect, source) in cells {
            let existed = self.pool.lock().contains_key(&position);
            if !existed {
                self.get_widget_for(position.row, position.column)?;
                stats.created += 1;
            }

            match source {
                CellSource::Model(model) => {
                    if !existed || !self.is_bound_to(position, &model) {
                        self.bind_widget(position, model);
                    }
                }
                CellSource::Value(value) => {
                    self.set_value(position, &value);
                }
                CellSource::Blank => {
                    if !existed || self.is_bound(position) {
                        self.set_value(position, &CellValue::Empty);
                    }
                }
            }

            if self.place(position, rect) && existed {
                stats.repositioned += 1;
            }
        }

        tracing::debug!(
            target: targets::FACTORY,
            layer = ?self.layer,
            created = stats.created,
            disposed = stats.disposed,
            repositioned = stats.repositioned,
            "window reconciled"
        );
        Ok(stats)
    }

    /// Whether the widget still shows the column currently at its index.
    fn shows_column_at(&self, position: &Position, pooled: &PooledWidget<B::Widget, M>) -> bool {
        match (usize::try_from(position.column), &pooled.column) {
            (Err(_), None) => true,
            (Ok(index), Some(column)) => self
                .columns
                .get_column(index)
                .is_ok_and(|current| Arc::ptr_eq(&current, column)),
            _ => false,
        }
    }

    fn is_bound_to(&self, position: Position, model: &Arc<M>) -> bool {
        self.pool
            .lock()
            .get(&position)
            .and_then(|p| p.binding.as_ref())
            .is_some_and(|b| Arc::ptr_eq(&b.model, model))
    }

    /// Moves the widget at `position`; returns `true` if its rectangle
    /// changed.
    fn place(&self, position: Position, rect: CellRect) -> bool {
        let widget = {
            let mut pool = self.pool.lock();
            let Some(pooled) = pool.get_mut(&position) else {
                return false;
            };
            if pooled.rect == Some(rect) {
                return false;
            }
            pooled.rect = Some(rect);
            pooled.widget.clone()
        };
        self.builder.place(&mut widget.lock(), rect);
        true
    }
}

impl<B: WidgetBuilder, M: RowModel> Drop for WidgetFactory<B, M> {
    fn drop(&mut self) {
        self.dispose_all_widgets();
    }
}

impl<B: WidgetBuilder, M: RowModel> fmt::Debug for WidgetFactory<B, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetFactory")
            .field("layer", &self.layer)
            .field("pooled", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
