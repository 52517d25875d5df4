//! Column descriptors and ordered column collections.
//!
//! A [`Column`] describes how one column of the grid reads its value (the
//! `path` into a row model) and how wide it wants to be. Columns are shared
//! as `Arc<Column>`; identity is pointer identity, so the same descriptor can
//! appear in a source collection and in any number of filtered views.
//!
//! A [`ColumnCollection`] is an ordered set of columns with structured change
//! notification. A *filtered view* (see [`ColumnCollection::filtered`]) only
//! admits columns that are present in its source and can be sorted without
//! touching the source order.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_grid_core::logging::targets;
use horizon_grid_core::{ConnectionGuard, Property, Signal};
use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};

/// Identifies which property of a [`Column`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnProperty {
    /// The header caption.
    Caption,
    /// The explicit width.
    Width,
    /// The minimum width.
    MinWidth,
    /// The maximum width.
    MaxWidth,
    /// The flex weight.
    Flex,
    /// The read-only flag.
    ReadOnly,
}

/// A column descriptor.
///
/// Width-related properties are mutated by the host application, never by
/// the geometry engine. A column with `flex > 0` and no explicit width is a
/// *flexible* column: its width is solved from the space left over by the
/// other visible columns.
pub struct Column {
    path: String,
    caption: Property<String>,
    width: Property<Option<i32>>,
    min_width: Property<Option<i32>>,
    max_width: Property<Option<i32>>,
    flex: Property<u32>,
    read_only: Property<bool>,
    /// Emitted after a property of this column changed.
    pub changed: Signal<ColumnProperty>,
}

impl Column {
    /// Creates a column reading `path` from each row model.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            caption: Property::new(String::new()),
            width: Property::new(None),
            min_width: Property::new(None),
            max_width: Property::new(None),
            flex: Property::new(0),
            read_only: Property::new(false),
            changed: Signal::new(),
        }
    }

    /// Sets the caption (builder pattern).
    pub fn with_caption(self, caption: impl Into<String>) -> Self {
        self.caption.set_silent(caption.into());
        self
    }

    /// Sets an explicit width (builder pattern).
    pub fn with_width(self, width: i32) -> Self {
        self.width.set_silent(Some(width));
        self
    }

    /// Sets the minimum width (builder pattern).
    pub fn with_min_width(self, min_width: i32) -> Self {
        self.min_width.set_silent(Some(min_width));
        self
    }

    /// Sets the maximum width (builder pattern).
    pub fn with_max_width(self, max_width: i32) -> Self {
        self.max_width.set_silent(Some(max_width));
        self
    }

    /// Sets the flex weight (builder pattern).
    pub fn with_flex(self, flex: u32) -> Self {
        self.flex.set_silent(flex);
        self
    }

    /// Marks the column read-only (builder pattern).
    pub fn with_read_only(self, read_only: bool) -> Self {
        self.read_only.set_silent(read_only);
        self
    }

    /// The path used to read this column's value from a row model.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The header caption.
    pub fn caption(&self) -> String {
        self.caption.get()
    }

    /// The explicit width, if any.
    pub fn width(&self) -> Option<i32> {
        self.width.get()
    }

    /// The minimum width, if any.
    pub fn min_width(&self) -> Option<i32> {
        self.min_width.get()
    }

    /// The maximum width, if any.
    pub fn max_width(&self) -> Option<i32> {
        self.max_width.get()
    }

    /// The flex weight; `0` means fixed.
    pub fn flex(&self) -> u32 {
        self.flex.get()
    }

    /// Whether cells of this column are read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only.get()
    }

    /// Whether the width of this column is solved rather than stored.
    pub fn is_flexible(&self) -> bool {
        self.flex() > 0 && self.width().is_none()
    }

    /// Sets the caption.
    pub fn set_caption(&self, caption: impl Into<String>) {
        if self.caption.set(caption.into()) {
            self.changed.emit(ColumnProperty::Caption);
        }
    }

    /// Sets or clears the explicit width.
    pub fn set_width(&self, width: Option<i32>) {
        if self.width.set(width) {
            self.changed.emit(ColumnProperty::Width);
        }
    }

    /// Sets or clears the minimum width.
    pub fn set_min_width(&self, min_width: Option<i32>) {
        if self.min_width.set(min_width) {
            self.changed.emit(ColumnProperty::MinWidth);
        }
    }

    /// Sets or clears the maximum width.
    pub fn set_max_width(&self, max_width: Option<i32>) {
        if self.max_width.set(max_width) {
            self.changed.emit(ColumnProperty::MaxWidth);
        }
    }

    /// Sets the flex weight.
    pub fn set_flex(&self, flex: u32) {
        if self.flex.set(flex) {
            self.changed.emit(ColumnProperty::Flex);
        }
    }

    /// Sets the read-only flag.
    pub fn set_read_only(&self, read_only: bool) {
        if self.read_only.set(read_only) {
            self.changed.emit(ColumnProperty::ReadOnly);
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("path", &self.path)
            .field("caption", &self.caption())
            .field("width", &self.width())
            .field("min_width", &self.min_width())
            .field("max_width", &self.max_width())
            .field("flex", &self.flex())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

/// The kind of a [`ColumnChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnChangeKind {
    /// A column was added, or relocated when `moved` is set.
    Add,
    /// A column was removed.
    Remove,
    /// The order of the collection changed.
    Order,
    /// A property of a member column changed.
    Update,
    /// The whole membership was replaced.
    Reset,
}

/// A structured change event emitted by a [`ColumnCollection`].
#[derive(Debug, Clone)]
pub struct ColumnChange {
    /// What happened.
    pub kind: ColumnChangeKind,
    /// The column concerned, for `Add`, `Remove` and `Update`.
    pub column: Option<Arc<Column>>,
    /// For `Add`: the column was already present and has been relocated.
    pub moved: bool,
}

impl ColumnChange {
    fn new(kind: ColumnChangeKind, column: Option<Arc<Column>>, moved: bool) -> Self {
        Self {
            kind,
            column,
            moved,
        }
    }
}

/// Addresses a column of a source collection in [`ColumnCollection::add_range`].
#[derive(Debug, Clone)]
pub enum ColumnRef {
    /// A column by its index in the source.
    Index(usize),
    /// A column by identity; resolved to its index in the source.
    Column(Arc<Column>),
    /// One past the last column of the source.
    End,
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<Arc<Column>> for ColumnRef {
    fn from(column: Arc<Column>) -> Self {
        Self::Column(column)
    }
}

fn column_key(column: &Arc<Column>) -> usize {
    Arc::as_ptr(column) as usize
}

/// An ordered, observable collection of columns.
///
/// Every mutator fires a [`ColumnChange`] on [`changed`](Self::changed)
/// after the collection has been updated. Member columns forward their own
/// property changes as [`ColumnChangeKind::Update`].
pub struct ColumnCollection {
    columns: RwLock<Vec<Arc<Column>>>,
    forwarders: Mutex<HashMap<usize, ConnectionGuard>>,
    source: Option<Arc<ColumnCollection>>,
    source_guard: Mutex<Option<ConnectionGuard>>,
    read_only: AtomicBool,
    changed: Arc<Signal<ColumnChange>>,
}

impl Default for ColumnCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnCollection {
    /// Creates an empty collection that admits any column.
    pub fn new() -> Self {
        Self::with_source(None)
    }

    fn with_source(source: Option<Arc<ColumnCollection>>) -> Self {
        Self {
            columns: RwLock::new(Vec::new()),
            forwarders: Mutex::new(HashMap::new()),
            source,
            source_guard: Mutex::new(None),
            read_only: AtomicBool::new(false),
            changed: Arc::new(Signal::new()),
        }
    }

    /// Creates a collection holding `columns` in order.
    pub fn from_columns(columns: impl IntoIterator<Item = Arc<Column>>) -> Result<Self> {
        let collection = Self::new();
        for column in columns {
            collection.add(column)?;
        }
        Ok(collection)
    }

    /// Creates an empty filtered view of `source`.
    ///
    /// The view only admits columns present in `source`, and drops a column
    /// when the source removes it.
    pub fn filtered(source: &Arc<ColumnCollection>) -> Arc<Self> {
        let view = Arc::new(Self::with_source(Some(source.clone())));
        let weak_view: Weak<ColumnCollection> = Arc::downgrade(&view);
        let guard = source.changed.connect_scoped(move |change| {
            if change.kind != ColumnChangeKind::Remove {
                return;
            }
            if let (Some(view), Some(column)) = (weak_view.upgrade(), &change.column) {
                view.remove_unchecked(column);
            }
        });
        *view.source_guard.lock() = Some(guard);
        view
    }

    /// The change notification signal.
    pub fn changed(&self) -> &Signal<ColumnChange> {
        &self.changed
    }

    /// The source of a filtered view.
    pub fn source(&self) -> Option<&Arc<ColumnCollection>> {
        self.source.as_ref()
    }

    /// Whether `column` may be a member of this collection.
    pub fn is_valid(&self, column: &Arc<Column>) -> bool {
        match &self.source {
            Some(source) => source.index_of(column).is_some(),
            None => true,
        }
    }

    /// Seals (or unseals) the collection against modification.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Whether the collection is sealed.
    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.read().len()
    }

    /// Returns `true` if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.read().is_empty()
    }

    /// Returns the column at `index`.
    pub fn get_column(&self, index: usize) -> Result<Arc<Column>> {
        let columns = self.columns.read();
        columns
            .get(index)
            .cloned()
            .ok_or_else(|| Error::column_out_of_range(index, columns.len()))
    }

    /// Returns the index of `column`, or `None` if it is not a member.
    pub fn index_of(&self, column: &Arc<Column>) -> Option<usize> {
        self.columns
            .read()
            .iter()
            .position(|c| Arc::ptr_eq(c, column))
    }

    /// Returns `true` if `column` is a member.
    pub fn contains(&self, column: &Arc<Column>) -> bool {
        self.index_of(column).is_some()
    }

    /// A snapshot of the columns in their current order.
    pub fn columns(&self) -> Vec<Arc<Column>> {
        self.columns.read().clone()
    }

    /// Iterates a snapshot of the columns in their current order.
    pub fn iter(&self) -> std::vec::IntoIter<Arc<Column>> {
        self.columns().into_iter()
    }

    /// Appends `column`, or relocates it to the end if already present.
    pub fn add(&self, column: Arc<Column>) -> Result<()> {
        self.check_mutable(&column)?;
        let moved = {
            let mut columns = self.columns.write();
            let moved = Self::detach(&mut columns, &column);
            columns.push(column.clone());
            moved
        };
        self.finish_add(column, moved);
        Ok(())
    }

    /// Inserts `column` before `before`; `None` (or a non-member) prepends.
    pub fn insert_before(&self, column: Arc<Column>, before: Option<&Arc<Column>>) -> Result<()> {
        self.check_mutable(&column)?;
        let moved = {
            let mut columns = self.columns.write();
            let moved = Self::detach(&mut columns, &column);
            let at = before
                .and_then(|b| columns.iter().position(|c| Arc::ptr_eq(c, b)))
                .unwrap_or(0);
            columns.insert(at, column.clone());
            moved
        };
        self.finish_add(column, moved);
        Ok(())
    }

    /// Inserts `column` after `after`; `None` (or a non-member) appends.
    pub fn insert_after(&self, column: Arc<Column>, after: Option<&Arc<Column>>) -> Result<()> {
        self.check_mutable(&column)?;
        let moved = {
            let mut columns = self.columns.write();
            let moved = Self::detach(&mut columns, &column);
            let at = after
                .and_then(|a| columns.iter().position(|c| Arc::ptr_eq(c, a)))
                .map_or(columns.len(), |i| i + 1);
            columns.insert(at, column.clone());
            moved
        };
        self.finish_add(column, moved);
        Ok(())
    }

    /// Removes `column`. Returns `true` and fires a change only if it was
    /// present.
    pub fn remove(&self, column: &Arc<Column>) -> Result<bool> {
        if self.is_read_only() {
            return Err(Error::ReadOnlyCollection);
        }
        Ok(self.remove_unchecked(column))
    }

    fn remove_unchecked(&self, column: &Arc<Column>) -> bool {
        let removed = {
            let mut columns = self.columns.write();
            Self::detach(&mut columns, column)
        };
        if removed {
            self.forwarders.lock().remove(&column_key(column));
            tracing::trace!(target: targets::COLUMNS, path = column.path(), "column removed");
            self.changed.emit(ColumnChange::new(
                ColumnChangeKind::Remove,
                Some(column.clone()),
                false,
            ));
        }
        removed
    }

    /// Replaces the whole membership with `columns`.
    pub fn set_columns(&self, columns: Vec<Arc<Column>>) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::ReadOnlyCollection);
        }
        if let Some(invalid) = columns.iter().find(|c| !self.is_valid(c)) {
            return Err(Error::column_not_in_source(invalid.path()));
        }
        {
            let mut forwarders = self.forwarders.lock();
            forwarders.clear();
            for column in &columns {
                forwarders.insert(column_key(column), self.forward_changes(column));
            }
        }
        *self.columns.write() = columns;
        self.changed
            .emit(ColumnChange::new(ColumnChangeKind::Reset, None, false));
        Ok(())
    }

    /// Copies the source columns `[start, end)` into this filtered view.
    ///
    /// Column references are resolved to source indices first; `End` means
    /// "through the last source column".
    pub fn add_range(&self, start: impl Into<ColumnRef>, end: impl Into<ColumnRef>) -> Result<()> {
        let source = self.source.as_ref().ok_or(Error::NotFilteredView)?;
        let source_columns = source.columns();
        let resolve = |reference: ColumnRef| -> Result<usize> {
            match reference {
                ColumnRef::Index(index) => Ok(index.min(source_columns.len())),
                ColumnRef::Column(column) => source
                    .index_of(&column)
                    .ok_or_else(|| Error::column_not_in_source(column.path())),
                ColumnRef::End => Ok(source_columns.len()),
            }
        };
        let start = resolve(start.into())?;
        let end = resolve(end.into())?;
        for column in source_columns.iter().take(end).skip(start) {
            self.add(column.clone())?;
        }
        Ok(())
    }

    /// Sorts this collection with `compare`, then fires an `Order` change.
    ///
    /// On a filtered view only the view is reordered; the source keeps its
    /// order.
    pub fn sort_by<F>(&self, compare: F) -> Result<()>
    where
        F: FnMut(&Arc<Column>, &Arc<Column>) -> CmpOrdering,
    {
        if self.is_read_only() {
            return Err(Error::ReadOnlyCollection);
        }
        self.columns.write().sort_by(compare);
        self.changed
            .emit(ColumnChange::new(ColumnChangeKind::Order, None, false));
        Ok(())
    }

    fn check_mutable(&self, column: &Arc<Column>) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::ReadOnlyCollection);
        }
        if !self.is_valid(column) {
            return Err(Error::column_not_in_source(column.path()));
        }
        Ok(())
    }

    /// Removes `column` from `columns`, returning whether it was present.
    fn detach(columns: &mut Vec<Arc<Column>>, column: &Arc<Column>) -> bool {
        match columns.iter().position(|c| Arc::ptr_eq(c, column)) {
            Some(index) => {
                columns.remove(index);
                true
            }
            None => false,
        }
    }

    fn finish_add(&self, column: Arc<Column>, moved: bool) {
        if !moved {
            let guard = self.forward_changes(&column);
            self.forwarders.lock().insert(column_key(&column), guard);
        }
        tracing::trace!(target: targets::COLUMNS, path = column.path(), moved, "column added");
        self.changed.emit(ColumnChange::new(
            ColumnChangeKind::Add,
            Some(column),
            moved,
        ));
    }

    fn forward_changes(&self, column: &Arc<Column>) -> ConnectionGuard {
        let changed = self.changed.clone();
        let weak_column = Arc::downgrade(column);
        column.changed.connect_scoped(move |_| {
            if let Some(column) = weak_column.upgrade() {
                changed.emit(ColumnChange::new(
                    ColumnChangeKind::Update,
                    Some(column),
                    false,
                ));
            }
        })
    }
}

impl fmt::Debug for ColumnCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<String> = self.columns.read().iter().map(|c| c.path.clone()).collect();
        f.debug_struct("ColumnCollection")
            .field("columns", &paths)
            .field("filtered", &self.source.is_some())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}
