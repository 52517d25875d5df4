//! Cell values and row models.
//!
//! A row model is the object a data source hands out for one logical row.
//! Widgets read cell values from it through a column's `path` and listen to
//! its `changed` signal while bound.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use horizon_grid_core::Signal;
use parking_lot::RwLock;

/// The value of one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// No value; renders blank.
    #[default]
    Empty,
    /// Text.
    Text(String),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Boolean.
    Bool(bool),
}

impl CellValue {
    /// Returns `true` if this is `CellValue::Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Attempts to get the value as a string slice.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// The model backing one logical row.
///
/// Data sources may dispose a model at any time (for example when evicting
/// rows that scrolled far away). A disposed model keeps answering `value`
/// but must not be observed any more; [`is_disposed`](Self::is_disposed)
/// lets binders skip tearing down connections on it.
pub trait RowModel: Send + Sync + 'static {
    /// Reads the value at `path`; unknown paths read as `Empty`.
    fn value(&self, path: &str) -> CellValue;

    /// Whether the owning data source has disposed this model.
    fn is_disposed(&self) -> bool;

    /// Emitted with the path of a value after it changed.
    fn changed(&self) -> &Signal<String>;
}

/// A row model backed by a path → value map.
pub struct RecordModel {
    values: RwLock<HashMap<String, CellValue>>,
    disposed: AtomicBool,
    changed: Signal<String>,
}

impl Default for RecordModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordModel {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            disposed: AtomicBool::new(false),
            changed: Signal::new(),
        }
    }

    /// Creates a record from `(path, value)` pairs.
    pub fn from_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        let record = Self::new();
        {
            let mut map = record.values.write();
            for (path, value) in values {
                map.insert(path.into(), value.into());
            }
        }
        record
    }

    /// Stores `value` at `path`, emitting `changed` if it differs.
    pub fn set(&self, path: &str, value: impl Into<CellValue>) {
        let value = value.into();
        let changed = {
            let mut values = self.values.write();
            if values.get(path) == Some(&value) {
                false
            } else {
                values.insert(path.to_string(), value);
                true
            }
        };
        if changed {
            self.changed.emit(path.to_string());
        }
    }

    /// A copy of every stored value.
    pub fn to_map(&self) -> HashMap<String, CellValue> {
        self.values.read().clone()
    }

    /// Marks the record disposed and drops all observers.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.changed.disconnect_all();
        }
    }
}

impl RowModel for RecordModel {
    fn value(&self, path: &str) -> CellValue {
        self.values.read().get(path).cloned().unwrap_or_default()
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn changed(&self) -> &Signal<String> {
        &self.changed
    }
}

impl fmt::Debug for RecordModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordModel")
            .field("values", &*self.values.read())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

static_assertions::assert_impl_all!(RecordModel: Send, Sync);
