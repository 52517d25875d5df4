//! Grid-wide layout constants.

use horizon_grid_core::{Property, Signal};

/// Identifies which [`Styling`] value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StylingProperty {
    NumHeaderRows,
    NumFixedRows,
    NumFixedColumns,
    MinRowHeight,
    MaxRowHeight,
    HorizontalSpacing,
    VerticalSpacing,
}

/// Layout constants shared by the geometry engine and every layer.
///
/// Each setter emits [`changed`](Self::changed) after storing the new value,
/// so observers always read the updated state.
pub struct Styling {
    num_header_rows: Property<u32>,
    num_fixed_rows: Property<u32>,
    num_fixed_columns: Property<u32>,
    min_row_height: Property<i32>,
    max_row_height: Property<Option<i32>>,
    horizontal_spacing: Property<i32>,
    vertical_spacing: Property<i32>,
    /// Emitted after any value changed.
    pub changed: Signal<StylingProperty>,
}

impl Default for Styling {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! styling_accessors {
    ($($(#[$doc:meta])* $get:ident, $set:ident, $field:ident: $ty:ty => $variant:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $get(&self) -> $ty {
                self.$field.get()
            }

            #[doc = concat!("Sets `", stringify!($field), "`.")]
            pub fn $set(&self, value: $ty) {
                if self.$field.set(value) {
                    self.changed.emit(StylingProperty::$variant);
                }
            }
        )*
    };
}

impl Styling {
    /// Creates a styling record with no headers, no fixed rows or columns,
    /// no spacing and unbounded row heights.
    pub fn new() -> Self {
        Self {
            num_header_rows: Property::new(0),
            num_fixed_rows: Property::new(0),
            num_fixed_columns: Property::new(0),
            min_row_height: Property::new(0),
            max_row_height: Property::new(None),
            horizontal_spacing: Property::new(0),
            vertical_spacing: Property::new(0),
            changed: Signal::new(),
        }
    }

    styling_accessors! {
        /// Number of header rows, addressed as rows `-1, -2, ...`.
        num_header_rows, set_num_header_rows, num_header_rows: u32 => NumHeaderRows;
        /// Number of pinned data rows at the top.
        num_fixed_rows, set_num_fixed_rows, num_fixed_rows: u32 => NumFixedRows;
        /// Number of pinned columns on the left.
        num_fixed_columns, set_num_fixed_columns, num_fixed_columns: u32 => NumFixedColumns;
        /// Lower bound for every row height.
        min_row_height, set_min_row_height, min_row_height: i32 => MinRowHeight;
        /// Upper bound for every row height; `None` is unbounded.
        max_row_height, set_max_row_height, max_row_height: Option<i32> => MaxRowHeight;
        /// Pixels between adjacent columns.
        horizontal_spacing, set_horizontal_spacing, horizontal_spacing: i32 => HorizontalSpacing;
        /// Pixels between adjacent rows.
        vertical_spacing, set_vertical_spacing, vertical_spacing: i32 => VerticalSpacing;
    }

    /// Clamps a row height to the global bounds.
    pub fn clamp_row_height(&self, height: i32) -> i32 {
        let height = height.max(self.min_row_height());
        match self.max_row_height() {
            Some(max) => height.min(max),
            None => height,
        }
    }
}

impl std::fmt::Debug for Styling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Styling")
            .field("num_header_rows", &self.num_header_rows())
            .field("num_fixed_rows", &self.num_fixed_rows())
            .field("num_fixed_columns", &self.num_fixed_columns())
            .field("min_row_height", &self.min_row_height())
            .field("max_row_height", &self.max_row_height())
            .field("horizontal_spacing", &self.horizontal_spacing())
            .field("vertical_spacing", &self.vertical_spacing())
            .finish()
    }
}
