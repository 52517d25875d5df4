//! Horizon Grid - a virtualized data grid.
//!
//! Only the cells that fit the viewport exist as widgets. The crate is split
//! into three parts:
//!
//! - **Geometry** ([`GridGeometry`]): given the columns, the [`Styling`]
//!   constants, a [`SizeOracle`] and a viewport, computes which rows and
//!   columns are visible and how large each one is. The result
//!   ([`GridSizes`]) is cached until an input changes.
//! - **Widgets** ([`WidgetFactory`] and the layers): keeps one widget per
//!   visible cell, creating, reusing and disposing widgets as the window
//!   moves, and binds each to its row model.
//! - **Data** ([`DataSource`], [`TreeDataSource`]): supplies row models and
//!   fetches windows asynchronously.
//!
//! [`ScrollingGrid`] drives all three from viewport and scroll input.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use horizon_grid::prelude::*;
//!
//! let (styling, columns) = GridConfig::from_toml_str(CONFIG)?.build()?;
//! let source = Arc::new(ArrayDataSource::with_rows(columns.len(), records));
//! let extent = source.clone();
//! let oracle: Arc<dyn SizeOracle> = Arc::new(FnSizeOracle::new(
//!     |_row, _column: &Column| SizeHint::with_height(24),
//!     move || extent.size(),
//! ));
//! let geometry = Arc::new(GridGeometry::new(columns, styling, oracle));
//! let grid = ScrollingGrid::new(geometry, source, Arc::new(MyBuilder));
//!
//! grid.resize(800, 600);
//! grid.update().await?;
//! grid.roll(3, 0);
//! grid.update().await?;
//! ```

pub mod column;
pub mod column_label;
pub mod config;
pub mod data;
pub mod data_source;
pub mod error;
pub mod factory;
pub mod geometry;
pub mod layers;
pub mod position;
pub mod prelude;
pub mod range;
pub mod scrolling;
pub mod selection;
pub mod size;
pub mod styling;
pub mod tree_source;

pub use horizon_grid_core::{ConnectionGuard, ConnectionId, Property, Signal};

pub use column::{Column, ColumnChange, ColumnChangeKind, ColumnCollection, ColumnProperty, ColumnRef};
pub use column_label::column_label;
pub use config::{ColumnConfig, GridConfig, StylingConfig};
pub use data::{CellValue, RecordModel, RowModel};
pub use data_source::{ArrayDataSource, DataSource};
pub use error::{Error, Result};
pub use factory::{
    CellSource, FactoryStats, LayerKind, ReconcileStats, WidgetBuilder, WidgetFactory, WidgetHandle,
};
pub use geometry::{Anchor, CellRect, ColumnSize, GridGeometry, GridSizes, RowSize};
pub use layers::{BodyLayer, HeaderLayer, RowBackgroundLayer, ScrollOffsets, header_text};
pub use position::Position;
pub use range::{Range, RangeHolder};
pub use scrolling::{ScrollBar, ScrollBars, ScrollingGrid, UpdateOutcome};
pub use selection::Selection;
pub use size::{FnSizeOracle, SizeHint, SizeOracle};
pub use styling::{Styling, StylingProperty};
pub use tree_source::{NodeState, TreeChange, TreeDataSource, TreeProvider};
