//! Prelude module for Horizon Grid.
//!
//! ```ignore
//! use horizon_grid::prelude::*;
//! ```
//!
//! This provides access to:
//! - Signal/slot system (`Signal`, `Property`)
//! - Cell addressing (`Position`, `Range`)
//! - Columns, styling and configuration
//! - The geometry engine and size oracle
//! - Widget building and the scrolling grid
//! - Data sources

// ============================================================================
// Signal/Slot and Property System
// ============================================================================

pub use horizon_grid_core::{ConnectionGuard, ConnectionId, Property, Signal};

// ============================================================================
// Addressing
// ============================================================================

pub use crate::position::Position;
pub use crate::range::{Range, RangeHolder};

// ============================================================================
// Columns, Styling, Configuration
// ============================================================================

pub use crate::column::{Column, ColumnChangeKind, ColumnCollection};
pub use crate::config::GridConfig;
pub use crate::styling::Styling;

// ============================================================================
// Geometry
// ============================================================================

pub use crate::geometry::{Anchor, CellRect, GridGeometry, GridSizes};
pub use crate::size::{FnSizeOracle, SizeHint, SizeOracle};

// ============================================================================
// Widgets
// ============================================================================

pub use crate::factory::{LayerKind, WidgetBuilder};
pub use crate::layers::ScrollOffsets;
pub use crate::scrolling::{ScrollingGrid, UpdateOutcome};

// ============================================================================
// Data
// ============================================================================

pub use crate::data::{CellValue, RecordModel, RowModel};
pub use crate::data_source::{ArrayDataSource, DataSource};
pub use crate::tree_source::{TreeDataSource, TreeProvider};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{Error, Result};
