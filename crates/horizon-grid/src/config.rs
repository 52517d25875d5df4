//! Declarative grid setup from TOML.
//!
//! ```ignore
//! let config = GridConfig::from_toml_str(r#"
//! [styling]
//! num_header_rows = 1
//! num_fixed_columns = 1
//!
//! [[columns]]
//! path = "name"
//! caption = "Name"
//! width = 120
//!
//! [[columns]]
//! path = "notes"
//! flex = 1
//! "#)?;
//! let (styling, columns) = config.build()?;
//! ```

use std::sync::Arc;

use serde::Deserialize;

use crate::column::{Column, ColumnCollection};
use crate::error::Result;
use crate::styling::Styling;

/// Styling values; unset fields keep the [`Styling`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylingConfig {
    pub num_header_rows: Option<u32>,
    pub num_fixed_rows: Option<u32>,
    pub num_fixed_columns: Option<u32>,
    pub min_row_height: Option<i32>,
    pub max_row_height: Option<i32>,
    pub horizontal_spacing: Option<i32>,
    pub vertical_spacing: Option<i32>,
}

/// One column declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub path: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub min_width: Option<i32>,
    #[serde(default)]
    pub max_width: Option<i32>,
    #[serde(default)]
    pub flex: u32,
    #[serde(default)]
    pub read_only: bool,
}

impl ColumnConfig {
    fn to_column(&self) -> Column {
        let mut column = Column::new(self.path.clone())
            .with_flex(self.flex)
            .with_read_only(self.read_only);
        if let Some(caption) = &self.caption {
            column = column.with_caption(caption.clone());
        }
        if let Some(width) = self.width {
            column = column.with_width(width);
        }
        if let Some(min_width) = self.min_width {
            column = column.with_min_width(min_width);
        }
        if let Some(max_width) = self.max_width {
            column = column.with_max_width(max_width);
        }
        column
    }
}

/// A complete grid description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub styling: StylingConfig,
    pub columns: Vec<ColumnConfig>,
}

impl GridConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Creates the styling record and the column collection, columns in
    /// declaration order.
    pub fn build(&self) -> Result<(Arc<Styling>, Arc<ColumnCollection>)> {
        let styling = Styling::new();
        let s = &self.styling;
        if let Some(v) = s.num_header_rows {
            styling.set_num_header_rows(v);
        }
        if let Some(v) = s.num_fixed_rows {
            styling.set_num_fixed_rows(v);
        }
        if let Some(v) = s.num_fixed_columns {
            styling.set_num_fixed_columns(v);
        }
        if let Some(v) = s.min_row_height {
            styling.set_min_row_height(v);
        }
        if s.max_row_height.is_some() {
            styling.set_max_row_height(s.max_row_height);
        }
        if let Some(v) = s.horizontal_spacing {
            styling.set_horizontal_spacing(v);
        }
        if let Some(v) = s.vertical_spacing {
            styling.set_vertical_spacing(v);
        }

        let columns =
            ColumnCollection::from_columns(self.columns.iter().map(|c| Arc::new(c.to_column())))?;
        tracing::debug!(
            target: horizon_grid_core::logging::targets::COLUMNS,
            columns = columns.len(),
            "grid configuration built"
        );
        Ok((Arc::new(styling), Arc::new(columns)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SAMPLE: &str = r#"
[styling]
num_header_rows = 1
num_fixed_columns = 1
min_row_height = 20
max_row_height = 200
vertical_spacing = 1

[[columns]]
path = "name"
caption = "Name"
width = 120
min_width = 40

[[columns]]
path = "notes"
flex = 2
read_only = true
"#;

    #[test]
    fn test_parse_sample() {
        let config = GridConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.styling.num_header_rows, Some(1));
        assert_eq!(config.styling.horizontal_spacing, None);
        assert_eq!(config.columns.len(), 2);
        assert_eq!(config.columns[0].width, Some(120));
        assert_eq!(config.columns[1].flex, 2);
        assert!(config.columns[1].read_only);
    }

    #[test]
    fn test_build() {
        let (styling, columns) = GridConfig::from_toml_str(SAMPLE).unwrap().build().unwrap();
        assert_eq!(styling.num_header_rows(), 1);
        assert_eq!(styling.num_fixed_columns(), 1);
        assert_eq!(styling.min_row_height(), 20);
        assert_eq!(styling.max_row_height(), Some(200));
        assert_eq!(styling.horizontal_spacing(), 0);

        let name = columns.get_column(0).unwrap();
        assert_eq!(name.path(), "name");
        assert_eq!(name.caption(), "Name");
        assert_eq!(name.width(), Some(120));
        assert_eq!(name.min_width(), Some(40));

        let notes = columns.get_column(1).unwrap();
        assert!(notes.is_flexible());
        assert!(notes.is_read_only());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = GridConfig::from_toml_str("").unwrap();
        assert_eq!(config, GridConfig::default());
        let (styling, columns) = config.build().unwrap();
        assert_eq!(styling.num_header_rows(), 0);
        assert_eq!(styling.max_row_height(), None);
        assert!(columns.is_empty());
    }

    #[test]
    fn test_invalid_document() {
        let err = GridConfig::from_toml_str("[[columns]]\ncaption = \"no path\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = GridConfig::from_toml_str("[styling]\nnum_header_rows = -1").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
