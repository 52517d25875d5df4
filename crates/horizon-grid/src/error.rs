//! Error types for the grid.

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the grid.
///
/// Usage errors (an out-of-range column lookup, adding a column a filtered
/// view does not permit, mutating a sealed collection) and inconsistent-state
/// errors (operating on a tree node that is no longer in the row map) are
/// reported here. Expected races of virtualization, such as unbinding a
/// widget from a model the data source already disposed, are not errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A column index was outside `0..len`.
    #[error("column index {index} out of range for {len} columns")]
    ColumnIndexOutOfRange { index: usize, len: usize },

    /// The column is not part of the filtered view's source collection.
    #[error("column '{path}' is not present in the source collection")]
    ColumnNotInSource { path: String },

    /// The operation is only defined on a filtered view.
    #[error("operation requires a filtered column view")]
    NotFilteredView,

    /// The collection has been sealed against modification.
    #[error("column collection is read-only")]
    ReadOnlyCollection,

    /// A tree node is not present in the current row map.
    #[error("tree node is not present in the row map")]
    UnknownNode,

    /// A tree node is in the wrong state for the requested transition.
    #[error("tree node is {found:?}, expected {expected:?}")]
    InvalidNodeState {
        expected: crate::tree_source::NodeState,
        found: crate::tree_source::NodeState,
    },

    /// A data source failed to provide the requested range.
    #[error("data source error: {0}")]
    DataSource(String),

    /// Configuration could not be parsed.
    #[error("invalid grid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Create a column-out-of-range error.
    pub fn column_out_of_range(index: usize, len: usize) -> Self {
        Self::ColumnIndexOutOfRange { index, len }
    }

    /// Create a column-not-in-source error.
    pub fn column_not_in_source(path: impl Into<String>) -> Self {
        Self::ColumnNotInSource { path: path.into() }
    }

    /// Create a data source error.
    pub fn data_source(message: impl Into<String>) -> Self {
        Self::DataSource(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::column_out_of_range(7, 3).to_string(),
            "column index 7 out of range for 3 columns"
        );
        assert_eq!(
            Error::column_not_in_source("size").to_string(),
            "column 'size' is not present in the source collection"
        );
        assert_eq!(
            Error::data_source("timeout").to_string(),
            "data source error: timeout"
        );
    }

    #[test]
    fn test_config_error_converts() {
        let parse_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
