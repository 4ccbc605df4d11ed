use thiserror::Error;

use crate::result::ResultPosition;

/// Crate error type for GeoPackage user table operations.
#[derive(Debug, Error)]
pub enum GpkgError {
    /// Wraps errors returned by `rusqlite` outside of a DAO operation.
    #[error("{0}")]
    Sql(#[from] rusqlite::Error),
    /// Wraps errors returned by the `wkb` crate.
    #[error("{0}")]
    Wkb(#[from] wkb::error::WkbError),
    /// The table does not exist or has no columns.
    #[error("table does not exist or has no columns: {table}")]
    Schema { table: String },
    /// A column type declared in SQLite metadata is not supported by this crate.
    #[error("unsupported column type for column '{column}': {declared_type}")]
    UnsupportedColumnType {
        column: String,
        declared_type: String,
    },
    /// An operation requires a collaborator (projection, primary key, row id)
    /// that is not available.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A semantically invalid combination of inputs.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// SQLite rejected a write because of a NOT NULL, UNIQUE, CHECK or
    /// foreign key constraint.
    #[error("constraint violation on table '{table}' during {operation}: {source}")]
    ConstraintViolation {
        table: String,
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// SQLite failed while executing a DAO operation.
    #[error("storage error on table '{table}' during {operation}: {source}")]
    Storage {
        table: String,
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// A result accessor was called while the cursor was not on a row.
    #[error("result is not positioned on a row ({0:?})")]
    ResultState(ResultPosition),
    /// A geometry type in metadata could not be mapped to a supported WKB geometry type.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),
    /// Invalid or mixed `z` / `m` dimension flags in GeoPackage metadata.
    #[error("invalid or mixed geometry dimension (z={z}, m={m})")]
    InvalidDimension { z: i8, m: i8 },
    /// Invalid GeoPackage geometry flags byte.
    #[error("invalid gpkg geometry flags: {0:#04x}")]
    InvalidGpkgGeometryFlags(u8),
    /// GeoPackage geometry blob is too short for the fixed header.
    #[error("invalid gpkg geometry length: got {len} bytes, expected at least {minimum}")]
    InvalidGpkgGeometryLength { len: usize, minimum: usize },
    /// GeoPackage geometry blob is too short for the declared envelope payload.
    #[error("invalid gpkg geometry envelope length: got {len} bytes, required {required}")]
    InvalidGpkgGeometryEnvelope { len: usize, required: usize },
    /// Dynamic `Value` type did not match the expected conversion target.
    #[error("expected {expected}, got {actual}")]
    ValueTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// Numeric conversion failed because the value is out of range.
    #[error("value out of range for {target}")]
    ValueOutOfRange { target: &'static str },
    /// Requested column does not exist in the table.
    #[error("no column '{column}' in table '{table}'")]
    ColumnNotFound { table: String, column: String },
    /// Column position is past the end of the table's column list.
    #[error("column index {index} out of range for table '{table}' with {count} columns")]
    ColumnIndexOutOfRange {
        table: String,
        index: usize,
        count: usize,
    },
    /// Two columns of a table share the same (case-insensitive) name.
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },
    /// A table model violates its structural invariants.
    #[error("invalid table '{table}': {reason}")]
    InvalidTable { table: String, reason: String },
    /// A table with the same name already exists.
    #[error("table already exists: {table}")]
    TableAlreadyExists { table: String },
    /// Referenced `srs_id` does not exist in `gpkg_spatial_ref_sys`.
    #[error("srs_id {srs_id} not found in gpkg_spatial_ref_sys")]
    MissingSpatialRefSysId { srs_id: u32 },
    /// Feature table has no registered geometry column.
    #[error("no geometry column found for table: {table}")]
    MissingGeometryColumn { table: String },
    #[error("GeoPackage file already exists: {path}")]
    PathAlreadyExists { path: String },
    #[error("GeoPackage file does not exist: {path}")]
    PathNotFound { path: String },
    #[error("operation not allowed on read-only connection")]
    ReadOnly,
}

pub type Result<T> = std::result::Result<T, GpkgError>;

impl GpkgError {
    /// Tag an engine error with the table and operation it happened in.
    ///
    /// Constraint failures are kept apart from other storage errors so callers
    /// can react to them without inspecting the SQLite error code themselves.
    pub(crate) fn storage(table: &str, operation: &'static str, source: rusqlite::Error) -> Self {
        let is_constraint = matches!(
            source.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );
        if is_constraint {
            Self::ConstraintViolation {
                table: table.to_string(),
                operation,
                source,
            }
        } else {
            Self::Storage {
                table: table.to_string(),
                operation,
                source,
            }
        }
    }
}
