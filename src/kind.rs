//! Per-kind behavior plugged into [`UserDao`](crate::UserDao).

use crate::column::UserColumn;
use crate::error::{GpkgError, Result};
use crate::gpkg::Gpkg;
use crate::ogc_sql::{SQL_SELECT_TILE_MATRIX_SET, quote_ident, sql_geometry_bounds};
use crate::projection::BoundingBox;
use crate::result::UserResult;
use crate::row::UserRow;
use crate::table::UserTable;
use crate::types::DataType;
use rusqlite::OptionalExtension;
use std::sync::Arc;

/// Hooks a table kind supplies to the generic DAO.
pub trait TableKind {
    /// `data_type` of the table in `gpkg_contents`, `None` when unregistered.
    fn data_type(&self) -> Option<&'static str> {
        None
    }

    /// Check that a table layout is usable as this kind.
    fn validate(&self, _table: &UserTable) -> Result<()> {
        Ok(())
    }

    fn new_row(&self, table: Arc<UserTable>) -> UserRow {
        UserRow::new(table)
    }

    fn prepare_result(&self, result: UserResult) -> UserResult {
        result
    }

    /// Extent of the stored data, `None` when it is unknown or empty.
    fn bounding_box(&self, _gpkg: &Gpkg, _table: &UserTable) -> Result<Option<BoundingBox>> {
        Ok(None)
    }
}

/// Any table, without GeoPackage metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct CustomTable;

impl TableKind for CustomTable {}

/// Non-spatial table registered as `attributes`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AttributesTable;

impl TableKind for AttributesTable {
    fn data_type(&self) -> Option<&'static str> {
        Some("attributes")
    }

    fn validate(&self, table: &UserTable) -> Result<()> {
        table.pk_column().map(|_| ())
    }
}

/// Vector feature table with a single geometry column.
#[derive(Clone, Debug)]
pub struct FeatureTable {
    geometry_column: String,
    srs_id: u32,
}

impl FeatureTable {
    pub fn new(geometry_column: impl Into<String>, srs_id: u32) -> Self {
        Self {
            geometry_column: geometry_column.into(),
            srs_id,
        }
    }

    pub fn geometry_column(&self) -> &str {
        &self.geometry_column
    }

    pub fn srs_id(&self) -> u32 {
        self.srs_id
    }
}

impl TableKind for FeatureTable {
    fn data_type(&self) -> Option<&'static str> {
        Some("features")
    }

    fn validate(&self, table: &UserTable) -> Result<()> {
        table.pk_column()?;
        match table.column(&self.geometry_column) {
            Ok(column) if column.data_type == DataType::Blob => Ok(()),
            _ => Err(GpkgError::MissingGeometryColumn {
                table: table.name().to_string(),
            }),
        }
    }

    fn bounding_box(&self, gpkg: &Gpkg, table: &UserTable) -> Result<Option<BoundingBox>> {
        let sql = sql_geometry_bounds(table.name(), &self.geometry_column);
        let bounds = gpkg
            .connection()
            .query_row(&sql, [], |row| {
                Ok((
                    row.get::<_, Option<f64>>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            })
            .map_err(|e| GpkgError::storage(table.name(), "bounding_box", e))?;

        match bounds {
            (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => {
                Ok(Some(BoundingBox::new(min_x, min_y, max_x, max_y)))
            }
            _ => Ok(None),
        }
    }
}

/// Tile pyramid table.
#[derive(Clone, Copy, Debug, Default)]
pub struct TileTable;

impl TileTable {
    pub const ZOOM_LEVEL: &'static str = "zoom_level";
    pub const TILE_COLUMN: &'static str = "tile_column";
    pub const TILE_ROW: &'static str = "tile_row";
    pub const TILE_DATA: &'static str = "tile_data";

    /// Column layout of a new tile pyramid table.
    pub fn columns() -> Vec<UserColumn> {
        vec![
            UserColumn::primary_key(0, "id"),
            UserColumn::new(1, Self::ZOOM_LEVEL, DataType::Integer).not_null(),
            UserColumn::new(2, Self::TILE_COLUMN, DataType::Integer).not_null(),
            UserColumn::new(3, Self::TILE_ROW, DataType::Integer).not_null(),
            UserColumn::new(4, Self::TILE_DATA, DataType::Blob).not_null(),
        ]
    }
}

impl TableKind for TileTable {
    fn data_type(&self) -> Option<&'static str> {
        Some("tiles")
    }

    fn validate(&self, table: &UserTable) -> Result<()> {
        for name in [
            Self::ZOOM_LEVEL,
            Self::TILE_COLUMN,
            Self::TILE_ROW,
            Self::TILE_DATA,
        ] {
            table.column(name)?;
        }
        table.pk_column().map(|_| ())
    }

    fn bounding_box(&self, gpkg: &Gpkg, table: &UserTable) -> Result<Option<BoundingBox>> {
        let conn = gpkg.connection();
        let has_tiles: bool = conn
            .query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {})", quote_ident(table.name())),
                [],
                |row| row.get(0),
            )
            .map_err(|e| GpkgError::storage(table.name(), "bounding_box", e))?;
        if !has_tiles {
            return Ok(None);
        }

        let bounds = conn
            .query_row(SQL_SELECT_TILE_MATRIX_SET, [table.name()], |row| {
                Ok(BoundingBox::new(
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })
            .optional()
            .map_err(|e| GpkgError::storage(table.name(), "bounding_box", e))?;
        Ok(bounds)
    }
}
