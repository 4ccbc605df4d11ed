//! Generic data access layer for GeoPackage user tables, built on top of
//! rusqlite.
//!
//! ## Overview
//!
//! - `Gpkg` is the connection to a GeoPackage and hands out DAOs.
//! - `UserTable` / `UserColumn` describe the layout of any user table, either
//!   read from SQLite's catalog by `TableReader` or built by hand.
//! - `UserDao` queries, counts and modifies rows of one table without any
//!   hand-written SQL. What differs between feature, tile, attributes and
//!   custom tables is plugged in through `TableKind`.
//! - `UserRow` is a single row, `UserResult` a forward-only cursor over rows.
//! - `Value` is one column value and mirrors SQLite's dynamic typing.
//!
//! `Gpkg` supports several open modes:
//!
//! - `Gpkg::open_read_only(path)`: open an existing file without write access.
//! - `Gpkg::open(path)`: open an existing file for read/write.
//! - `Gpkg::new(path)`: create a new file with the GeoPackage core tables.
//! - `Gpkg::open_in_memory()`: create a transient in-memory GeoPackage.
//!
//! ## Short usage
//!
//! ```no_run
//! use rusqlite_gpkg_dao::{DataType, FieldValues, Gpkg, UserColumn, UserTable, Value};
//!
//! let gpkg = Gpkg::open_in_memory()?;
//! let dao = gpkg.create_attributes_table(UserTable::new(
//!     "observations",
//!     vec![
//!         UserColumn::primary_key(0, "id"),
//!         UserColumn::new(1, "species", DataType::Text).not_null(),
//!         UserColumn::new(2, "count", DataType::Integer),
//!     ],
//! )?)?;
//!
//! let mut row = dao.new_row();
//! row.set_value_by_name("species", "heron")?;
//! row.set_value_by_name("count", 3)?;
//! let id = dao.insert(&mut row)?;
//!
//! let mut result = dao.query_for_eq("species", &Value::from("heron"))?;
//! while result.move_to_next() {
//!     let count: i64 = result.get_by_name("count")?;
//!     println!("{id}: {count}");
//! }
//!
//! let mut fields = FieldValues::new();
//! fields.insert("species".to_string(), Value::from("heron"));
//! dao.delete_field_values(&fields)?;
//! # Ok::<(), rusqlite_gpkg_dao::GpkgError>(())
//! ```
//!
//! Numeric columns can be matched within a tolerance:
//!
//! ```no_run
//! # use rusqlite_gpkg_dao::{ColumnValue, Gpkg};
//! # let gpkg = Gpkg::open("data.gpkg")?;
//! let dao = gpkg.feature_dao("stations")?;
//! let result = dao.query_for_eq_value("elevation", &ColumnValue::with_tolerance(120.0, 0.5))?;
//! println!("{} stations, zoom level {}", result.len(), dao.zoom_level()?);
//! # Ok::<(), rusqlite_gpkg_dao::GpkgError>(())
//! ```
mod column;
mod conversions;
mod dao;
mod error;
mod geometry;
mod gpkg;
mod kind;
mod ogc_sql;
mod projection;
mod reader;
mod result;
mod row;
mod sql_functions;
mod table;
mod types;
mod value;
mod where_clause;

pub use column::UserColumn;
pub use dao::{QueryOptions, UserDao};
pub use error::{GpkgError, Result};
pub use geometry::{gpkg_geometry_from, gpkg_geometry_to_wkb, wkb_to_gpkg_geometry};
pub use gpkg::{GeometryColumnMeta, Gpkg};
pub use kind::{AttributesTable, CustomTable, FeatureTable, TableKind, TileTable};
pub use projection::{
    BoundingBox, EPSG_WEB_MERCATOR, EPSG_WORLD_GEODETIC_SYSTEM, EpsgProjection, MAX_ZOOM_LEVEL,
    Projection,
    ProjectionTransform, ProjectionUnit, bound_degrees_with_web_mercator_limits,
    zoom_level_for_web_mercator,
};
pub use reader::{TableReader, TypeLookup, lookup_data_type, parse_declared_type};
pub use result::{ResultPosition, UserResult};
pub use row::UserRow;
pub use sql_functions::register_spatial_functions;
pub use table::UserTable;
pub use types::DataType;
pub use value::Value;
pub use where_clause::{ColumnValue, ColumnValues, FieldValues, Where};

// Re-export types used in public fields to keep the public API stable.
pub use wkb::reader::{Dimension, GeometryType};
