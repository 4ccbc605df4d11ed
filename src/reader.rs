use crate::column::UserColumn;
use crate::conversions::{data_type_from_str, geometry_type_from_str};
use crate::error::{GpkgError, Result};
use crate::gpkg::Gpkg;
use crate::ogc_sql::SQL_TABLE_INFO;
use crate::table::UserTable;
use crate::types::DataType;
use crate::value::Value;
use tracing::{debug, instrument, warn};

/// Outcome of resolving a declared column type name.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeLookup {
    Data(DataType),
    /// A geometry type name; the column is stored as `BLOB`.
    Geometry(wkb::reader::GeometryType),
    Unknown(String),
}

/// Resolve a suffix-free type name, first as a data type, then as a geometry
/// type.
pub fn lookup_data_type(type_name: &str) -> TypeLookup {
    if let Some(data_type) = data_type_from_str(type_name) {
        return TypeLookup::Data(data_type);
    }
    match geometry_type_from_str(type_name.trim()) {
        Ok(geometry_type) => TypeLookup::Geometry(geometry_type),
        Err(_) => TypeLookup::Unknown(type_name.to_string()),
    }
}

/// Split a declared type like `TEXT(10)` into its name and maximum length.
///
/// A suffix that is not a positive integer is left in place and no maximum is
/// reported.
pub fn parse_declared_type(declared_type: &str) -> (String, Option<u64>) {
    let declared_type = declared_type.trim();
    if let (Some(open), true) = (declared_type.find('('), declared_type.ends_with(')')) {
        let interior = &declared_type[open + 1..declared_type.len() - 1];
        match interior.trim().parse::<u64>() {
            Ok(max) if max > 0 => {
                return (declared_type[..open].trim_end().to_string(), Some(max));
            }
            _ => {
                warn!(
                    declared_type,
                    "ignoring non-numeric length suffix of declared column type"
                );
            }
        }
    }
    (declared_type.to_string(), None)
}

/// Interpret the `dflt_value` column of `pragma_table_info`.
pub(crate) fn parse_default_value(raw: Option<&str>, data_type: DataType) -> Option<Value> {
    let raw = raw?.trim();
    if raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        let inner = &raw[1..raw.len() - 1];
        return Some(Value::Text(inner.replace("''", "'")));
    }
    if data_type.is_integer() || data_type == DataType::Boolean {
        if let Ok(v) = raw.parse::<i64>() {
            return Some(Value::Integer(v));
        }
    }
    if data_type.is_integer() || data_type.is_floating_point() {
        if let Ok(v) = raw.parse::<f64>() {
            return Some(Value::Real(v));
        }
    }
    // CURRENT_TIMESTAMP, (strftime(...)) and other expressions
    Some(Value::Text(raw.to_string()))
}

struct ColumnInfo {
    cid: usize,
    name: String,
    declared_type: String,
    not_null: bool,
    default_value: Option<String>,
    pk: i64,
}

/// Reads the column layout of an existing table from SQLite's catalog.
#[derive(Clone, Debug)]
pub struct TableReader {
    table_name: String,
}

impl TableReader {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[instrument(name = "reader::read", level = "trace", skip(self, gpkg), fields(table = %self.table_name))]
    pub fn read(&self, gpkg: &Gpkg) -> Result<UserTable> {
        let infos = {
            let mut stmt = gpkg.connection().prepare(SQL_TABLE_INFO)?;
            let rows = stmt.query_map([&self.table_name], |row| {
                Ok(ColumnInfo {
                    cid: row.get::<_, i64>(0)? as usize,
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    default_value: row.get(4)?,
                    pk: row.get(5)?,
                })
            })?;
            rows.collect::<std::result::Result<Vec<ColumnInfo>, _>>()?
        };

        if infos.is_empty() {
            return Err(GpkgError::Schema {
                table: self.table_name.clone(),
            });
        }

        let pk_count = infos.iter().filter(|info| info.pk > 0).count();
        if pk_count > 1 {
            debug!(
                table = %self.table_name,
                pk_count,
                "composite primary key, rows are matched by value"
            );
        }

        let columns = infos
            .into_iter()
            .map(|info| self.create_column(info, pk_count == 1))
            .collect::<Result<Vec<UserColumn>>>()?;

        UserTable::new(self.table_name.clone(), columns)
    }

    fn create_column(&self, info: ColumnInfo, single_pk: bool) -> Result<UserColumn> {
        let (type_name, max) = parse_declared_type(&info.declared_type);
        let mut column = match lookup_data_type(&type_name) {
            TypeLookup::Data(data_type) => UserColumn::new(info.cid, info.name, data_type),
            TypeLookup::Geometry(geometry_type) => {
                UserColumn::geometry(info.cid, info.name, geometry_type)
            }
            TypeLookup::Unknown(declared_type) => {
                return Err(GpkgError::UnsupportedColumnType {
                    column: info.name,
                    declared_type,
                });
            }
        };
        column.max = max;
        column.not_null = info.not_null;
        column.primary_key = single_pk && info.pk > 0;
        column.default_value = parse_default_value(info.default_value.as_deref(), column.data_type);
        Ok(column)
    }
}
