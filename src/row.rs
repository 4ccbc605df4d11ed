use crate::error::{GpkgError, Result};
use crate::geometry::gpkg_geometry_to_wkb;
use crate::table::UserTable;
use crate::value::Value;
use std::sync::Arc;
use wkb::reader::Wkb;

/// One row of a user table: a value per column plus the table layout.
///
/// The row is persisted when its identity key holds a value.
#[derive(Clone, Debug, PartialEq)]
pub struct UserRow {
    table: Arc<UserTable>,
    values: Vec<Value>,
}

impl UserRow {
    /// A transient row with every value set to `NULL`.
    pub fn new(table: Arc<UserTable>) -> Self {
        let values = vec![Value::Null; table.column_count()];
        Self { table, values }
    }

    pub(crate) fn from_values(table: Arc<UserTable>, values: Vec<Value>) -> Self {
        debug_assert_eq!(values.len(), table.column_count());
        Self { table, values }
    }

    pub fn table(&self) -> &UserTable {
        &self.table
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or_else(|| self.out_of_range(index))
    }

    pub fn value_by_name(&self, name: &str) -> Result<&Value> {
        let index = self.table.column_index(name)?;
        self.value(index)
    }

    /// Convert the value of a column, `Option<T>` for nullable columns.
    pub fn get<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<Value, Error = GpkgError>,
    {
        self.value_by_name(name)?.clone().try_into()
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let count = self.values.len();
        let slot = self.values.get_mut(index).ok_or(GpkgError::ColumnIndexOutOfRange {
            table: self.table.name().to_string(),
            index,
            count,
        })?;
        *slot = value.into();
        Ok(())
    }

    pub fn set_value_by_name(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.table.column_index(name)?;
        self.set_value(index, value)
    }

    /// Identity key value, `None` for a transient row or a table without one.
    pub fn id(&self) -> Option<i64> {
        self.table
            .pk_index()
            .and_then(|idx| self.values[idx].as_i64())
    }

    pub fn set_id(&mut self, id: i64) -> Result<()> {
        let idx = self.table.pk_column()?.index;
        self.values[idx] = Value::Integer(id);
        Ok(())
    }

    pub fn is_persisted(&self) -> bool {
        self.id().is_some()
    }

    /// Decode a geometry column. `None` when the value is `NULL`.
    pub fn geometry(&self, name: &str) -> Result<Option<Wkb<'_>>> {
        match self.value_by_name(name)? {
            Value::Null => Ok(None),
            Value::Blob(bytes) => Ok(Some(gpkg_geometry_to_wkb(bytes)?)),
            other => Err(GpkgError::ValueTypeMismatch {
                expected: "blob",
                actual: other.type_name(),
            }),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn out_of_range(&self, index: usize) -> GpkgError {
        GpkgError::ColumnIndexOutOfRange {
            table: self.table.name().to_string(),
            index,
            count: self.values.len(),
        }
    }
}
