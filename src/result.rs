use crate::error::{GpkgError, Result};
use crate::geometry::gpkg_geometry_to_wkb;
use crate::row::UserRow;
use crate::table::UserTable;
use crate::value::Value;
use rusqlite::types::{FromSql, FromSqlError};
use std::sync::Arc;
use wkb::reader::Wkb;

/// Cursor position of a [`UserResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultPosition {
    BeforeFirst,
    OnRow(usize),
    Exhausted,
}

/// Forward-only cursor over the rows of a query.
///
/// Rows are read from SQLite before the query returns, so the result does not
/// hold a statement open. Call [`UserResult::move_to_next`] before reading the
/// first row; it can not be rewound.
#[derive(Debug)]
pub struct UserResult {
    table: Arc<UserTable>,
    rows: Vec<Vec<Value>>,
    position: ResultPosition,
}

impl UserResult {
    pub(crate) fn new(table: Arc<UserTable>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            table,
            rows,
            position: ResultPosition::BeforeFirst,
        }
    }

    /// Read every row of a prepared statement.
    pub(crate) fn from_statement(
        table: Arc<UserTable>,
        stmt: &mut rusqlite::Statement<'_>,
        args: &[String],
    ) -> rusqlite::Result<Self> {
        let column_count = stmt.column_count();
        let mut rows = stmt.query(rusqlite::params_from_iter(args))?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let mut row_values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                row_values.push(Value::from(row.get_ref(idx)?));
            }
            values.push(row_values);
        }
        Ok(Self::new(table, values))
    }

    /// Advance to the next row. Returns `false` once past the last row.
    pub fn move_to_next(&mut self) -> bool {
        let next = match self.position {
            ResultPosition::BeforeFirst => 0,
            ResultPosition::OnRow(i) => i + 1,
            ResultPosition::Exhausted => return false,
        };
        if next < self.rows.len() {
            self.position = ResultPosition::OnRow(next);
            true
        } else {
            self.position = ResultPosition::Exhausted;
            false
        }
    }

    pub fn position(&self) -> ResultPosition {
        self.position
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn table(&self) -> &UserTable {
        &self.table
    }

    pub fn column_count(&self) -> usize {
        self.table.column_count()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.table.column_index(name)
    }

    fn current(&self) -> Result<&[Value]> {
        match self.position {
            ResultPosition::OnRow(i) => Ok(&self.rows[i]),
            other => Err(GpkgError::ResultState(other)),
        }
    }

    pub fn value(&self, index: usize) -> Result<&Value> {
        let row = self.current()?;
        row.get(index).ok_or_else(|| GpkgError::ColumnIndexOutOfRange {
            table: self.table.name().to_string(),
            index,
            count: row.len(),
        })
    }

    pub fn value_by_name(&self, name: &str) -> Result<&Value> {
        self.current()?;
        self.value(self.table.column_index(name)?)
    }

    /// Read a column of the current row using rusqlite's `FromSql` conversion.
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T> {
        let value_ref = self.value(index)?.as_value_ref();
        FromSql::column_result(value_ref).map_err(|err| {
            let data_type = value_ref.data_type();
            let err = match err {
                FromSqlError::InvalidType => rusqlite::Error::InvalidColumnType(
                    index,
                    self.table.columns()[index].name.clone(),
                    data_type,
                ),
                FromSqlError::OutOfRange(i) => rusqlite::Error::IntegralValueOutOfRange(index, i),
                FromSqlError::Other(err) => {
                    rusqlite::Error::FromSqlConversionFailure(index, data_type, err)
                }
                other => {
                    rusqlite::Error::FromSqlConversionFailure(index, data_type, Box::new(other))
                }
            };
            GpkgError::Sql(err)
        })
    }

    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T> {
        self.current()?;
        self.get(self.table.column_index(name)?)
    }

    /// Identity key of the current row.
    pub fn id(&self) -> Result<Option<i64>> {
        let row = self.current()?;
        Ok(self.table.pk_index().and_then(|idx| row[idx].as_i64()))
    }

    /// Decode a geometry column of the current row.
    pub fn geometry(&self, index: usize) -> Result<Option<Wkb<'_>>> {
        match self.value(index)? {
            Value::Null => Ok(None),
            Value::Blob(bytes) => Ok(Some(gpkg_geometry_to_wkb(bytes)?)),
            other => Err(GpkgError::ValueTypeMismatch {
                expected: "blob",
                actual: other.type_name(),
            }),
        }
    }

    /// Copy the current row into a [`UserRow`].
    pub fn row(&self) -> Result<UserRow> {
        let values = self.current()?.to_vec();
        Ok(UserRow::from_values(self.table.clone(), values))
    }

    /// Release the result. Dropping it has the same effect.
    pub fn close(self) {}

    /// The remaining rows, starting after the current position.
    pub fn collect_rows(self) -> Vec<UserRow> {
        self.collect()
    }
}

impl Iterator for UserResult {
    type Item = UserRow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.move_to_next() {
            self.row().ok()
        } else {
            None
        }
    }
}
