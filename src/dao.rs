use crate::error::{GpkgError, Result};
use crate::gpkg::Gpkg;
use crate::kind::{CustomTable, TableKind};
use crate::ogc_sql::{
    SelectClauses, sql_aggregate, sql_count, sql_delete, sql_drop_table, sql_insert, sql_select,
    sql_update_by_id,
};
use crate::projection::{
    BoundingBox, EPSG_WEB_MERCATOR, Projection, ProjectionUnit,
    bound_degrees_with_web_mercator_limits, zoom_level_for_web_mercator,
};
use crate::reader::TableReader;
use crate::result::UserResult;
use crate::row::UserRow;
use crate::table::UserTable;
use crate::value::Value;
use crate::where_clause::{ColumnValue, Where};
use rusqlite::OptionalExtension;
use std::borrow::Borrow;
use std::sync::Arc;
use tracing::instrument;

/// Optional clauses of a DAO query.
///
/// `columns_as` has one entry per table column; `Some(expr)` selects `expr`
/// in place of the column, aliased back to the column name.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    pub columns_as: Option<Vec<Option<String>>>,
    pub group_by: Option<String>,
    pub having: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<String>,
}

impl QueryOptions {
    pub fn columns_as(mut self, columns_as: Vec<Option<String>>) -> Self {
        self.columns_as = Some(columns_as);
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn having(mut self, having: impl Into<String>) -> Self {
        self.having = Some(having.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

/// Data access object for a single user table.
///
/// The DAO borrows its [`Gpkg`] and builds every statement from the table
/// layout, so callers never write SQL for the table shape.
pub struct UserDao<'a, K: TableKind = CustomTable> {
    gpkg: &'a Gpkg,
    table: Arc<UserTable>,
    kind: K,
    projection: Option<Box<dyn Projection>>,
}

impl<K: TableKind> std::fmt::Debug for UserDao<'_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDao")
            .field("table", &self.table.name())
            .field("has_projection", &self.projection.is_some())
            .finish()
    }
}

impl<'a, K: TableKind> UserDao<'a, K> {
    pub fn new(gpkg: &'a Gpkg, table: UserTable, kind: K) -> Result<Self> {
        kind.validate(&table)?;
        Ok(Self {
            gpkg,
            table: Arc::new(table),
            kind,
            projection: None,
        })
    }

    /// Read the table layout from the database and build a DAO over it.
    pub fn read(gpkg: &'a Gpkg, table_name: &str, kind: K) -> Result<Self> {
        let table = TableReader::new(table_name).read(gpkg)?;
        Self::new(gpkg, table, kind)
    }

    pub fn with_projection(mut self, projection: impl Projection + 'static) -> Self {
        self.projection = Some(Box::new(projection));
        self
    }

    pub fn set_projection(&mut self, projection: Option<Box<dyn Projection>>) {
        self.projection = projection;
    }

    pub fn projection(&self) -> Option<&dyn Projection> {
        self.projection.as_deref()
    }

    pub fn gpkg(&self) -> &'a Gpkg {
        self.gpkg
    }

    pub fn table(&self) -> &UserTable {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn new_row(&self) -> UserRow {
        self.kind.new_row(self.table.clone())
    }

    pub fn query_for_all(&self) -> Result<UserResult> {
        self.query_where(&Where::default(), &QueryOptions::default())
    }

    pub fn query_for_all_columns_as(&self, columns_as: Vec<Option<String>>) -> Result<UserResult> {
        self.query_where(
            &Where::default(),
            &QueryOptions::default().columns_as(columns_as),
        )
    }

    pub fn query_for_eq(&self, field: &str, value: &Value) -> Result<UserResult> {
        self.query_for_eq_with(field, value, &QueryOptions::default())
    }

    pub fn query_for_eq_with(
        &self,
        field: &str,
        value: &Value,
        options: &QueryOptions,
    ) -> Result<UserResult> {
        self.query_where(&Where::eq(field, value)?, options)
    }

    pub fn query_for_eq_value(&self, field: &str, value: &ColumnValue) -> Result<UserResult> {
        self.query_where(&Where::column_value(field, value)?, &QueryOptions::default())
    }

    pub fn query_for_like(&self, field: &str, value: &Value) -> Result<UserResult> {
        self.query_for_like_with(field, value, &QueryOptions::default())
    }

    pub fn query_for_like_with(
        &self,
        field: &str,
        value: &Value,
        options: &QueryOptions,
    ) -> Result<UserResult> {
        self.query_where(&Where::like(field, value)?, options)
    }

    pub fn query_for_like_value(&self, field: &str, value: &ColumnValue) -> Result<UserResult> {
        self.query_where(
            &Where::column_value_like(field, value)?,
            &QueryOptions::default(),
        )
    }

    /// Rows matching every field/value pair. An empty set of pairs matches
    /// every row.
    pub fn query_for_field_values<I, F, V>(&self, fields: I) -> Result<UserResult>
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<str>,
        V: Borrow<Value>,
    {
        self.query_where(&Where::field_values(fields)?, &QueryOptions::default())
    }

    pub fn query_for_value_field_values<I, F, V>(&self, fields: I) -> Result<UserResult>
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<str>,
        V: Borrow<ColumnValue>,
    {
        self.query_where(&Where::column_values(fields)?, &QueryOptions::default())
    }

    pub fn query_for_id(&self, id: i64) -> Result<UserResult> {
        self.query_where(&self.id_where(id)?, &QueryOptions::default())
    }

    pub fn query_for_id_row(&self, id: i64) -> Result<Option<UserRow>> {
        let mut result = self.query_for_id(id)?;
        if result.move_to_next() {
            Ok(Some(result.row()?))
        } else {
            Ok(None)
        }
    }

    pub fn id_exists(&self, id: i64) -> Result<bool> {
        let w = self.id_where(id)?;
        Ok(self.count_where(w.as_clause(), w.args())? > 0)
    }

    pub fn query_where(&self, w: &Where, options: &QueryOptions) -> Result<UserResult> {
        self.query(w.as_clause(), w.args(), options)
    }

    /// Select the full column list of the table.
    #[instrument(name = "dao::query", level = "trace", skip(self, args, options), fields(table = %self.table.name()))]
    pub fn query(
        &self,
        where_clause: Option<&str>,
        args: &[String],
        options: &QueryOptions,
    ) -> Result<UserResult> {
        if let Some(columns_as) = &options.columns_as {
            if columns_as.len() != self.table.column_count() {
                return Err(GpkgError::UnsupportedOperation(format!(
                    "columns_as has {} entries but table '{}' has {} columns",
                    columns_as.len(),
                    self.table.name(),
                    self.table.column_count()
                )));
            }
        }
        let sql = sql_select(
            self.table.name(),
            self.table.column_names(),
            SelectClauses {
                columns_as: options.columns_as.as_deref(),
                where_clause,
                group_by: options.group_by.as_deref(),
                having: options.having.as_deref(),
                order_by: options.order_by.as_deref(),
                limit: options.limit.as_deref(),
            },
        );

        let result = {
            let mut stmt = self
                .gpkg
                .connection()
                .prepare(&sql)
                .map_err(|e| self.storage_error("query", e))?;
            UserResult::from_statement(self.table.clone(), &mut stmt, args)
                .map_err(|e| self.storage_error("query", e))?
        };
        Ok(self.kind.prepare_result(result))
    }

    pub fn count(&self) -> Result<u64> {
        self.count_where(None, &[])
    }

    #[instrument(name = "dao::count", level = "trace", skip(self, args), fields(table = %self.table.name()))]
    pub fn count_where(&self, where_clause: Option<&str>, args: &[String]) -> Result<u64> {
        let sql = sql_count(self.table.name(), where_clause);
        let count: i64 = self
            .gpkg
            .connection()
            .query_row(&sql, rusqlite::params_from_iter(args), |row| row.get(0))
            .map_err(|e| self.storage_error("count", e))?;
        Ok(count as u64)
    }

    /// Smallest value of a column, `Value::Null` when no row matches.
    pub fn min(&self, column: &str, where_clause: Option<&str>, args: &[String]) -> Result<Value> {
        self.aggregate("MIN", "min", column, where_clause, args)
    }

    /// Largest value of a column, `Value::Null` when no row matches.
    pub fn max(&self, column: &str, where_clause: Option<&str>, args: &[String]) -> Result<Value> {
        self.aggregate("MAX", "max", column, where_clause, args)
    }

    #[instrument(name = "dao::aggregate", level = "trace", skip(self, where_clause, args), fields(table = %self.table.name()))]
    fn aggregate(
        &self,
        function: &str,
        operation: &'static str,
        column: &str,
        where_clause: Option<&str>,
        args: &[String],
    ) -> Result<Value> {
        let column = &self.table.column(column)?.name;
        let sql = sql_aggregate(function, self.table.name(), column, where_clause);
        self.gpkg
            .connection()
            .query_row(&sql, rusqlite::params_from_iter(args), |row| row.get(0))
            .map_err(|e| self.storage_error(operation, e))
    }

    /// Insert the non-null values of a row and store the new id in it.
    #[instrument(name = "dao::insert", level = "debug", skip(self, row), fields(table = %self.table.name()))]
    pub fn insert(&self, row: &mut UserRow) -> Result<i64> {
        self.gpkg.ensure_writable()?;
        self.check_row(row)?;

        let (names, values): (Vec<&str>, Vec<&Value>) = self
            .table
            .columns()
            .iter()
            .zip(row.values())
            .filter(|(_, value)| !value.is_null())
            .map(|(column, value)| (column.name.as_str(), value))
            .unzip();

        let sql = sql_insert(self.table.name(), names);
        let conn = self.gpkg.connection();
        conn.execute(&sql, rusqlite::params_from_iter(values))
            .map_err(|e| self.storage_error("insert", e))?;

        let id = conn.last_insert_rowid();
        if self.table.pk_index().is_some() {
            row.set_id(id)?;
        }
        Ok(id)
    }

    /// Write every non-key column of a persisted row.
    #[instrument(name = "dao::update", level = "debug", skip(self, row), fields(table = %self.table.name()))]
    pub fn update(&self, row: &UserRow) -> Result<usize> {
        self.gpkg.ensure_writable()?;
        self.check_row(row)?;
        let pk = self.table.pk_column()?;
        let id = row.id().ok_or_else(|| {
            GpkgError::Configuration(format!(
                "can not update a row of '{}' without an id",
                self.table.name()
            ))
        })?;

        let (names, mut values): (Vec<&str>, Vec<Value>) = self
            .table
            .columns()
            .iter()
            .zip(row.values())
            .filter(|(column, _)| column.index != pk.index)
            .map(|(column, value)| (column.name.as_str(), value.clone()))
            .unzip();
        if names.is_empty() {
            return Ok(0);
        }
        values.push(Value::Integer(id));

        let sql = sql_update_by_id(self.table.name(), names, &pk.name);
        self.gpkg
            .connection()
            .execute(&sql, rusqlite::params_from_iter(values))
            .map_err(|e| self.storage_error("update", e))
    }

    /// Delete a row by id when it has one, otherwise every row with equal
    /// values.
    pub fn delete(&self, row: &UserRow) -> Result<usize> {
        self.check_row(row)?;
        match row.id() {
            Some(id) => self.delete_by_id(id),
            None => {
                let w = Where::stored_values(
                    self.table
                        .columns()
                        .iter()
                        .map(|c| c.name.as_str())
                        .zip(row.values()),
                )?;
                self.delete_where(w.as_clause(), w.args())
            }
        }
    }

    pub fn delete_by_id(&self, id: i64) -> Result<usize> {
        let w = self.id_where(id)?;
        self.delete_where(w.as_clause(), w.args())
    }

    pub fn delete_field_values<I, F, V>(&self, fields: I) -> Result<usize>
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<str>,
        V: Borrow<Value>,
    {
        let w = Where::field_values(fields)?;
        self.delete_where(w.as_clause(), w.args())
    }

    pub fn delete_all(&self) -> Result<usize> {
        self.delete_where(None, &[])
    }

    #[instrument(name = "dao::delete", level = "debug", skip(self, args), fields(table = %self.table.name()))]
    pub fn delete_where(&self, where_clause: Option<&str>, args: &[String]) -> Result<usize> {
        self.gpkg.ensure_writable()?;
        let sql = sql_delete(self.table.name(), where_clause);
        self.gpkg
            .connection()
            .execute(&sql, rusqlite::params_from_iter(args))
            .map_err(|e| self.storage_error("delete", e))
    }

    /// Drop the table itself. GeoPackage metadata is left untouched; use
    /// [`Gpkg::delete_table`] to remove both.
    #[instrument(name = "dao::drop_table", level = "debug", skip(self), fields(table = %self.table.name()))]
    pub fn drop_table(&self) -> Result<()> {
        self.gpkg.ensure_writable()?;
        self.gpkg
            .connection()
            .execute_batch(&sql_drop_table(self.table.name()))
            .map_err(|e| self.storage_error("drop_table", e))
    }

    /// First column of the first row of an arbitrary query, as text.
    pub fn query_single_string_result(&self, sql: &str, args: &[String]) -> Result<Option<String>> {
        Ok(self
            .query_single_value(sql, args)?
            .and_then(|value| match value {
                Value::Null => None,
                Value::Text(v) => Some(v),
                other => Some(other.to_string()),
            }))
    }

    pub fn query_single_int_result(&self, sql: &str, args: &[String]) -> Result<Option<i64>> {
        match self.query_single_value(sql, args)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.try_into().map(Some),
        }
    }

    /// First column of every row of an arbitrary query, as text. `NULL`s are
    /// skipped.
    pub fn query_single_column_string_results(
        &self,
        sql: &str,
        args: &[String],
    ) -> Result<Vec<String>> {
        let mut stmt = self
            .gpkg
            .connection()
            .prepare(sql)
            .map_err(|e| self.storage_error("query", e))?;
        let values = stmt
            .query_map(rusqlite::params_from_iter(args), |row| {
                row.get::<_, Value>(0)
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<Value>>>())
            .map_err(|e| self.storage_error("query", e))?;
        Ok(values
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::Text(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    fn query_single_value(&self, sql: &str, args: &[String]) -> Result<Option<Value>> {
        self.gpkg
            .connection()
            .query_row(sql, rusqlite::params_from_iter(args), |row| row.get(0))
            .optional()
            .map_err(|e| self.storage_error("query", e))
    }

    /// `columns_as` selecting `value` in place of the named columns.
    pub fn build_columns_as<I, S>(&self, columns: I, value: &str) -> Vec<Option<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns_as = vec![None; self.table.column_count()];
        for column in columns {
            if let Ok(idx) = self.table.column_index(column.as_ref()) {
                columns_as[idx] = Some(value.to_string());
            }
        }
        columns_as
    }

    pub fn build_columns_as_null<I, S>(&self, columns: I) -> Vec<Option<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.build_columns_as(columns, "null")
    }

    pub fn bounding_box(&self) -> Result<Option<BoundingBox>> {
        self.kind.bounding_box(self.gpkg, &self.table)
    }

    /// Approximate zoom level at which the table's data fits one tile.
    ///
    /// Requires a projection. An empty table is at zoom level 0.
    #[instrument(name = "dao::zoom_level", level = "trace", skip(self), fields(table = %self.table.name()))]
    pub fn zoom_level(&self) -> Result<u32> {
        let projection = self.projection.as_deref().ok_or_else(|| {
            GpkgError::Configuration(
                "no projection was set, which is required to determine the zoom level"
                    .to_string(),
            )
        })?;
        let Some(mut bbox) = self.bounding_box()? else {
            return Ok(0);
        };
        if projection.unit() == ProjectionUnit::Degrees {
            bbox = bound_degrees_with_web_mercator_limits(&bbox);
        }
        let transform = projection.transform_to(EPSG_WEB_MERCATOR)?;
        let web_mercator = bbox.transform(transform.as_ref());
        Ok(zoom_level_for_web_mercator(&web_mercator))
    }

    fn id_where(&self, id: i64) -> Result<Where> {
        let pk = self.table.pk_column()?;
        Where::eq(&pk.name, &Value::Integer(id))
    }

    fn check_row(&self, row: &UserRow) -> Result<()> {
        if row.table().name() != self.table.name()
            || row.column_count() != self.table.column_count()
        {
            return Err(GpkgError::UnsupportedOperation(format!(
                "row of table '{}' can not be written to table '{}'",
                row.table().name(),
                self.table.name()
            )));
        }
        Ok(())
    }

    fn storage_error(&self, operation: &'static str, source: rusqlite::Error) -> GpkgError {
        GpkgError::storage(self.table.name(), operation, source)
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryOptions, UserDao};
    use crate::column::UserColumn;
    use crate::error::GpkgError;
    use crate::gpkg::Gpkg;
    use crate::kind::CustomTable;
    use crate::projection::{BoundingBox, Projection, ProjectionTransform, ProjectionUnit};
    use crate::table::UserTable;
    use crate::types::DataType;
    use crate::value::Value;
    use crate::where_clause::{ColumnValue, FieldValues};
    use std::cell::Cell;
    use std::rc::Rc;

    fn pts(gpkg: &Gpkg) -> crate::Result<UserDao<'_, CustomTable>> {
        let table = UserTable::new(
            "pts",
            vec![
                UserColumn::primary_key(0, "id"),
                UserColumn::new(1, "name", DataType::Text).not_null(),
                UserColumn::new(2, "v", DataType::Integer),
                UserColumn::new(3, "score", DataType::Real),
            ],
        )?;
        gpkg.create_table(table)
    }

    fn insert(
        dao: &UserDao<'_, CustomTable>,
        name: &str,
        v: i64,
        score: f64,
    ) -> crate::Result<i64> {
        let mut row = dao.new_row();
        row.set_value_by_name("name", name)?;
        row.set_value_by_name("v", v)?;
        row.set_value_by_name("score", score)?;
        dao.insert(&mut row)
    }

    #[test]
    fn insert_then_query_for_id() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;

        let mut row = dao.new_row();
        row.set_value_by_name("name", "a")?;
        row.set_value_by_name("v", 1)?;
        let id = dao.insert(&mut row)?;
        assert_eq!(row.id(), Some(id));

        let stored = dao.query_for_id_row(id)?.expect("row was inserted");
        assert_eq!(stored.value_by_name("name")?, &Value::from("a"));
        assert_eq!(stored.value_by_name("v")?, &Value::Integer(1));
        assert_eq!(stored.value_by_name("score")?, &Value::Null);
        assert!(dao.id_exists(id)?);
        assert!(!dao.id_exists(id + 1)?);
        assert!(dao.query_for_id_row(id + 1)?.is_none());
        Ok(())
    }

    #[test]
    fn delete_by_id_reduces_count() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        let first = insert(&dao, "a", 1, 0.5)?;
        insert(&dao, "b", 2, 1.5)?;

        assert_eq!(dao.count()?, 2);
        assert_eq!(dao.delete_by_id(first)?, 1);
        assert_eq!(dao.count()?, 1);
        assert_eq!(dao.delete_by_id(first)?, 0);
        Ok(())
    }

    #[test]
    fn delete_by_field_values_removes_duplicates() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        insert(&dao, "a", 1, 0.0)?;
        insert(&dao, "a", 1, 0.0)?;
        insert(&dao, "b", 2, 0.0)?;
        assert_eq!(dao.count()?, 3);

        let mut fields = FieldValues::new();
        fields.insert("name".to_string(), Value::from("a"));
        fields.insert("v".to_string(), Value::Integer(1));
        assert_eq!(dao.query_for_field_values(&fields)?.len(), 2);
        assert_eq!(dao.delete_field_values(&fields)?, 2);
        assert_eq!(dao.count()?, 1);
        Ok(())
    }

    #[test]
    fn queries_by_equality_like_and_tolerance() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        insert(&dao, "alpha", 1, 10.0)?;
        insert(&dao, "beta", 2, 10.4)?;
        insert(&dao, "gamma", 3, 11.0)?;

        assert_eq!(dao.query_for_eq("v", &Value::Integer(2))?.len(), 1);
        assert_eq!(dao.query_for_like("name", &Value::from("%a%"))?.len(), 3);
        assert_eq!(dao.query_for_like("name", &Value::from("_eta"))?.len(), 1);

        let near_ten = ColumnValue::with_tolerance(10.2, 0.25);
        let mut result = dao.query_for_eq_value("score", &near_ten)?;
        let mut names = Vec::new();
        while result.move_to_next() {
            names.push(result.get_by_name::<String>("name")?);
        }
        names.sort();
        assert_eq!(names, vec!["alpha", "beta"]);

        let ordered = dao.query_for_eq_with(
            "name",
            &Value::Null,
            &QueryOptions::default().order_by("id"),
        )?;
        assert!(ordered.is_empty());
        Ok(())
    }

    #[test]
    fn count_min_max_with_and_without_where() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        assert_eq!(dao.max("v", None, &[])?, Value::Null);

        insert(&dao, "a", 5, 0.0)?;
        insert(&dao, "b", 9, 0.0)?;
        insert(&dao, "c", 7, 0.0)?;

        assert_eq!(dao.min("v", None, &[])?, Value::Integer(5));
        assert_eq!(dao.max("V", None, &[])?, Value::Integer(9));
        let args = ["c".to_string()];
        assert_eq!(dao.max("v", Some(r#""name" >= ?"#), &["b".to_string()])?, Value::Integer(9));
        assert_eq!(dao.count_where(Some(r#""name" = ?"#), &args)?, 1);
        Ok(())
    }

    #[test]
    fn update_requires_a_persisted_row() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        let id = insert(&dao, "a", 1, 0.0)?;

        let mut row = dao.query_for_id_row(id)?.expect("inserted");
        row.set_value_by_name("v", 42)?;
        assert_eq!(dao.update(&row)?, 1);
        let updated = dao.query_for_id_row(id)?.expect("still there");
        assert_eq!(updated.get::<i64>("v")?, 42);

        let transient = dao.new_row();
        assert!(matches!(
            dao.update(&transient),
            Err(GpkgError::Configuration(_))
        ));
        Ok(())
    }

    #[test]
    fn not_null_violation_is_reported() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        let mut row = dao.new_row();
        row.set_value_by_name("v", 1)?;

        let err = dao.insert(&mut row).expect_err("name is NOT NULL");
        assert!(matches!(
            err,
            GpkgError::ConstraintViolation { table, operation: "insert", .. } if table == "pts"
        ));
        assert_eq!(dao.count()?, 0);
        Ok(())
    }

    #[test]
    fn rows_without_identity_are_deleted_by_value() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        gpkg.connection()
            .execute_batch("CREATE TABLE pairs (a INTEGER, b TEXT, PRIMARY KEY (a, b))")?;
        let dao = gpkg.dao("pairs")?;

        let mut row = dao.new_row();
        row.set_value_by_name("a", 1)?;
        row.set_value_by_name("b", "x")?;
        dao.insert(&mut row)?;
        assert_eq!(row.id(), None);
        assert!(matches!(dao.query_for_id(1), Err(GpkgError::Configuration(_))));

        let mut other = dao.new_row();
        other.set_value_by_name("a", 2)?;
        other.set_value_by_name("b", "y")?;
        dao.insert(&mut other)?;

        assert_eq!(dao.delete(&row)?, 1);
        assert_eq!(dao.count()?, 1);
        Ok(())
    }

    #[test]
    fn columns_as_replaces_selected_columns() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        insert(&dao, "a", 1, 2.5)?;

        let columns_as = dao.build_columns_as_null(["score"]);
        assert_eq!(columns_as, vec![None, None, None, Some("null".to_string())]);
        let mut result = dao.query_for_all_columns_as(columns_as)?;
        assert!(result.move_to_next());
        assert_eq!(result.value_by_name("score")?, &Value::Null);
        assert_eq!(result.value_by_name("v")?, &Value::Integer(1));

        let err = dao
            .query_for_all_columns_as(vec![None])
            .expect_err("wrong length");
        assert!(matches!(err, GpkgError::UnsupportedOperation(_)));
        Ok(())
    }

    #[test]
    fn single_result_helpers() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        insert(&dao, "a", 3, 0.0)?;
        insert(&dao, "b", 4, 0.0)?;

        assert_eq!(
            dao.query_single_int_result(r#"SELECT SUM("v") FROM "pts""#, &[])?,
            Some(7)
        );
        assert_eq!(
            dao.query_single_string_result(r#"SELECT "name" FROM "pts" WHERE "v" = ?"#, &["4".to_string()])?,
            Some("b".to_string())
        );
        assert_eq!(
            dao.query_single_column_string_results(r#"SELECT "name" FROM "pts" ORDER BY "name""#, &[])?,
            vec!["a".to_string(), "b".to_string()]
        );
        Ok(())
    }

    struct CountingProjection {
        calls: Rc<Cell<usize>>,
    }

    struct NoopTransform;

    impl ProjectionTransform for NoopTransform {
        fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
            (x, y)
        }
    }

    impl Projection for CountingProjection {
        fn unit(&self) -> ProjectionUnit {
            self.calls.set(self.calls.get() + 1);
            ProjectionUnit::Meters
        }

        fn transform_to(&self, _epsg: u32) -> crate::Result<Box<dyn ProjectionTransform>> {
            self.calls.set(self.calls.get() + 1);
            Ok(Box::new(NoopTransform))
        }
    }

    #[test]
    fn zoom_level_needs_a_projection() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = pts(&gpkg)?;
        assert!(matches!(dao.zoom_level(), Err(GpkgError::Configuration(_))));
        Ok(())
    }

    #[test]
    fn zoom_level_of_empty_feature_table_skips_projection() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let mut dao = gpkg.create_feature_table(
            "empty",
            "geom",
            wkb::reader::GeometryType::Point,
            wkb::reader::Dimension::Xy,
            4326,
            &[],
        )?;
        let calls = Rc::new(Cell::new(0));
        dao.set_projection(Some(Box::new(CountingProjection {
            calls: calls.clone(),
        })));

        assert_eq!(dao.bounding_box()?, None);
        assert_eq!(dao.zoom_level()?, 0);
        assert_eq!(calls.get(), 0);
        Ok(())
    }

    #[test]
    fn zoom_level_of_feature_extent() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = gpkg.create_feature_table(
            "cities",
            "geom",
            wkb::reader::GeometryType::Point,
            wkb::reader::Dimension::Xy,
            4326,
            &[UserColumn::new(0, "name", DataType::Text)],
        )?;
        for (x, y) in [(0.0, 0.0), (80.0, 45.0)] {
            let mut row = dao.new_row();
            row.set_value_by_name(
                "geom",
                crate::geometry::gpkg_geometry_from(&geo_types::Point::new(x, y), 4326)?,
            )?;
            dao.insert(&mut row)?;
        }

        assert_eq!(
            dao.bounding_box()?,
            Some(BoundingBox::new(0.0, 0.0, 80.0, 45.0))
        );
        // just under a quarter of the world wide, the height allows more
        assert_eq!(dao.zoom_level()?, 2);
        Ok(())
    }

    #[test]
    fn zoom_level_of_single_point_is_capped() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let dao = gpkg.create_feature_table(
            "lighthouse",
            "geom",
            wkb::reader::GeometryType::Point,
            wkb::reader::Dimension::Xy,
            4326,
            &[],
        )?;
        let mut row = dao.new_row();
        row.set_value_by_name(
            "geom",
            crate::geometry::gpkg_geometry_from(&geo_types::Point::new(12.5, 41.9), 4326)?,
        )?;
        dao.insert(&mut row)?;

        assert_eq!(dao.zoom_level()?, crate::projection::MAX_ZOOM_LEVEL);
        Ok(())
    }

    #[test]
    fn text_argument_matches_integer_column_in_storage_order() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let table = UserTable::new(
            "pts",
            vec![
                UserColumn::primary_key(0, "id"),
                UserColumn::new(1, "value", DataType::Integer),
                UserColumn::new(2, "label", DataType::Text),
            ],
        )?;
        let dao = gpkg.create_table(table)?;
        for (value, label) in [(1, "a"), (2, "b"), (2, "c")] {
            let mut row = dao.new_row();
            row.set_value_by_name("value", value)?;
            row.set_value_by_name("label", label)?;
            dao.insert(&mut row)?;
        }

        let fields = [("value", Value::from("2"))];
        let labels = dao
            .query_for_field_values(fields.iter().map(|(k, v)| (*k, v)))?
            .map(|row| row.value_by_name("label").cloned())
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(labels, vec![Value::from("b"), Value::from("c")]);

        assert_eq!(dao.count()?, 3);
        assert_eq!(
            dao.delete_field_values(fields.iter().map(|(k, v)| (*k, v)))?,
            2
        );
        assert_eq!(dao.count()?, 1);
        Ok(())
    }

    #[test]
    fn rows_without_id_are_deleted_by_blob_value() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        gpkg.connection()
            .execute_batch(
                "CREATE TABLE b (name TEXT, data BLOB);
                 INSERT INTO b VALUES ('x', X'010203'), ('x', X'0A0B'), ('y', NULL);",
            )?;
        let dao = gpkg.dao("b")?;

        let mut row = dao.new_row();
        row.set_value_by_name("name", "x")?;
        row.set_value_by_name("data", Value::Blob(vec![1, 2, 3]))?;
        assert_eq!(dao.delete(&row)?, 1);
        assert_eq!(dao.count()?, 2);

        let mut row = dao.new_row();
        row.set_value_by_name("name", "y")?;
        assert_eq!(dao.delete(&row)?, 1);
        assert_eq!(dao.count()?, 1);
        Ok(())
    }

    #[test]
    fn writes_are_rejected_on_read_only_packages() -> crate::Result<()> {
        use std::time::{SystemTime, UNIX_EPOCH};

        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        path.push(format!("rusqlite_gpkg_dao_read_only_{nanos}.gpkg"));

        {
            let gpkg = Gpkg::new(&path)?;
            insert(&pts(&gpkg)?, "a", 1, 0.0)?;
        }

        let gpkg = Gpkg::open_read_only(&path)?;
        let dao = gpkg.dao("pts")?;
        let mut row = dao.new_row();
        row.set_value_by_name("name", "b")?;
        assert!(matches!(dao.insert(&mut row), Err(GpkgError::ReadOnly)));
        assert!(matches!(dao.delete_all(), Err(GpkgError::ReadOnly)));
        assert!(matches!(dao.drop_table(), Err(GpkgError::ReadOnly)));
        assert_eq!(dao.count()?, 1);

        drop(dao);
        drop(gpkg);
        let _ = std::fs::remove_file(&path);
        Ok(())
    }
}
