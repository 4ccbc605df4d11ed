use crate::column::UserColumn;
use crate::error::{GpkgError, Result};
use crate::ogc_sql::sql_create_table;
use std::collections::HashMap;

/// Column layout of a user table, in storage order.
#[derive(Clone, Debug, PartialEq)]
pub struct UserTable {
    name: String,
    columns: Vec<UserColumn>,
    // keyed by lowercased name, SQLite identifiers are case-insensitive
    index_by_name: HashMap<String, usize>,
    pk_index: Option<usize>,
}

impl UserTable {
    /// Build a table model, validating names, ordinal indexes and the
    /// primary key.
    pub fn new(name: impl Into<String>, columns: Vec<UserColumn>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GpkgError::InvalidTable {
                table: name,
                reason: "table name must not be empty".to_string(),
            });
        }
        if columns.is_empty() {
            return Err(GpkgError::Schema { table: name });
        }

        let mut index_by_name = HashMap::with_capacity(columns.len());
        let mut pk_index = None;
        for (position, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(GpkgError::InvalidTable {
                    table: name,
                    reason: format!("column at position {position} has an empty name"),
                });
            }
            if column.index != position {
                return Err(GpkgError::InvalidTable {
                    table: name,
                    reason: format!(
                        "column '{}' has index {} but is at position {position}",
                        column.name, column.index
                    ),
                });
            }
            if index_by_name
                .insert(column.name.to_lowercase(), position)
                .is_some()
            {
                return Err(GpkgError::DuplicateColumn {
                    table: name,
                    column: column.name.clone(),
                });
            }
            if column.primary_key {
                if pk_index.is_some() {
                    return Err(GpkgError::InvalidTable {
                        table: name,
                        reason: "more than one column is marked as primary key".to_string(),
                    });
                }
                pk_index = Some(position);
            }
        }

        Ok(Self {
            name,
            columns,
            index_by_name,
            pk_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[UserColumn] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_by_name.contains_key(&name.to_lowercase())
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.index_by_name
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| GpkgError::ColumnNotFound {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    pub fn column(&self, name: &str) -> Result<&UserColumn> {
        let idx = self.column_index(name)?;
        Ok(&self.columns[idx])
    }

    /// Index of the identity key: the single primary key column, when it has
    /// an integer type.
    pub fn pk_index(&self) -> Option<usize> {
        self.pk_index
            .filter(|idx| self.columns[*idx].data_type.is_integer())
    }

    /// The identity key column, required by id-based operations.
    pub fn pk_column(&self) -> Result<&UserColumn> {
        self.pk_index()
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| {
                GpkgError::Configuration(format!(
                    "table '{}' has no integer primary key column",
                    self.name
                ))
            })
    }

    pub fn geometry_columns(&self) -> impl Iterator<Item = &UserColumn> {
        self.columns.iter().filter(|c| c.is_geometry())
    }

    /// `CREATE TABLE` statement for this layout.
    pub fn create_sql(&self) -> String {
        let column_defs = self
            .columns
            .iter()
            .map(UserColumn::definition_sql)
            .collect::<Vec<String>>()
            .join(", ");
        sql_create_table(&self.name, &column_defs)
    }
}

#[cfg(test)]
mod tests {
    use super::UserTable;
    use crate::column::UserColumn;
    use crate::error::GpkgError;
    use crate::types::DataType;

    fn columns() -> Vec<UserColumn> {
        vec![
            UserColumn::primary_key(0, "id"),
            UserColumn::new(1, "Name", DataType::Text),
            UserColumn::new(2, "score", DataType::Real),
        ]
    }

    #[test]
    fn looks_up_columns_case_insensitively() -> crate::Result<()> {
        let table = UserTable::new("scores", columns())?;
        assert_eq!(table.column_index("name")?, 1);
        assert_eq!(table.column("SCORE")?.data_type, DataType::Real);
        assert_eq!(table.pk_column()?.name, "id");
        assert_eq!(table.column_names(), vec!["id", "Name", "score"]);
        assert!(matches!(
            table.column_index("missing"),
            Err(GpkgError::ColumnNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn rejects_duplicate_column_names() {
        let mut cols = columns();
        cols.push(UserColumn::new(3, "NAME", DataType::Text));
        let err = UserTable::new("scores", cols).expect_err("duplicate should fail");
        assert!(matches!(err, GpkgError::DuplicateColumn { column, .. } if column == "NAME"));
    }

    #[test]
    fn rejects_misnumbered_columns() {
        let cols = vec![UserColumn::new(1, "a", DataType::Text)];
        let err = UserTable::new("t", cols).expect_err("index mismatch should fail");
        assert!(matches!(err, GpkgError::InvalidTable { .. }));
    }

    #[test]
    fn non_integer_primary_key_is_not_an_identity() -> crate::Result<()> {
        let mut code = UserColumn::new(0, "code", DataType::Text);
        code.primary_key = true;
        let table = UserTable::new("codes", vec![code])?;
        assert_eq!(table.pk_index(), None);
        assert!(matches!(
            table.pk_column(),
            Err(GpkgError::Configuration(_))
        ));
        Ok(())
    }

    #[test]
    fn renders_create_table() -> crate::Result<()> {
        let table = UserTable::new("scores", columns())?;
        assert_eq!(
            table.create_sql(),
            r#"CREATE TABLE "scores" ("id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, "Name" TEXT, "score" REAL)"#
        );
        Ok(())
    }
}
