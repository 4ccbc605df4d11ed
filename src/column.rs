use crate::conversions::{data_type_to_str, geometry_type_to_str};
use crate::ogc_sql::{quote_ident, sql_literal};
use crate::types::DataType;
use crate::value::Value;

/// Definition of a single column of a user table.
#[derive(Clone, Debug, PartialEq)]
pub struct UserColumn {
    pub index: usize,
    pub name: String,
    pub data_type: DataType,
    /// Set for geometry columns, which are stored as `BLOB`.
    pub geometry_type: Option<wkb::reader::GeometryType>,
    /// Declared maximum length, e.g. `10` for `TEXT(10)`.
    pub max: Option<u64>,
    pub not_null: bool,
    pub default_value: Option<Value>,
    pub primary_key: bool,
}

impl UserColumn {
    pub fn new(index: usize, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            index,
            name: name.into(),
            data_type,
            geometry_type: None,
            max: None,
            not_null: false,
            default_value: None,
            primary_key: false,
        }
    }

    /// `INTEGER PRIMARY KEY AUTOINCREMENT` identity column.
    pub fn primary_key(index: usize, name: impl Into<String>) -> Self {
        Self {
            not_null: true,
            primary_key: true,
            ..Self::new(index, name, DataType::Integer)
        }
    }

    pub fn geometry(
        index: usize,
        name: impl Into<String>,
        geometry_type: wkb::reader::GeometryType,
    ) -> Self {
        Self {
            geometry_type: Some(geometry_type),
            ..Self::new(index, name, DataType::Blob)
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_max(mut self, max: u64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn is_geometry(&self) -> bool {
        self.geometry_type.is_some()
    }

    /// Column type as written in `CREATE TABLE`, including the max suffix.
    pub fn type_name(&self) -> String {
        let base = match self.geometry_type {
            Some(geometry_type) => geometry_type_to_str(geometry_type),
            None => data_type_to_str(self.data_type),
        };
        match self.max {
            Some(max) => format!("{base}({max})"),
            None => base.to_string(),
        }
    }

    /// Column definition used inside `CREATE TABLE`.
    pub(crate) fn definition_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.type_name());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.data_type == DataType::Integer {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default_value) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&sql_literal(default_value));
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::UserColumn;
    use crate::types::DataType;

    #[test]
    fn builds_column_definitions() {
        assert_eq!(
            UserColumn::primary_key(0, "id").definition_sql(),
            r#""id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"#
        );
        assert_eq!(
            UserColumn::new(1, "name", DataType::Text)
                .with_max(10)
                .not_null()
                .with_default("n/a")
                .definition_sql(),
            r#""name" TEXT(10) NOT NULL DEFAULT 'n/a'"#
        );
        assert_eq!(
            UserColumn::geometry(2, "geom", wkb::reader::GeometryType::Point).definition_sql(),
            r#""geom" POINT"#
        );
    }
}
