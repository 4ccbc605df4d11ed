use crate::column::UserColumn;
use crate::conversions::{
    dimension_from_zm, dimension_to_zm, geometry_type_from_str, geometry_type_to_str,
};
use crate::dao::UserDao;
use crate::error::{GpkgError, Result};
use crate::kind::{AttributesTable, CustomTable, FeatureTable, TableKind, TileTable};
use crate::ogc_sql::{
    SQL_INSERT_GPKG_CONTENTS, SQL_INSERT_GPKG_GEOMETRY_COLUMNS, SQL_INSERT_GPKG_TILE_MATRIX_SET,
    SQL_LIST_CONTENTS, SQL_LIST_CONTENTS_OF_TYPE, SQL_SELECT_GEOMETRY_COLUMN_META,
    SQL_SELECT_SRS_ORGANIZATION, SQL_SELECT_TILE_MATRIX_SET, SQL_SRS_EXISTS, SQL_TABLE_EXISTS,
    execute_rtree_sqls, gpkg_rtree_drop_sql, initialize_gpkg, sql_drop_table,
};
use crate::projection::{BoundingBox, EpsgProjection};
use crate::sql_functions::register_spatial_functions;
use crate::table::UserTable;
use rusqlite::{OpenFlags, OptionalExtension};
use std::path::Path;
use tracing::{debug, instrument};

/// Geometry column registration of a feature table.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryColumnMeta {
    pub column_name: String,
    pub geometry_type: wkb::reader::GeometryType,
    pub dimension: wkb::reader::Dimension,
    pub srs_id: u32,
}

#[derive(Debug)]
/// GeoPackage connection wrapper, the entry point for table DAOs.
pub struct Gpkg {
    conn: rusqlite::Connection,
    read_only: bool,
}

impl Gpkg {
    /// Open a GeoPackage in read-only mode.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = rusqlite::Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        register_spatial_functions(&conn)?;
        Ok(Self {
            conn,
            read_only: true,
        })
    }

    /// Open an existing GeoPackage in read-write mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GpkgError::PathNotFound {
                path: path.display().to_string(),
            });
        }

        let conn = rusqlite::Connection::open(path)?;
        register_spatial_functions(&conn)?;
        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Create a new GeoPackage with the core tables.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(GpkgError::PathAlreadyExists {
                path: path.display().to_string(),
            });
        }

        let conn = rusqlite::Connection::open(path)?;

        initialize_gpkg(&conn)?;
        register_spatial_functions(&conn)?;

        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Create a transient GeoPackage in memory.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;

        initialize_gpkg(&conn)?;
        register_spatial_functions(&conn)?;

        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Register a spatial reference system in `gpkg_spatial_ref_sys`.
    ///
    /// EPSG:4326, EPSG:3857 and the two undefined systems (-1 and 0) are
    /// registered when the GeoPackage is created. Anything else has to be
    /// added here, with its WKT definition, before a table can use it.
    pub fn register_srs(
        &self,
        srs_name: &str,
        srs_id: i32,
        organization: &str,
        organization_coordsys_id: i32,
        definition: &str,
        description: &str,
    ) -> Result<()> {
        self.ensure_writable()?;

        self.conn.execute(
            "INSERT INTO gpkg_spatial_ref_sys \
            (srs_name, srs_id, organization, organization_coordsys_id, definition, description) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                srs_name,
                srs_id,
                organization,
                organization_coordsys_id,
                definition,
                description
            ],
        )?;
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(GpkgError::ReadOnly);
        }
        Ok(())
    }

    /// Whether a table of this name exists, ignoring case.
    pub fn is_table(&self, table_name: &str) -> Result<bool> {
        Ok(self
            .conn
            .query_row(SQL_TABLE_EXISTS, [table_name], |row| row.get(0))?)
    }

    /// Tables registered in `gpkg_contents`.
    pub fn tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(SQL_LIST_CONTENTS)?;
        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(tables)
    }

    pub fn tables_of_type(&self, data_type: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(SQL_LIST_CONTENTS_OF_TYPE)?;
        let tables = stmt
            .query_map([data_type], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(tables)
    }

    pub fn feature_tables(&self) -> Result<Vec<String>> {
        self.tables_of_type("features")
    }

    pub fn tile_tables(&self) -> Result<Vec<String>> {
        self.tables_of_type("tiles")
    }

    pub fn attributes_tables(&self) -> Result<Vec<String>> {
        self.tables_of_type("attributes")
    }

    /// DAO over any existing table.
    pub fn dao(&self, table_name: &str) -> Result<UserDao<'_, CustomTable>> {
        UserDao::read(self, table_name, CustomTable)
    }

    pub fn attributes_dao(&self, table_name: &str) -> Result<UserDao<'_, AttributesTable>> {
        UserDao::read(self, table_name, AttributesTable)
    }

    /// DAO over a registered feature table, with the built-in projection
    /// attached when its SRS is EPSG:4326 or EPSG:3857.
    pub fn feature_dao(&self, table_name: &str) -> Result<UserDao<'_, FeatureTable>> {
        let meta = self.geometry_column_meta(table_name)?;
        let kind = FeatureTable::new(meta.column_name, meta.srs_id);
        self.with_srs_projection(UserDao::read(self, table_name, kind)?, meta.srs_id)
    }

    pub fn tile_dao(&self, table_name: &str) -> Result<UserDao<'_, TileTable>> {
        let (srs_id, _) = self.tile_matrix_set(table_name)?;
        self.with_srs_projection(UserDao::read(self, table_name, TileTable)?, srs_id)
    }

    /// Built-in projection for an `srs_id`, when it is EPSG:4326 or EPSG:3857.
    pub fn projection_for_srs(&self, srs_id: u32) -> Result<Option<EpsgProjection>> {
        let organization = self
            .conn
            .query_row(SQL_SELECT_SRS_ORGANIZATION, [srs_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .optional()?;
        Ok(match organization {
            Some((org, code)) if org.eq_ignore_ascii_case("EPSG") => u32::try_from(code)
                .ok()
                .and_then(|code| EpsgProjection::new(code).ok()),
            _ => None,
        })
    }

    /// Create a plain table without GeoPackage metadata.
    #[instrument(name = "gpkg::create_table", level = "debug", skip(self, table), fields(table = %table.name()))]
    pub fn create_table(&self, table: UserTable) -> Result<UserDao<'_, CustomTable>> {
        self.create_user_table(&table)?;
        UserDao::new(self, table, CustomTable)
    }

    /// Create a table and register it as `attributes` in `gpkg_contents`.
    #[instrument(name = "gpkg::create_attributes_table", level = "debug", skip(self, table), fields(table = %table.name()))]
    pub fn create_attributes_table(
        &self,
        table: UserTable,
    ) -> Result<UserDao<'_, AttributesTable>> {
        AttributesTable.validate(&table)?;
        self.create_user_table(&table)?;
        self.insert_contents(table.name(), "attributes", None)?;
        UserDao::new(self, table, AttributesTable)
    }

    /// Create a feature table with an `fid` key, a geometry column and an
    /// R-tree spatial index. `other_columns` are renumbered after those two.
    #[instrument(name = "gpkg::create_feature_table", level = "debug", skip(self, other_columns))]
    pub fn create_feature_table(
        &self,
        table_name: &str,
        geometry_column: &str,
        geometry_type: wkb::reader::GeometryType,
        dimension: wkb::reader::Dimension,
        srs_id: u32,
        other_columns: &[UserColumn],
    ) -> Result<UserDao<'_, FeatureTable>> {
        self.ensure_srs_exists(srs_id)?;

        let mut columns = Vec::with_capacity(other_columns.len() + 2);
        columns.push(UserColumn::primary_key(0, "fid"));
        columns.push(UserColumn::geometry(1, geometry_column, geometry_type));
        for (offset, column) in other_columns.iter().enumerate() {
            columns.push(UserColumn {
                index: offset + 2,
                ..column.clone()
            });
        }
        let table = UserTable::new(table_name, columns)?;
        let kind = FeatureTable::new(geometry_column, srs_id);
        kind.validate(&table)?;

        self.create_user_table(&table)?;
        self.insert_contents(table_name, "features", Some(srs_id))?;
        let (z, m) = dimension_to_zm(dimension);
        self.conn.execute(
            SQL_INSERT_GPKG_GEOMETRY_COLUMNS,
            rusqlite::params![
                table_name,
                geometry_column,
                geometry_type_to_str(geometry_type),
                srs_id,
                z,
                m
            ],
        )?;
        execute_rtree_sqls(&self.conn, table_name, geometry_column, "fid")?;

        self.with_srs_projection(UserDao::new(self, table, kind)?, srs_id)
    }

    /// Create a tile pyramid table covering `bounds` in the given SRS.
    #[instrument(name = "gpkg::create_tile_table", level = "debug", skip(self))]
    pub fn create_tile_table(
        &self,
        table_name: &str,
        srs_id: u32,
        bounds: BoundingBox,
    ) -> Result<UserDao<'_, TileTable>> {
        self.ensure_srs_exists(srs_id)?;

        let table = UserTable::new(table_name, TileTable::columns())?;
        self.create_user_table(&table)?;
        self.insert_contents(table_name, "tiles", Some(srs_id))?;
        self.conn.execute(
            SQL_INSERT_GPKG_TILE_MATRIX_SET,
            rusqlite::params![
                table_name,
                srs_id,
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y
            ],
        )?;

        self.with_srs_projection(UserDao::new(self, table, TileTable)?, srs_id)
    }

    /// Drop a table together with its GeoPackage metadata and spatial index.
    #[instrument(name = "gpkg::delete_table", level = "debug", skip(self))]
    pub fn delete_table(&self, table_name: &str) -> Result<()> {
        self.ensure_writable()?;

        match self.geometry_column_meta(table_name) {
            Ok(meta) => self
                .conn
                .execute_batch(&gpkg_rtree_drop_sql(table_name, &meta.column_name))?,
            Err(GpkgError::MissingGeometryColumn { .. }) => {}
            Err(e) => return Err(e),
        }
        self.conn.execute(
            "DELETE FROM gpkg_geometry_columns WHERE table_name = ?1",
            [table_name],
        )?;
        self.conn.execute(
            "DELETE FROM gpkg_tile_matrix_set WHERE table_name = ?1",
            [table_name],
        )?;
        self.conn.execute(
            "DELETE FROM gpkg_tile_matrix WHERE table_name = ?1",
            [table_name],
        )?;
        self.conn
            .execute("DELETE FROM gpkg_contents WHERE table_name = ?1", [table_name])?;
        self.conn.execute_batch(&sql_drop_table(table_name))?;
        Ok(())
    }

    /// Resolve the geometry column registration of a feature table.
    pub fn geometry_column_meta(&self, table_name: &str) -> Result<GeometryColumnMeta> {
        let mut stmt = self.conn.prepare(SQL_SELECT_GEOMETRY_COLUMN_META)?;

        let row = stmt
            .query_row([table_name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i8>(2)?,
                    row.get::<_, i8>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            })
            .optional()?;
        let Some((column_name, geometry_type_str, z, m, srs_id)) = row else {
            return Err(GpkgError::MissingGeometryColumn {
                table: table_name.to_string(),
            });
        };

        Ok(GeometryColumnMeta {
            column_name,
            geometry_type: geometry_type_from_str(&geometry_type_str)?,
            dimension: dimension_from_zm(z, m)?,
            srs_id,
        })
    }

    /// `srs_id` and bounds recorded in `gpkg_tile_matrix_set`.
    pub fn tile_matrix_set(&self, table_name: &str) -> Result<(u32, BoundingBox)> {
        self.conn
            .query_row(SQL_SELECT_TILE_MATRIX_SET, [table_name], |row| {
                Ok((
                    row.get(0)?,
                    BoundingBox::new(row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?),
                ))
            })
            .optional()?
            .ok_or_else(|| GpkgError::InvalidTable {
                table: table_name.to_string(),
                reason: "not registered in gpkg_tile_matrix_set".to_string(),
            })
    }

    fn create_user_table(&self, table: &UserTable) -> Result<()> {
        self.ensure_writable()?;
        if self.is_table(table.name())? {
            return Err(GpkgError::TableAlreadyExists {
                table: table.name().to_string(),
            });
        }
        self.conn.execute_batch(&table.create_sql())?;
        debug!(table = %table.name(), columns = table.column_count(), "created table");
        Ok(())
    }

    fn insert_contents(&self, table_name: &str, data_type: &str, srs_id: Option<u32>) -> Result<()> {
        self.conn.execute(
            SQL_INSERT_GPKG_CONTENTS,
            rusqlite::params![table_name, data_type, table_name, srs_id],
        )?;
        Ok(())
    }

    fn ensure_srs_exists(&self, srs_id: u32) -> Result<()> {
        let srs_exists: bool = self
            .conn
            .query_row(SQL_SRS_EXISTS, [srs_id], |row| row.get(0))?;
        if !srs_exists {
            return Err(GpkgError::MissingSpatialRefSysId { srs_id });
        }
        Ok(())
    }

    fn with_srs_projection<'a, K: TableKind>(
        &self,
        mut dao: UserDao<'a, K>,
        srs_id: u32,
    ) -> Result<UserDao<'a, K>> {
        if let Some(projection) = self.projection_for_srs(srs_id)? {
            dao.set_projection(Some(Box::new(projection)));
        }
        Ok(dao)
    }
}

#[cfg(test)]
mod tests {
    use super::Gpkg;
    use crate::column::UserColumn;
    use crate::error::GpkgError;
    use crate::projection::{BoundingBox, EPSG_WEB_MERCATOR, ProjectionUnit};
    use crate::table::UserTable;
    use crate::types::DataType;
    use crate::value::Value;

    #[test]
    fn create_feature_table_requires_existing_srs() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let err = gpkg
            .create_feature_table(
                "missing_srs",
                "geom",
                wkb::reader::GeometryType::Point,
                wkb::reader::Dimension::Xy,
                9999,
                &[],
            )
            .expect_err("missing srs should fail");
        assert!(matches!(err, GpkgError::MissingSpatialRefSysId { srs_id: 9999 }));
        assert!(!gpkg.is_table("missing_srs")?);
        Ok(())
    }

    #[test]
    fn new_fails_if_file_exists() {
        use std::fs;
        use std::time::{SystemTime, UNIX_EPOCH};

        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        path.push(format!("rusqlite_gpkg_dao_exists_{nanos}.gpkg"));

        fs::write(&path, []).expect("create temp file");
        let err = Gpkg::new(&path).expect_err("existing file should fail");
        assert!(matches!(err, GpkgError::PathAlreadyExists { .. }));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn open_fails_if_missing_file() {
        let mut path = std::env::temp_dir();
        path.push("rusqlite_gpkg_dao_definitely_missing.gpkg");

        let err = Gpkg::open(&path).expect_err("missing file should fail");
        assert!(matches!(err, GpkgError::PathNotFound { .. }));
    }

    #[test]
    fn creates_and_lists_tables_by_kind() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        gpkg.create_feature_table(
            "roads",
            "geom",
            wkb::reader::GeometryType::LineString,
            wkb::reader::Dimension::Xy,
            4326,
            &[UserColumn::new(0, "name", DataType::Text)],
        )?;
        gpkg.create_attributes_table(UserTable::new(
            "notes",
            vec![
                UserColumn::primary_key(0, "id"),
                UserColumn::new(1, "body", DataType::Text),
            ],
        )?)?;
        gpkg.create_tile_table("imagery", 3857, BoundingBox::new(-1.0, -1.0, 1.0, 1.0))?;

        assert_eq!(gpkg.tables()?, vec!["imagery", "notes", "roads"]);
        assert_eq!(gpkg.feature_tables()?, vec!["roads"]);
        assert_eq!(gpkg.attributes_tables()?, vec!["notes"]);
        assert_eq!(gpkg.tile_tables()?, vec!["imagery"]);
        assert!(gpkg.is_table("ROADS")?);

        let roads = gpkg.feature_dao("roads")?;
        assert_eq!(roads.table().column_names(), vec!["fid", "geom", "name"]);
        assert_eq!(roads.kind().geometry_column(), "geom");
        assert_eq!(
            roads.projection().map(|p| p.unit()),
            Some(ProjectionUnit::Degrees)
        );
        Ok(())
    }

    #[test]
    fn duplicate_tables_are_rejected() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let table = UserTable::new("t", vec![UserColumn::primary_key(0, "id")])?;
        gpkg.create_table(table.clone())?;
        let err = gpkg.create_table(table).expect_err("already exists");
        assert!(matches!(err, GpkgError::TableAlreadyExists { table } if table == "t"));
        Ok(())
    }

    #[test]
    fn tile_bounds_come_from_the_matrix_set() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        let bounds = BoundingBox::new(-1000.0, -500.0, 1000.0, 500.0);
        let tiles = gpkg.create_tile_table("tiles", EPSG_WEB_MERCATOR, bounds)?;
        assert_eq!(tiles.bounding_box()?, None);

        let mut tile = tiles.new_row();
        tile.set_value_by_name("zoom_level", 0)?;
        tile.set_value_by_name("tile_column", 0)?;
        tile.set_value_by_name("tile_row", 0)?;
        tile.set_value_by_name("tile_data", Value::Blob(vec![0x89, 0x50]))?;
        tiles.insert(&mut tile)?;

        assert_eq!(tiles.bounding_box()?, Some(bounds));
        assert_eq!(gpkg.tile_dao("tiles")?.bounding_box()?, Some(bounds));
        // 2000 m wide in a world about 40000 km wide
        assert_eq!(tiles.zoom_level()?, 14);
        Ok(())
    }

    #[test]
    fn delete_table_removes_metadata() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        gpkg.create_feature_table(
            "pois",
            "geom",
            wkb::reader::GeometryType::Point,
            wkb::reader::Dimension::Xy,
            4326,
            &[],
        )?;
        gpkg.delete_table("pois")?;
        assert!(!gpkg.is_table("pois")?);
        assert!(!gpkg.is_table("rtree_pois_geom")?);
        assert!(gpkg.tables()?.is_empty());
        assert!(matches!(
            gpkg.feature_dao("pois"),
            Err(GpkgError::MissingGeometryColumn { .. })
        ));
        Ok(())
    }

    #[test]
    fn projection_lookup_by_srs() -> crate::Result<()> {
        let gpkg = Gpkg::open_in_memory()?;
        assert!(gpkg.projection_for_srs(4326)?.is_some());
        assert!(gpkg.projection_for_srs(3857)?.is_some());
        assert!(gpkg.projection_for_srs(0)?.is_none());
        assert!(gpkg.projection_for_srs(12345)?.is_none());
        Ok(())
    }
}
