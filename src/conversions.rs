use crate::error::GpkgError;
use crate::types::DataType;

#[inline]
pub(crate) fn geometry_type_to_str(geometry_type: wkb::reader::GeometryType) -> &'static str {
    match geometry_type {
        wkb::reader::GeometryType::GeometryCollection => "GEOMETRYCOLLECTION",
        wkb::reader::GeometryType::Point => "POINT",
        wkb::reader::GeometryType::LineString => "LINESTRING",
        wkb::reader::GeometryType::Polygon => "POLYGON",
        wkb::reader::GeometryType::MultiPoint => "MULTIPOINT",
        wkb::reader::GeometryType::MultiLineString => "MULTILINESTRING",
        wkb::reader::GeometryType::MultiPolygon => "MULTIPOLYGON",
        // wkb has no other variants GeoPackage can declare; fall back to the
        // generic name rather than panic on metadata we wrote ourselves.
        _ => "GEOMETRY",
    }
}

#[inline]
pub(crate) fn geometry_type_from_str(
    geometry_type_str: &str,
) -> Result<wkb::reader::GeometryType, GpkgError> {
    let s = geometry_type_str;
    if s.eq_ignore_ascii_case("GEOMETRY") || s.eq_ignore_ascii_case("GEOMETRYCOLLECTION") {
        Ok(wkb::reader::GeometryType::GeometryCollection)
    } else if s.eq_ignore_ascii_case("POINT") {
        Ok(wkb::reader::GeometryType::Point)
    } else if s.eq_ignore_ascii_case("LINESTRING") {
        Ok(wkb::reader::GeometryType::LineString)
    } else if s.eq_ignore_ascii_case("POLYGON") {
        Ok(wkb::reader::GeometryType::Polygon)
    } else if s.eq_ignore_ascii_case("MULTIPOINT") {
        Ok(wkb::reader::GeometryType::MultiPoint)
    } else if s.eq_ignore_ascii_case("MULTILINESTRING") {
        Ok(wkb::reader::GeometryType::MultiLineString)
    } else if s.eq_ignore_ascii_case("MULTIPOLYGON") {
        Ok(wkb::reader::GeometryType::MultiPolygon)
    } else {
        Err(GpkgError::UnsupportedGeometryType(
            geometry_type_str.to_string(),
        ))
    }
}

#[inline]
pub(crate) fn dimension_to_zm(dimension: wkb::reader::Dimension) -> (i8, i8) {
    match dimension {
        wkb::reader::Dimension::Xy => (0, 0),
        wkb::reader::Dimension::Xyz => (1, 0),
        wkb::reader::Dimension::Xym => (0, 1),
        wkb::reader::Dimension::Xyzm => (1, 1),
    }
}

#[inline]
pub(crate) fn dimension_from_zm(z: i8, m: i8) -> Result<wkb::reader::Dimension, GpkgError> {
    match (z, m) {
        (0, 0) => Ok(wkb::reader::Dimension::Xy),
        (1, 0) => Ok(wkb::reader::Dimension::Xyz),
        (0, 1) => Ok(wkb::reader::Dimension::Xym),
        (1, 1) => Ok(wkb::reader::Dimension::Xyzm),
        // Note: the spec says z and m are
        //
        //   0: z/m values prohibited
        //   1: z/m values mandatory
        //   2: z/m values optional
        //
        // but I don't know how 2 can be handled, just treat as an invalid value
        _ => Err(GpkgError::InvalidDimension { z, m }),
    }
}

#[inline]
pub(crate) fn data_type_to_str(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Boolean => "BOOLEAN",
        DataType::TinyInt => "TINYINT",
        DataType::SmallInt => "SMALLINT",
        DataType::MediumInt => "MEDIUMINT",
        DataType::Integer => "INTEGER",
        DataType::Float => "FLOAT",
        DataType::Double => "DOUBLE",
        DataType::Real => "REAL",
        DataType::Text => "TEXT",
        DataType::Blob => "BLOB",
        DataType::Date => "DATE",
        DataType::DateTime => "DATETIME",
    }
}

/// Match a bare (suffix-free) type name against the GeoPackage data types.
#[inline]
pub(crate) fn data_type_from_str(data_type_str: &str) -> Option<DataType> {
    let s = data_type_str.trim();
    if s.eq_ignore_ascii_case("BOOLEAN") {
        Some(DataType::Boolean)
    } else if s.eq_ignore_ascii_case("TINYINT") {
        Some(DataType::TinyInt)
    } else if s.eq_ignore_ascii_case("SMALLINT") {
        Some(DataType::SmallInt)
    } else if s.eq_ignore_ascii_case("MEDIUMINT") {
        Some(DataType::MediumInt)
    } else if s.eq_ignore_ascii_case("INT") || s.eq_ignore_ascii_case("INTEGER") {
        Some(DataType::Integer)
    } else if s.eq_ignore_ascii_case("FLOAT") {
        Some(DataType::Float)
    } else if s.eq_ignore_ascii_case("DOUBLE") {
        Some(DataType::Double)
    } else if s.eq_ignore_ascii_case("REAL") {
        Some(DataType::Real)
    } else if s.eq_ignore_ascii_case("TEXT") {
        Some(DataType::Text)
    } else if s.eq_ignore_ascii_case("BLOB") {
        Some(DataType::Blob)
    } else if s.eq_ignore_ascii_case("DATE") {
        Some(DataType::Date)
    } else if s.eq_ignore_ascii_case("DATETIME") {
        Some(DataType::DateTime)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_names_roundtrip() {
        for data_type in [
            DataType::Boolean,
            DataType::TinyInt,
            DataType::SmallInt,
            DataType::MediumInt,
            DataType::Integer,
            DataType::Float,
            DataType::Double,
            DataType::Real,
            DataType::Text,
            DataType::Blob,
            DataType::Date,
            DataType::DateTime,
        ] {
            assert_eq!(
                data_type_from_str(data_type_to_str(data_type)),
                Some(data_type)
            );
        }
    }

    #[test]
    fn data_type_lookup_ignores_case_and_accepts_int() {
        assert_eq!(data_type_from_str("int"), Some(DataType::Integer));
        assert_eq!(data_type_from_str("DateTime"), Some(DataType::DateTime));
        assert_eq!(data_type_from_str("VARCHAR"), None);
        assert_eq!(data_type_from_str("POINT"), None);
    }

    #[test]
    fn dimension_rejects_optional_flag() {
        assert!(matches!(
            dimension_from_zm(2, 0),
            Err(GpkgError::InvalidDimension { z: 2, m: 0 })
        ));
        assert_eq!(
            dimension_to_zm(dimension_from_zm(1, 1).expect("xyzm")),
            (1, 1)
        );
    }
}
