/// GeoPackage column data types.
///
/// cf. https://www.geopackage.org/spec140/index.html#table_column_data_types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    TinyInt,
    SmallInt,
    MediumInt,
    Integer,
    Float,
    Double,
    Real,
    Text,
    Blob,
    Date,
    DateTime,
}

impl DataType {
    /// Integer types, which are the only ones usable as an identity key.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::SmallInt | DataType::MediumInt | DataType::Integer
        )
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, DataType::Float | DataType::Double | DataType::Real)
    }

    /// Whether the declared type may carry a maximum length, e.g. `TEXT(10)`.
    pub fn supports_max_length(self) -> bool {
        matches!(self, DataType::Text | DataType::Blob)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(crate::conversions::data_type_to_str(*self))
    }
}
