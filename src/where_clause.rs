use crate::error::{GpkgError, Result};
use crate::ogc_sql::quote_ident;
use crate::value::Value;
use indexmap::IndexMap;
use std::borrow::Borrow;

/// Ordered field name to value map for multi-field queries and deletes.
pub type FieldValues = IndexMap<String, Value>;

/// Ordered field name to [`ColumnValue`] map.
pub type ColumnValues = IndexMap<String, ColumnValue>;

/// A value to match, optionally within a numeric tolerance.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnValue {
    value: Value,
    tolerance: Option<f64>,
}

impl ColumnValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            tolerance: None,
        }
    }

    /// Match numeric values in `[value - tolerance, value + tolerance]`.
    pub fn with_tolerance(value: impl Into<Value>, tolerance: f64) -> Self {
        Self {
            value: value.into(),
            tolerance: Some(tolerance),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }
}

impl From<Value> for ColumnValue {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// A where clause together with its positional arguments.
///
/// Every `?` in the clause has exactly one argument, in order. Arguments are
/// sent as text and coerced by SQLite according to the column affinity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Where {
    clause: String,
    args: Vec<String>,
}

impl Where {
    /// `"field" = ?`, or `"field" IS NULL` without argument for a null value.
    pub fn eq(field: &str, value: &Value) -> Result<Self> {
        Self::compare(field, value, "=")
    }

    /// `"field" LIKE ?`, or `"field" IS NULL` for a null value.
    pub fn like(field: &str, value: &Value) -> Result<Self> {
        Self::compare(field, value, "LIKE")
    }

    pub fn column_value(field: &str, value: &ColumnValue) -> Result<Self> {
        let Some(tolerance) = value.tolerance else {
            return Self::eq(field, &value.value);
        };
        let center = match (&value.value, tolerance.is_finite() && tolerance > 0.0) {
            (v, true) if v.is_numeric() => v.as_f64().unwrap_or_default(),
            (v, true) => {
                return Err(GpkgError::UnsupportedOperation(format!(
                    "tolerance on field '{field}' requires a numeric value, got {}",
                    v.type_name()
                )));
            }
            (_, false) => {
                return Err(GpkgError::UnsupportedOperation(format!(
                    "tolerance on field '{field}' must be finite and positive, got {tolerance}"
                )));
            }
        };
        let quoted = quote_ident(field);
        Ok(Self {
            clause: format!("{quoted} >= ? AND {quoted} <= ?"),
            args: vec![
                real_arg(field, center - tolerance)?,
                real_arg(field, center + tolerance)?,
            ],
        })
    }

    pub fn column_value_like(field: &str, value: &ColumnValue) -> Result<Self> {
        if value.tolerance.is_some() {
            return Err(GpkgError::UnsupportedOperation(format!(
                "LIKE on field '{field}' can not be combined with a tolerance"
            )));
        }
        Self::like(field, &value.value)
    }

    /// Equality over every pair, joined with `AND` in iteration order.
    pub fn field_values<I, K, V>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<Value>,
    {
        fields.into_iter().try_fold(Self::default(), |acc, (k, v)| {
            Ok(acc.and(Self::eq(k.as_ref(), v.borrow())?))
        })
    }

    /// Equality over every stored value of a row. BLOB columns are compared
    /// through `hex()`, since arguments are bound as text.
    pub(crate) fn stored_values<I, K, V>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<Value>,
    {
        fields.into_iter().try_fold(Self::default(), |acc, (k, v)| {
            let next = match v.borrow() {
                Value::Blob(bytes) => Self {
                    clause: format!("hex({}) = ?", quote_ident(k.as_ref())),
                    args: vec![upper_hex(bytes)],
                },
                other => Self::eq(k.as_ref(), other)?,
            };
            Ok(acc.and(next))
        })
    }

    pub fn column_values<I, K, V>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<ColumnValue>,
    {
        fields.into_iter().try_fold(Self::default(), |acc, (k, v)| {
            Ok(acc.and(Self::column_value(k.as_ref(), v.borrow())?))
        })
    }

    /// A caller-written clause. The caller is responsible for aligning `?`
    /// with the arguments.
    pub fn raw<I, S>(clause: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clause: clause.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(mut self, other: Where) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        self.clause = format!("{} AND {}", self.clause, other.clause);
        self.args.extend(other.args);
        self
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Number of `?` placeholders outside of string literals and quoted
    /// identifiers.
    pub fn placeholder_count(&self) -> usize {
        let mut quote: Option<char> = None;
        self.clause
            .chars()
            .filter(|&c| match quote {
                // a doubled quote closes and reopens, which nets out
                Some(q) if c == q => {
                    quote = None;
                    false
                }
                Some(_) => false,
                None if c == '\'' || c == '"' => {
                    quote = Some(c);
                    false
                }
                None => c == '?',
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.clause.trim().is_empty()
    }

    pub(crate) fn as_clause(&self) -> Option<&str> {
        (!self.is_empty()).then_some(self.clause.as_str())
    }

    fn compare(field: &str, value: &Value, operator: &str) -> Result<Self> {
        let quoted = quote_ident(field);
        match value {
            Value::Null => Ok(Self {
                clause: format!("{quoted} IS NULL"),
                args: Vec::new(),
            }),
            v => Ok(Self {
                clause: format!("{quoted} {operator} ?"),
                args: vec![value_to_arg(field, v)?],
            }),
        }
    }
}

/// Text form of a value sent as a where argument.
pub(crate) fn value_to_arg(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::Integer(v) => Ok(v.to_string()),
        Value::Real(v) => real_arg(field, *v),
        Value::Text(v) => Ok(v.clone()),
        Value::Null => Err(GpkgError::UnsupportedOperation(format!(
            "NULL can not be bound as an argument for field '{field}'"
        ))),
        Value::Blob(_) => Err(GpkgError::UnsupportedOperation(format!(
            "BLOB values can not be used as a where argument for field '{field}'"
        ))),
    }
}

// Same form as SQLite's `hex()`.
fn upper_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

// `Display` for f64 is the shortest text that parses back to the same value.
fn real_arg(field: &str, v: f64) -> Result<String> {
    if !v.is_finite() {
        return Err(GpkgError::UnsupportedOperation(format!(
            "non-finite value {v} can not be used as a where argument for field '{field}'"
        )));
    }
    Ok(v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn null_becomes_is_null_without_argument() -> crate::Result<()> {
        let w = Where::eq("name", &Value::Null)?;
        assert_eq!(w.clause(), r#""name" IS NULL"#);
        assert!(w.args().is_empty());
        assert_eq!(w.placeholder_count(), 0);
        Ok(())
    }

    #[test]
    fn equality_and_like() -> crate::Result<()> {
        let w = Where::eq("id", &Value::Integer(7))?;
        assert_eq!(w.clause(), r#""id" = ?"#);
        assert_eq!(w.args(), &["7".to_string()]);

        let w = Where::like("name", &Value::from("a%"))?;
        assert_eq!(w.clause(), r#""name" LIKE ?"#);
        assert_eq!(w.args(), &["a%".to_string()]);
        Ok(())
    }

    #[test]
    fn quotes_field_names() -> crate::Result<()> {
        let w = Where::eq(r#"odd"name"#, &Value::Integer(1))?;
        assert_eq!(w.clause(), r#""odd""name" = ?"#);
        Ok(())
    }

    #[test]
    fn tolerance_builds_a_range() -> crate::Result<()> {
        let w = Where::column_value("score", &ColumnValue::with_tolerance(10.0, 0.5))?;
        assert_eq!(w.clause(), r#""score" >= ? AND "score" <= ?"#);
        assert_eq!(w.args(), &["9.5".to_string(), "10.5".to_string()]);
        Ok(())
    }

    #[test]
    fn invalid_tolerances_are_rejected() {
        for value in [
            ColumnValue::with_tolerance("abc", 1.0),
            ColumnValue::with_tolerance(Value::Null, 1.0),
            ColumnValue::with_tolerance(1.0, 0.0),
            ColumnValue::with_tolerance(1.0, -1.0),
            ColumnValue::with_tolerance(1.0, f64::NAN),
        ] {
            assert!(matches!(
                Where::column_value("f", &value),
                Err(GpkgError::UnsupportedOperation(_))
            ));
        }
    }

    #[test]
    fn like_rejects_tolerance() {
        let err = Where::column_value_like("f", &ColumnValue::with_tolerance(1, 0.1))
            .expect_err("like with tolerance");
        assert!(matches!(err, GpkgError::UnsupportedOperation(_)));
    }

    #[test]
    fn blob_arguments_are_rejected() {
        let err = Where::eq("data", &Value::Blob(vec![1, 2])).expect_err("blob arg");
        assert!(matches!(err, GpkgError::UnsupportedOperation(_)));
    }

    #[test]
    fn field_values_keep_insertion_order() -> crate::Result<()> {
        let mut fields = FieldValues::new();
        fields.insert("b".to_string(), Value::Integer(2));
        fields.insert("a".to_string(), Value::Null);
        fields.insert("c".to_string(), Value::from("x"));

        let w = Where::field_values(&fields)?;
        assert_eq!(w.clause(), r#""b" = ? AND "a" IS NULL AND "c" = ?"#);
        assert_eq!(w.args(), &["2".to_string(), "x".to_string()]);
        Ok(())
    }

    #[test]
    fn empty_field_values_match_everything() -> crate::Result<()> {
        let w = Where::field_values(FieldValues::new())?;
        assert!(w.is_empty());
        assert_eq!(w.as_clause(), None);
        Ok(())
    }

    #[test]
    fn placeholders_inside_literals_are_not_counted() {
        let w = Where::raw("a = '?' AND b = ?", ["1"]);
        assert_eq!(w.placeholder_count(), 1);
    }

    #[test]
    fn placeholders_inside_quoted_identifiers_are_not_counted() -> crate::Result<()> {
        let w = Where::eq("a?b", &Value::Integer(1))?;
        assert_eq!(w.placeholder_count(), 1);

        let w = Where::eq("it's", &Value::Integer(1))?.and(Where::eq("x", &Value::Integer(2))?);
        assert_eq!(w.placeholder_count(), 2);

        let w = Where::eq(r#"odd"?"name"#, &Value::Integer(1))?;
        assert_eq!(w.placeholder_count(), 1);
        Ok(())
    }

    #[test]
    fn stored_blobs_compare_through_hex() -> crate::Result<()> {
        let blob = Value::Blob(vec![0x0A, 0xFF]);
        let w = Where::stored_values([("name", &Value::from("x")), ("data", &blob)])?;
        assert_eq!(w.clause(), r#""name" = ? AND hex("data") = ?"#);
        assert_eq!(w.args(), &["x".to_string(), "0AFF".to_string()]);
        assert_eq!(w.placeholder_count(), w.args().len());
        Ok(())
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<i64>().prop_map(Value::Integer),
            (-1.0e9f64..1.0e9).prop_map(Value::Real),
            "[a-z?' ]{0,8}".prop_map(Value::Text),
        ]
    }

    proptest! {
        #[test]
        fn placeholders_align_with_arguments(
            fields in prop::collection::vec(("[a-zA-Z0-9_?'\" ]{1,6}", arb_value()), 0..8)
        ) {
            let w = Where::field_values(fields.iter().map(|(k, v)| (k.as_str(), v)))?;
            prop_assert_eq!(w.placeholder_count(), w.args().len());
            let non_null = fields.iter().filter(|(_, v)| !v.is_null()).count();
            prop_assert_eq!(w.args().len(), non_null);
        }

        #[test]
        fn tolerance_arguments_parse_back_exactly(
            v in -1.0e6f64..1.0e6,
            t in 1.0e-6f64..1.0e3,
        ) {
            let w = Where::column_value("f", &ColumnValue::with_tolerance(v, t))?;
            prop_assert_eq!(w.args()[0].parse::<f64>().ok(), Some(v - t));
            prop_assert_eq!(w.args()[1].parse::<f64>().ok(), Some(v + t));
        }
    }
}
