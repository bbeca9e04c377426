use std::fmt;

/// Name of the hidden row identity column
pub const ID_COLUMN: &str = "_id";

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Null,
    Integer,
    Float,
    Text,
    Blob,
}

impl ColumnType {
    /// SQL type name used in column definitions
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Null => "NULL",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// Column default, rendered verbatim after `DEFAULT`
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Text(String),
    Integer(i64),
    Real(f64),
    CurrentTime,
    CurrentDate,
    CurrentTimestamp,
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            DefaultValue::Integer(i) => write!(f, "{}", i),
            // Debug keeps the fractional part, e.g. `1.0`
            DefaultValue::Real(r) => write!(f, "{:?}", r),
            DefaultValue::CurrentTime => f.write_str("CURRENT_TIME"),
            DefaultValue::CurrentDate => f.write_str("CURRENT_DATE"),
            DefaultValue::CurrentTimestamp => f.write_str("CURRENT_TIMESTAMP"),
        }
    }
}

impl From<&str> for DefaultValue {
    fn from(v: &str) -> Self {
        DefaultValue::Text(v.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(v: String) -> Self {
        DefaultValue::Text(v)
    }
}

impl From<i64> for DefaultValue {
    fn from(v: i64) -> Self {
        DefaultValue::Integer(v)
    }
}

impl From<i32> for DefaultValue {
    fn from(v: i32) -> Self {
        DefaultValue::Integer(i64::from(v))
    }
}

impl From<bool> for DefaultValue {
    fn from(v: bool) -> Self {
        DefaultValue::Integer(i64::from(v))
    }
}

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        DefaultValue::Real(v)
    }
}

/// One declared column
///
/// Equality is by name only: a table never holds two columns with the same
/// name.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub not_null: bool,
    pub unique: bool,
    pub default_value: Option<DefaultValue>,
}

impl ColumnSpec {
    pub(crate) fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            primary_key: false,
            autoincrement: false,
            not_null: false,
            unique: false,
            default_value: None,
        }
    }

    /// `<name> <TYPE>` without constraints
    pub fn base_definition(&self) -> String {
        format!("{} {}", self.name, self.column_type.sql_name())
    }

    /// Full create-mode definition
    pub fn create_definition(&self) -> String {
        let mut def = self.base_definition();
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
            if self.autoincrement {
                def.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        if self.unique && !self.primary_key {
            def.push_str(" UNIQUE");
        }
        self.push_default(&mut def);
        def
    }

    /// Definition usable in `ALTER TABLE ... ADD COLUMN`
    ///
    /// Key and uniqueness constraints cannot be added by ALTER and are left out.
    pub fn alter_definition(&self) -> String {
        let mut def = self.base_definition();
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        self.push_default(&mut def);
        def
    }

    fn push_default(&self, def: &mut String) {
        if let Some(default) = &self.default_value {
            def.push_str(&format!(" DEFAULT {}", default));
        }
    }
}

impl PartialEq for ColumnSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ColumnSpec {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_name() {
        let a = ColumnSpec::new("title", ColumnType::Text);
        let mut b = ColumnSpec::new("title", ColumnType::Integer);
        b.unique = true;
        assert_eq!(a, b);
        assert_ne!(a, ColumnSpec::new("body", ColumnType::Text));
    }

    #[test]
    fn test_default_rendering() {
        assert_eq!(DefaultValue::from("x").to_string(), "'x'");
        assert_eq!(DefaultValue::from("it's").to_string(), "'it''s'");
        assert_eq!(DefaultValue::from(7i64).to_string(), "7");
        assert_eq!(DefaultValue::from(1.0).to_string(), "1.0");
        assert_eq!(DefaultValue::CurrentTimestamp.to_string(), "CURRENT_TIMESTAMP");
    }

    #[test]
    fn test_primary_key_column_omits_unique() {
        let mut col = ColumnSpec::new("code", ColumnType::Text);
        col.primary_key = true;
        col.unique = true;
        assert_eq!(col.create_definition(), "code TEXT PRIMARY KEY");
        assert_eq!(col.alter_definition(), "code TEXT");
    }
}
