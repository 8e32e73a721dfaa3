//! SQL type system
//!
//! Column types are compared across the script overlay and the catalog by
//! their normalized name (see [`SqlType::display_name`]), so `INT`,
//! `INTEGER` and `INT4` all resolve to `integer`.

use serde::{Deserialize, Serialize};
use sqlparser::ast::DataType;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Internal representation of SQL types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    // Numeric types
    TinyInt,
    SmallInt,
    MediumInt,
    Integer,
    BigInt,
    Decimal {
        precision: Option<u64>,
        scale: Option<u64>,
    },
    Real,
    DoublePrecision,

    // Character types
    Char {
        length: Option<u64>,
    },
    Varchar {
        length: Option<u64>,
    },
    Text,

    // Binary types
    Bytea,
    Blob,

    // Date/Time types
    Date,
    Time {
        with_timezone: bool,
    },
    Timestamp {
        with_timezone: bool,
    },
    Interval,

    Boolean,
    Uuid,
    Json,
    Jsonb,
    Array(Box<SqlType>),

    // Custom/User-defined type
    Custom(String),

    Unknown,
}

impl SqlType {
    /// Convert from sqlparser's DataType to our internal SqlType
    pub fn from_ast(data_type: &DataType) -> Self {
        match data_type {
            DataType::TinyInt(_) | DataType::UnsignedTinyInt(_) => SqlType::TinyInt,
            DataType::SmallInt(_) | DataType::UnsignedSmallInt(_) | DataType::Int2(_) => {
                SqlType::SmallInt
            }
            DataType::MediumInt(_) | DataType::UnsignedMediumInt(_) => SqlType::MediumInt,
            DataType::Integer(_)
            | DataType::UnsignedInteger(_)
            | DataType::Int(_)
            | DataType::UnsignedInt(_)
            | DataType::Int4(_) => SqlType::Integer,
            DataType::BigInt(_) | DataType::UnsignedBigInt(_) | DataType::Int8(_) => {
                SqlType::BigInt
            }

            DataType::Real | DataType::Float4 | DataType::Float(_) => SqlType::Real,
            DataType::Double | DataType::DoublePrecision | DataType::Float8 => {
                SqlType::DoublePrecision
            }

            DataType::Decimal(info) | DataType::Numeric(info) => {
                let (precision, scale) = match info {
                    sqlparser::ast::ExactNumberInfo::None => (None, None),
                    sqlparser::ast::ExactNumberInfo::Precision(p) => (Some(*p), None),
                    sqlparser::ast::ExactNumberInfo::PrecisionAndScale(p, s) => {
                        (Some(*p), Some(*s))
                    }
                };
                SqlType::Decimal { precision, scale }
            }

            DataType::Char(info) | DataType::Character(info) => SqlType::Char {
                length: char_length(info.as_ref()),
            },
            DataType::Varchar(info) | DataType::CharacterVarying(info) => SqlType::Varchar {
                length: char_length(info.as_ref()),
            },
            DataType::Text | DataType::String(_) => SqlType::Text,

            DataType::Bytea | DataType::Binary(_) | DataType::Varbinary(_) => SqlType::Bytea,
            DataType::Blob(_) => SqlType::Blob,

            DataType::Date => SqlType::Date,
            DataType::Time(_, tz) => SqlType::Time {
                with_timezone: matches!(tz, sqlparser::ast::TimezoneInfo::WithTimeZone),
            },
            DataType::Timestamp(_, tz) => SqlType::Timestamp {
                with_timezone: matches!(tz, sqlparser::ast::TimezoneInfo::WithTimeZone),
            },
            DataType::Datetime(_) => SqlType::Timestamp {
                with_timezone: false,
            },
            DataType::Interval => SqlType::Interval,

            DataType::Boolean | DataType::Bool => SqlType::Boolean,
            DataType::Uuid => SqlType::Uuid,
            DataType::JSON => SqlType::Json,
            DataType::JSONB => SqlType::Jsonb,
            DataType::Enum(..) => SqlType::Custom("enum".to_string()),

            DataType::Array(inner) => match inner {
                sqlparser::ast::ArrayElemTypeDef::AngleBracket(dt)
                | sqlparser::ast::ArrayElemTypeDef::SquareBracket(dt, _)
                | sqlparser::ast::ArrayElemTypeDef::Parenthesis(dt) => {
                    SqlType::Array(Box::new(SqlType::from_ast(dt)))
                }
                sqlparser::ast::ArrayElemTypeDef::None => {
                    SqlType::Array(Box::new(SqlType::Unknown))
                }
            },

            DataType::Custom(name, _) => {
                let type_name = name
                    .0
                    .iter()
                    .map(|i| i.value.clone())
                    .collect::<Vec<_>>()
                    .join(".");
                match type_name.to_lowercase().as_str() {
                    "serial" | "serial4" => SqlType::Integer,
                    "bigserial" | "serial8" => SqlType::BigInt,
                    "smallserial" | "serial2" => SqlType::SmallInt,
                    "tinytext" | "mediumtext" | "longtext" => SqlType::Text,
                    "tinyblob" | "mediumblob" | "longblob" => SqlType::Blob,
                    other => SqlType::Custom(other.to_string()),
                }
            }

            other => match other.to_string().to_lowercase().as_str() {
                "tinytext" | "mediumtext" | "longtext" => SqlType::Text,
                "tinyblob" | "mediumblob" | "longblob" => SqlType::Blob,
                _ => SqlType::Unknown,
            },
        }
    }

    /// Large-object types that make poor index keys
    pub fn is_blob_like(&self) -> bool {
        matches!(
            self,
            SqlType::Text | SqlType::Blob | SqlType::Bytea | SqlType::Json | SqlType::Jsonb
        )
    }

    /// Get a human-readable, normalized name for this type
    pub fn display_name(&self) -> String {
        match self {
            SqlType::TinyInt => "tinyint".to_string(),
            SqlType::SmallInt => "smallint".to_string(),
            SqlType::MediumInt => "mediumint".to_string(),
            SqlType::Integer => "integer".to_string(),
            SqlType::BigInt => "bigint".to_string(),
            SqlType::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("numeric({p},{s})"),
                (Some(p), None) => format!("numeric({p})"),
                _ => "numeric".to_string(),
            },
            SqlType::Real => "real".to_string(),
            SqlType::DoublePrecision => "double precision".to_string(),
            SqlType::Char { length } => match length {
                Some(l) => format!("char({l})"),
                None => "char".to_string(),
            },
            SqlType::Varchar { length } => match length {
                Some(l) => format!("varchar({l})"),
                None => "varchar".to_string(),
            },
            SqlType::Text => "text".to_string(),
            SqlType::Bytea => "bytea".to_string(),
            SqlType::Blob => "blob".to_string(),
            SqlType::Date => "date".to_string(),
            SqlType::Time {
                with_timezone: true,
            } => "time with time zone".to_string(),
            SqlType::Time { .. } => "time".to_string(),
            SqlType::Timestamp {
                with_timezone: true,
            } => "timestamp with time zone".to_string(),
            SqlType::Timestamp { .. } => "timestamp".to_string(),
            SqlType::Interval => "interval".to_string(),
            SqlType::Boolean => "boolean".to_string(),
            SqlType::Uuid => "uuid".to_string(),
            SqlType::Json => "json".to_string(),
            SqlType::Jsonb => "jsonb".to_string(),
            SqlType::Array(inner) => format!("{}[]", inner.display_name()),
            SqlType::Custom(name) => name.clone(),
            SqlType::Unknown => "unknown".to_string(),
        }
    }

    /// Parse a type name as written in configuration (e.g. `"INT"`, `"varchar(20)"`)
    pub fn parse(type_name: &str) -> Self {
        let dialect = GenericDialect {};
        Parser::new(&dialect)
            .try_with_sql(type_name)
            .and_then(|mut parser| parser.parse_data_type())
            .map(|dt| SqlType::from_ast(&dt))
            .unwrap_or_else(|_| SqlType::Custom(type_name.trim().to_lowercase()))
    }
}

/// Normalize a user-supplied type name so it compares equal to resolved column types
pub fn normalize_type_name(type_name: &str) -> String {
    SqlType::parse(type_name).display_name()
}

/// Normalized base name without length/precision, e.g. `varchar(20)` -> `varchar`
pub fn base_type_name(normalized: &str) -> &str {
    normalized
        .split_once('(')
        .map(|(base, _)| base)
        .unwrap_or(normalized)
}

fn char_length(info: Option<&sqlparser::ast::CharacterLength>) -> Option<u64> {
    info.map(|i| match i {
        sqlparser::ast::CharacterLength::IntegerLength { length, .. } => *length,
        sqlparser::ast::CharacterLength::Max => u64::MAX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_synonyms() {
        assert_eq!(normalize_type_name("INT"), "integer");
        assert_eq!(normalize_type_name("int4"), "integer");
        assert_eq!(normalize_type_name("BIGINT"), "bigint");
        assert_eq!(normalize_type_name("serial"), "integer");
    }

    #[test]
    fn test_normalize_keeps_length() {
        assert_eq!(normalize_type_name("VARCHAR(20)"), "varchar(20)");
        assert_eq!(base_type_name("varchar(20)"), "varchar");
        assert_eq!(base_type_name("text"), "text");
    }

    #[test]
    fn test_blob_like() {
        assert!(SqlType::parse("TEXT").is_blob_like());
        assert!(SqlType::parse("BLOB").is_blob_like());
        assert!(SqlType::parse("longtext").is_blob_like());
        assert!(!SqlType::parse("INT").is_blob_like());
    }
}
