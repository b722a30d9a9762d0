//! Column types and value casting.

use serde::{Deserialize, Serialize};

use crate::error::ApplyError;

use super::record::Record;
use super::value::Value;

/// Column type used for casting editor values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    Text,
}

impl ColumnType {
    /// Casts `value` to this type. Null passes through.
    ///
    /// # Arguments
    /// * `column` - Column name, for error reporting
    /// * `value` - Value to cast
    ///
    /// # Returns
    /// `Result<Value, ApplyError>` with the cast value or `TypeMismatch`.
    pub fn cast(self, column: &str, value: Value) -> Result<Value, ApplyError> {
        let mismatch = |got: &Value| ApplyError::TypeMismatch {
            column: column.to_string(),
            expected: self.name().to_string(),
            got: format!("{} {:?}", got.type_name(), got.to_string()),
        };

        let cast = match (self, value) {
            (_, Value::Null) => Value::Null,

            (ColumnType::Bool, Value::Bool(v)) => Value::Bool(v),
            (ColumnType::Bool, Value::Int(0)) => Value::Bool(false),
            (ColumnType::Bool, Value::Int(1)) => Value::Bool(true),
            (ColumnType::Bool, Value::Text(s)) => match parse_bool(&s) {
                Some(b) => Value::Bool(b),
                None => return Err(mismatch(&Value::Text(s))),
            },

            (ColumnType::Int, Value::Int(v)) => Value::Int(v),
            (ColumnType::Int, Value::Bool(v)) => Value::Int(v as i64),
            (ColumnType::Int, v @ Value::Float(_)) => match v.as_i64() {
                Some(i) => Value::Int(i),
                None => return Err(mismatch(&v)),
            },
            (ColumnType::Int, Value::Text(s)) => {
                let parsed = s.trim().parse::<i64>();
                match parsed {
                    Ok(i) => Value::Int(i),
                    Err(_) => return Err(mismatch(&Value::Text(s))),
                }
            }

            (ColumnType::Float, Value::Float(v)) => Value::Float(v),
            (ColumnType::Float, Value::Int(v)) => Value::Float(v as f64),
            (ColumnType::Float, Value::Text(s)) => {
                let parsed = s.trim().parse::<f64>();
                match parsed {
                    Ok(f) => Value::Float(f),
                    Err(_) => return Err(mismatch(&Value::Text(s))),
                }
            }

            (ColumnType::Text, Value::Text(s)) => Value::Text(s),
            (ColumnType::Text, v) => Value::Text(v.to_string()),

            (_, v) => return Err(mismatch(&v)),
        };
        Ok(cast)
    }

    /// Type name as written in config files.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column type
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

/// Table column types.
///
/// Only used to cast values coming from the editor; columns not listed are
/// passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column definition.
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            ty,
        });
        self
    }

    /// Returns the column definitions in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the type of a column.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.ty)
    }

    /// Casts every known column of `record`.
    pub fn cast_record(&self, record: Record) -> Result<Record, ApplyError> {
        record
            .into_iter()
            .map(|(column, value)| match self.column_type(&column) {
                Some(ty) => ty.cast(&column, value).map(|v| (column, v)),
                None => Ok((column, value)),
            })
            .collect()
    }
}
