//! Parameterized SQL statements for row-store mutations.
//!
//! Values are always bound as parameters, never spliced into SQL text.
//! Identifiers are bracket-quoted (T-SQL), with `]` escaped as `]]`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::{Mutation, MutationBatch};
use crate::table::{Record, Value};

/// Parameter placeholder style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    /// `?` (ODBC)
    #[default]
    Question,
    /// `@P1`, `@P2`, ... (TDS)
    Numbered,
}

/// A SQL statement with its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// SQL text with placeholders
    pub sql: String,
    /// Parameters in placeholder order
    pub params: Vec<Value>,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|p| match p {
                    Value::Text(s) => format!("{:?}", s),
                    other => other.to_string(),
                })
                .collect();
            write!(f, " -- params: [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// Bracket-quotes an identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableName {
    /// Schema, e.g. `dbo`
    pub schema: Option<String>,
    /// Table name
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Parses `schema.table` or `table`.
    pub fn parse(s: &str) -> Self {
        match s.split_once('.') {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::unqualified(s),
        }
    }

    /// Quoted form, e.g. `[dbo].[product]`.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Accumulates SQL text and parameters.
struct Binder {
    sql: String,
    params: Vec<Value>,
    placeholder: Placeholder,
}

impl Binder {
    fn new(placeholder: Placeholder) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            placeholder,
        }
    }

    fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    fn bind(&mut self, value: &Value) -> &mut Self {
        self.params.push(value.clone());
        match self.placeholder {
            Placeholder::Question => self.sql.push('?'),
            Placeholder::Numbered => {
                let n = self.params.len();
                self.sql.push_str(&format!("@P{}", n));
            }
        }
        self
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Builds statements against one table.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: TableName,
    id_column: String,
    placeholder: Placeholder,
}

impl StatementBuilder {
    pub fn new(table: TableName, id_column: impl Into<String>) -> Self {
        Self {
            table,
            id_column: id_column.into(),
            placeholder: Placeholder::default(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// `SELECT` of the given columns, or all columns when empty.
    pub fn select_all(&self, columns: &[String]) -> Statement {
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut b = Binder::new(self.placeholder);
        b.push(&format!("SELECT {} FROM {}", projection, self.table.quoted()));
        b.finish()
    }

    /// `INSERT` of the given fields; `DEFAULT VALUES` when there are none.
    pub fn insert(&self, fields: &Record) -> Statement {
        let mut b = Binder::new(self.placeholder);
        b.push(&format!("INSERT INTO {}", self.table.quoted()));
        if fields.is_empty() {
            b.push(" DEFAULT VALUES");
            return b.finish();
        }

        let columns: Vec<String> = fields.columns().map(quote_ident).collect();
        b.push(&format!(" ({}) VALUES (", columns.join(", ")));
        for (i, (_, value)) in fields.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.bind(value);
        }
        b.push(")");
        b.finish()
    }

    /// `UPDATE` setting `fields` on the row with identifier `id`.
    ///
    /// `fields` must not be empty.
    pub fn update(&self, id: &Value, fields: &Record) -> Statement {
        debug_assert!(!fields.is_empty(), "UPDATE needs at least one column");
        let mut b = Binder::new(self.placeholder);
        b.push(&format!("UPDATE {} SET ", self.table.quoted()));
        for (i, (column, value)) in fields.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push(&format!("{} = ", quote_ident(column))).bind(value);
        }
        b.push(&format!(" WHERE {} = ", quote_ident(&self.id_column)))
            .bind(id);
        b.finish()
    }

    /// `DELETE` of the row with identifier `id`.
    pub fn delete(&self, id: &Value) -> Statement {
        let mut b = Binder::new(self.placeholder);
        b.push(&format!(
            "DELETE FROM {} WHERE {} = ",
            self.table.quoted(),
            quote_ident(&self.id_column)
        ))
        .bind(id);
        b.finish()
    }

    pub fn for_mutation(&self, mutation: &Mutation) -> Statement {
        match mutation {
            Mutation::Update { id, fields } => self.update(id, fields),
            Mutation::Delete { id } => self.delete(id),
            Mutation::Insert { fields } => self.insert(fields),
        }
    }

    /// One statement per mutation, in batch order.
    pub fn for_batch(&self, batch: &MutationBatch) -> Vec<Statement> {
        batch.iter().map(|m| self.for_mutation(m)).collect()
    }

    /// Returns one row when the table exists.
    pub fn table_exists(&self) -> Statement {
        let mut b = Binder::new(self.placeholder);
        b.push("SELECT 1 AS present FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = ")
            .bind(&Value::from(self.table.name.as_str()));
        if let Some(schema) = &self.table.schema {
            b.push(" AND TABLE_SCHEMA = ").bind(&Value::from(schema.as_str()));
        }
        b.finish()
    }

    /// Returns the table's `modify_date`, the freshness signal of a SQL
    /// analytics endpoint.
    pub fn last_modified(&self) -> Statement {
        let mut b = Binder::new(self.placeholder);
        b.push("SELECT modify_date FROM sys.tables WHERE name = ")
            .bind(&Value::from(self.table.name.as_str()));
        if let Some(schema) = &self.table.schema {
            b.push(" AND schema_id = SCHEMA_ID(")
                .bind(&Value::from(schema.as_str()))
                .push(")");
        }
        b.finish()
    }
}
