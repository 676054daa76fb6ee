//! Typed predicates for [`crate::Database::general_query`].
//!
//! Column names come from a closed enum and every value is bound as a
//! parameter, so no caller text ever reaches the SQL string.

use rusqlite::types::Value;

use super::sql;
use crate::domain::ObjectType;

/// A queryable column of the master table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Type,
    Ra,
    Dec,
    Magnitude,
    Name,
    LongName,
    CatalogIdentifier,
    MajorAxis,
    MinorAxis,
    PositionAngle,
    Flux,
    Trixel,
    Catalog,
    Precedence,
}

impl Column {
    pub fn as_sql(self) -> &'static str {
        match self {
            Column::Type => "type",
            Column::Ra => "ra",
            Column::Dec => "dec",
            Column::Magnitude => "magnitude",
            Column::Name => "name",
            Column::LongName => "long_name",
            Column::CatalogIdentifier => "catalog_identifier",
            Column::MajorAxis => "major_axis",
            Column::MinorAxis => "minor_axis",
            Column::PositionAngle => "position_angle",
            Column::Flux => "flux",
            Column::Trixel => "trixel",
            Column::Catalog => "catalog",
            Column::Precedence => "precedence",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every row.
    All,
    Eq(Column, Value),
    Ne(Column, Value),
    Lt(Column, Value),
    Le(Column, Value),
    Gt(Column, Value),
    Ge(Column, Value),
    /// SQL `LIKE`, case-insensitive for ASCII.
    Like(Column, String),
    IsNull(Column),
    NotNull(Column),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn lt(column: Column, value: impl Into<Value>) -> Self {
        Filter::Lt(column, value.into())
    }

    pub fn gt(column: Column, value: impl Into<Value>) -> Self {
        Filter::Gt(column, value.into())
    }

    pub fn of_type(object_type: ObjectType) -> Self {
        Filter::Eq(Column::Type, Value::Integer(object_type.code()))
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut parts) => {
                parts.push(other);
                Filter::Or(parts)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Render as a SQL expression, appending bound values to `params`.
    /// Placeholders are numbered after the values already in `params`.
    pub fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            Filter::All => "1".to_string(),
            Filter::Eq(c, v) => compare(*c, "=", v.clone(), params),
            Filter::Ne(c, v) => compare(*c, "!=", v.clone(), params),
            Filter::Lt(c, v) => compare(*c, "<", v.clone(), params),
            Filter::Le(c, v) => compare(*c, "<=", v.clone(), params),
            Filter::Gt(c, v) => compare(*c, ">", v.clone(), params),
            Filter::Ge(c, v) => compare(*c, ">=", v.clone(), params),
            Filter::Like(c, pattern) => compare(*c, "LIKE", Value::Text(pattern.clone()), params),
            Filter::IsNull(c) => format!("{} IS NULL", c.as_sql()),
            Filter::NotNull(c) => format!("{} IS NOT NULL", c.as_sql()),
            Filter::And(parts) => join(parts, " AND ", "1", params),
            Filter::Or(parts) => join(parts, " OR ", "0", params),
            Filter::Not(inner) => format!("NOT ({})", inner.render(params)),
        }
    }
}

fn compare(column: Column, op: &str, value: Value, params: &mut Vec<Value>) -> String {
    params.push(value);
    format!("{} {op} ?{}", column.as_sql(), params.len())
}

fn join(parts: &[Filter], separator: &str, empty: &str, params: &mut Vec<Value>) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts
        .iter()
        .map(|p| format!("({})", p.render(params)))
        .collect();
    rendered.join(separator)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: Column,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: Column) -> Self {
        Self {
            column,
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: Column) -> Self {
        Self {
            column,
            direction: Direction::Descending,
        }
    }

    fn render(&self) -> String {
        match self.direction {
            Direction::Ascending => format!("{} ASC NULLS LAST", self.column.as_sql()),
            Direction::Descending => format!("{} DESC NULLS LAST", self.column.as_sql()),
        }
    }
}

/// A complete master-table query. `oid` is always the final sort key so
/// results are stable. The limit binds after the filter values.
pub fn general_query(filter: &Filter, order: &[OrderBy]) -> (String, Vec<Value>) {
    let mut params = Vec::new();
    let condition = filter.render(&mut params);

    let mut keys: Vec<String> = order.iter().map(OrderBy::render).collect();
    keys.push("oid".to_string());

    let sql = format!(
        "SELECT {} FROM {} WHERE {condition} ORDER BY {} LIMIT ?{}",
        sql::object_fields(),
        sql::MASTER,
        keys.join(", "),
        params.len() + 1
    );
    (sql, params)
}
