//! Composable row predicates
//!
//! A [`Condition`] renders to a parameterised SQL fragment. Column names are
//! always `&'static str` taken from record definitions, values are always
//! bound as parameters.

use rusqlite::types::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every row
    True,
    Eq(&'static str, Value),
    Ne(&'static str, Value),
    Lt(&'static str, Value),
    Le(&'static str, Value),
    Gt(&'static str, Value),
    Ge(&'static str, Value),
    IsNull(&'static str),
    IsNotNull(&'static str),
    /// Case-insensitive SQL `LIKE`
    Like(&'static str, String),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Eq(column, value.into())
    }

    pub fn ne(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Ne(column, value.into())
    }

    pub fn lt(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Lt(column, value.into())
    }

    pub fn le(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Le(column, value.into())
    }

    pub fn gt(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Gt(column, value.into())
    }

    pub fn ge(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Ge(column, value.into())
    }

    pub fn is_null(column: &'static str) -> Self {
        Condition::IsNull(column)
    }

    pub fn is_not_null(column: &'static str) -> Self {
        Condition::IsNotNull(column)
    }

    pub fn like(column: &'static str, pattern: impl Into<String>) -> Self {
        Condition::Like(column, pattern.into())
    }

    /// Text equality, for the many string keys
    pub fn eq_text(column: &'static str, value: &str) -> Self {
        Condition::Eq(column, Value::Text(value.to_string()))
    }

    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut parts) => {
                parts.push(other);
                Condition::And(parts)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut parts) => {
                parts.push(other);
                Condition::Or(parts)
            }
            first => Condition::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// Render as SQL, appending bound values to `params` in placeholder order
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Condition::True => "1 = 1".to_string(),
            Condition::Eq(column, value) => binary(column, "=", value, params),
            Condition::Ne(column, value) => binary(column, "<>", value, params),
            Condition::Lt(column, value) => binary(column, "<", value, params),
            Condition::Le(column, value) => binary(column, "<=", value, params),
            Condition::Gt(column, value) => binary(column, ">", value, params),
            Condition::Ge(column, value) => binary(column, ">=", value, params),
            Condition::IsNull(column) => format!("{} IS NULL", column),
            Condition::IsNotNull(column) => format!("{} IS NOT NULL", column),
            Condition::Like(column, pattern) => {
                params.push(Value::Text(pattern.clone()));
                format!("{} LIKE ?{} COLLATE NOCASE", column, params.len())
            }
            Condition::And(parts) => join(parts, "AND", "1 = 1", params),
            Condition::Or(parts) => join(parts, "OR", "1 = 0", params),
            Condition::Not(inner) => format!("NOT ({})", inner.to_sql(params)),
        }
    }
}

fn binary(column: &str, op: &str, value: &Value, params: &mut Vec<Value>) -> String {
    // `= NULL` never matches in SQL; compare with IS semantics instead.
    // Ordering against NULL stays unknown, so it matches nothing even negated.
    if matches!(value, Value::Null) {
        return match op {
            "=" => format!("{} IS NULL", column),
            "<>" => format!("{} IS NOT NULL", column),
            _ => "NULL".to_string(),
        };
    }
    params.push(value.clone());
    format!("{} {} ?{}", column, op, params.len())
}

fn join(parts: &[Condition], op: &str, empty: &str, params: &mut Vec<Value>) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts
        .iter()
        .map(|part| format!("({})", part.to_sql(params)))
        .collect();
    rendered.join(&format!(" {} ", op))
}

/// Render a conjunction of conditions as a `WHERE` body
pub fn where_clause(conditions: &[Condition], params: &mut Vec<Value>) -> String {
    match conditions {
        [] => Condition::True.to_sql(params),
        [single] => single.to_sql(params),
        many => join(many, "AND", "1 = 1", params),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params = Vec::new();
        let sql = self.to_sql(&mut params);
        write!(f, "{}", sql)?;
        if !params.is_empty() {
            write!(f, " {:?}", params)?;
        }
        Ok(())
    }
}

/// Human-readable form of a condition list, for logs and errors
pub fn describe(conditions: &[Condition]) -> String {
    let mut params = Vec::new();
    let sql = where_clause(conditions, &mut params);
    if params.is_empty() {
        sql
    } else {
        format!("{} {:?}", sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_binds_parameter() {
        let mut params = Vec::new();
        let sql = Condition::eq("uses", 5_i64).to_sql(&mut params);
        assert_eq!(sql, "uses = ?1");
        assert_eq!(params, vec![Value::Integer(5)]);
    }

    #[test]
    fn and_numbers_placeholders_in_order() {
        let mut params = Vec::new();
        let sql = Condition::eq("item_id", 1_i64)
            .and(Condition::eq_text("mode", "PVP"))
            .and(Condition::gt("flea_price", 100_i64))
            .to_sql(&mut params);
        assert_eq!(sql, "(item_id = ?1) AND (mode = ?2) AND (flea_price > ?3)");
        assert_eq!(params.len(), 3);
        assert_eq!(params[1], Value::Text("PVP".to_string()));
    }

    #[test]
    fn or_and_not_nest() {
        let mut params = Vec::new();
        let sql = Condition::is_null("pvp_flea_price")
            .or(Condition::lt("pvp_flea_price", 10_i64))
            .not()
            .to_sql(&mut params);
        assert_eq!(sql, "NOT ((pvp_flea_price IS NULL) OR (pvp_flea_price < ?1))");
    }

    #[test]
    fn null_equality_uses_is() {
        let mut params = Vec::new();
        assert_eq!(
            Condition::eq("flea_price", Value::Null).to_sql(&mut params),
            "flea_price IS NULL"
        );
        assert_eq!(
            Condition::ne("flea_price", Value::Null).to_sql(&mut params),
            "flea_price IS NOT NULL"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn null_ordering_matches_nothing_even_negated() {
        let mut params = Vec::new();
        let lt = Condition::lt("flea_price", Value::Null);
        assert_eq!(lt.to_sql(&mut params), "NULL");
        assert_eq!(lt.not().to_sql(&mut params), "NOT (NULL)");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_conjunction_matches_everything() {
        let mut params = Vec::new();
        assert_eq!(where_clause(&[], &mut params), "1 = 1");
        assert_eq!(Condition::Or(vec![]).to_sql(&mut params), "1 = 0");
    }

    #[test]
    fn where_clause_joins_slice() {
        let mut params = Vec::new();
        let sql = where_clause(
            &[Condition::eq_text("tarkov_id", "abc"), Condition::eq("id", 7_i64)],
            &mut params,
        );
        assert_eq!(sql, "(tarkov_id = ?1) AND (id = ?2)");
    }

    #[test]
    fn describe_includes_values() {
        let text = describe(&[Condition::eq_text("tarkov_id", "abc")]);
        assert!(text.contains("tarkov_id = ?1"));
        assert!(text.contains("abc"));
    }
}
