//! SOQL query building
//!
//! Builds `SELECT ... FROM ... WHERE ... ORDER BY ... LIMIT ...` statements
//! from field lists and filter clauses. Filters are joined with `AND`.
//!
//! ```
//! use chrono::NaiveDate;
//! use paged_query::query::SoqlBuilder;
//!
//! let query = SoqlBuilder::new()
//!     .select(["Id", "Name", "pse__Start_Date__c"])
//!     .from("pse__Timecard_Header__c")
//!     .where_eq("pse__Status__c", "Approved")
//!     .where_date_gte("pse__Start_Date__c", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
//!     .order_by("pse__Start_Date__c")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     query.as_str(),
//!     "SELECT Id, Name, pse__Start_Date__c FROM pse__Timecard_Header__c \
//!      WHERE pse__Status__c = 'Approved' AND pse__Start_Date__c >= 2024-01-01 \
//!      ORDER BY pse__Start_Date__c"
//! );
//! ```

use crate::error::{Error, Result};
use crate::types::Query;
use chrono::NaiveDate;

/// Render a date the way SOQL date literals are written (`YYYY-MM-DD`)
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Quote a string as a SOQL literal
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Sort direction for `ORDER BY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Asc,
    Desc,
}

/// Builder for SOQL statements
#[derive(Debug, Clone, Default)]
pub struct SoqlBuilder {
    fields: Vec<String>,
    object: Option<String>,
    conditions: Vec<String>,
    ordering: Vec<(String, Direction)>,
    limit: Option<u32>,
}

impl SoqlBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add fields to the select list. Repeated fields are kept once.
    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
        self
    }

    /// Set the queried object
    #[must_use]
    pub fn from(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Add a raw filter clause
    #[must_use]
    pub fn filter(mut self, clause: impl Into<String>) -> Self {
        let clause = clause.into();
        if !clause.trim().is_empty() {
            self.conditions.push(clause);
        }
        self
    }

    /// Add `field = 'value'`
    #[must_use]
    pub fn where_eq(self, field: &str, value: &str) -> Self {
        let clause = format!("{field} = {}", quote_literal(value));
        self.filter(clause)
    }

    /// Add `field >= date`
    #[must_use]
    pub fn where_date_gte(self, field: &str, date: NaiveDate) -> Self {
        let clause = format!("{field} >= {}", format_date(date));
        self.filter(clause)
    }

    /// Add `field <= date`
    #[must_use]
    pub fn where_date_lte(self, field: &str, date: NaiveDate) -> Self {
        let clause = format!("{field} <= {}", format_date(date));
        self.filter(clause)
    }

    /// Sort ascending by `field`
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.ordering.push((field.into(), Direction::Asc));
        self
    }

    /// Sort descending by `field`
    #[must_use]
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.ordering.push((field.into(), Direction::Desc));
        self
    }

    /// Cap the number of rows
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the statement
    pub fn build(&self) -> Result<Query> {
        if self.fields.is_empty() {
            return Err(Error::config("SOQL query needs at least one field"));
        }

        let object = match self.object.as_deref().map(str::trim) {
            Some(object) if !object.is_empty() => object,
            _ => return Err(Error::config("SOQL query needs an object to select from")),
        };

        let mut soql = format!("SELECT {} FROM {object}", self.fields.join(", "));

        if !self.conditions.is_empty() {
            soql.push_str(" WHERE ");
            soql.push_str(&self.conditions.join(" AND "));
        }

        if !self.ordering.is_empty() {
            let ordering: Vec<String> = self
                .ordering
                .iter()
                .map(|(field, direction)| match direction {
                    Direction::Asc => field.clone(),
                    Direction::Desc => format!("{field} DESC"),
                })
                .collect();
            soql.push_str(" ORDER BY ");
            soql.push_str(&ordering.join(", "));
        }

        if let Some(limit) = self.limit {
            soql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(Query::new(soql))
    }
}
