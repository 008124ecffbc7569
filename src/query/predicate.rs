//! Typed predicate builder
//!
//! A [`Predicate`] is an ordered list of [`Clause`]s joined with `AND`. It
//! compiles to SQL text with `?` placeholders and the matching parameter
//! list. Column names are `&'static str` taken from dataset schemas; filter
//! values only ever travel as bound parameters.

use crate::database::SqlParam;

/// Predicate text used when no clause applies
pub const ALWAYS_TRUE: &str = "1=1";

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `column >= start` and/or `column < end`. The end is exclusive so that
    /// date columns holding a time of day keep every row of the last day;
    /// callers pass the day after the last day wanted.
    Range {
        column: &'static str,
        start: Option<String>,
        end: Option<String>,
    },
    /// `column IN (?, ?, ...)`; renders nothing for an empty list
    Set {
        column: &'static str,
        values: Vec<String>,
    },
    NotNull {
        column: &'static str,
    },
    Like {
        column: &'static str,
        pattern: &'static str,
    },
    Equals {
        column: &'static str,
        value: &'static str,
    },
}

impl Clause {
    /// Render this clause's comparisons, or nothing if it carries no value.
    fn render_into(&self, parts: &mut Vec<String>, params: &mut Vec<SqlParam>) {
        match self {
            Clause::Range { column, start, end } => {
                if let Some(start) = start {
                    parts.push(format!("{} >= ?", column));
                    params.push(SqlParam::Text(start.clone()));
                }
                if let Some(end) = end {
                    parts.push(format!("{} < ?", column));
                    params.push(SqlParam::Text(end.clone()));
                }
            }
            Clause::Set { column, values } => {
                if values.is_empty() {
                    return;
                }
                let placeholders = vec!["?"; values.len()].join(",");
                parts.push(format!("{} IN ({})", column, placeholders));
                params.extend(values.iter().cloned().map(SqlParam::Text));
            }
            Clause::NotNull { column } => parts.push(format!("{} IS NOT NULL", column)),
            Clause::Like { column, pattern } => {
                parts.push(format!("{} LIKE ?", column));
                params.push(SqlParam::from(*pattern));
            }
            Clause::Equals { column, value } => {
                parts.push(format!("{} = ?", column));
                params.push(SqlParam::from(*value));
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: Clause) -> &mut Self {
        self.clauses.push(clause);
        self
    }

    pub fn with(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Copy of this predicate with extra clauses appended after the existing ones
    pub fn and(&self, extra: impl IntoIterator<Item = Clause>) -> Self {
        let mut combined = self.clone();
        combined.clauses.extend(extra);
        combined
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Compile to `(sql, params)`; `"1=1"` with no params when nothing applies.
    pub fn render(&self) -> (String, Vec<SqlParam>) {
        let mut parts = Vec::new();
        let mut params = Vec::new();
        for clause in &self.clauses {
            clause.render_into(&mut parts, &mut params);
        }

        if parts.is_empty() {
            (ALWAYS_TRUE.to_string(), params)
        } else {
            (parts.join(" AND "), params)
        }
    }
}
