//! Known table columns, used to resolve unqualified column references.

use std::collections::{HashMap, HashSet};

use shardline_core::canonical_name;

/// Columns per table, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    tables: HashMap<String, HashSet<String>>,
}

impl SchemaContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table<I, S>(mut self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_table(table, columns);
        self
    }

    pub fn add_table<I, S>(&mut self, table: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tables
            .entry(canonical_name(table))
            .or_default()
            .extend(columns.into_iter().map(|column| canonical_name(column.as_ref())));
    }

    pub fn contains_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(&canonical_name(table))
            .is_some_and(|columns| columns.contains(&canonical_name(column)))
    }

    /// The only candidate table that has `column`, if exactly one does.
    pub fn find_owner<'a>(&self, candidates: &[&'a str], column: &str) -> Option<&'a str> {
        let mut owners = candidates
            .iter()
            .copied()
            .filter(|table| self.contains_column(table, column));
        match (owners.next(), owners.next()) {
            (Some(owner), None) => Some(owner),
            _ => None,
        }
    }
}
