//! Physical data nodes and their expansion from inline expressions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::inline;

const DELIMITER: char = '.';

/// A physical location: one table on one data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataNode {
    pub data_source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_name: Option<String>,
    pub table_name: String,
}

impl DataNode {
    pub fn new(data_source_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            catalog_name: None,
            table_name: table_name.into(),
        }
    }

    pub fn with_catalog(
        data_source_name: impl Into<String>,
        catalog_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            catalog_name: Some(catalog_name.into()),
            table_name: table_name.into(),
        }
    }

    /// Parses `ds.table` or `ds.catalog.table`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = text.trim().split(DELIMITER).map(str::trim).collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(ConfigError::InvalidDataNode(text.to_string()));
        }
        match parts.as_slice() {
            [data_source, table] => Ok(Self::new(*data_source, *table)),
            [data_source, catalog, table] => Ok(Self::with_catalog(*data_source, *catalog, *table)),
            _ => Err(ConfigError::InvalidDataNode(text.to_string())),
        }
    }

    /// Case-insensitive match on data source and table name.
    pub fn matches(&self, data_source_name: &str, table_name: &str) -> bool {
        self.data_source_name.eq_ignore_ascii_case(data_source_name)
            && self.table_name.eq_ignore_ascii_case(table_name)
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.catalog_name {
            Some(catalog) => write!(f, "{}.{}.{}", self.data_source_name, catalog, self.table_name),
            None => write!(f, "{}.{}", self.data_source_name, self.table_name),
        }
    }
}

impl FromStr for DataNode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Expands actual-data-node expressions such as `ds_${0..1}.t_${0..2}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataNodeExpander;

impl DataNodeExpander {
    /// Expands the expression into an ordered node list.
    ///
    /// Data-source placeholders are the outer loop and table placeholders the
    /// inner one, so the order is `ds_0.t_0, ds_0.t_1, ..., ds_1.t_0, ...`.
    pub fn expand(expression: &str) -> Result<Vec<DataNode>, ConfigError> {
        inline::split_and_evaluate(expression)?
            .iter()
            .map(|node| DataNode::parse(node))
            .collect()
    }
}
