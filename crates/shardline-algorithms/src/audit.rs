//! The `DML_SHARDING_CONDITIONS` auditor.

use shardline_rule::{AuditContext, ColumnRef, ShardingAuditAlgorithm, SqlOperation};

pub const TYPE: &str = "DML_SHARDING_CONDITIONS";

/// Rejects SELECT, UPDATE and DELETE statements on sharding tables whose
/// WHERE clause names no sharding column, since they would hit every shard.
///
/// Statements touching only broadcast tables pass.
#[derive(Debug, Default)]
pub struct DmlShardingConditionsAuditAlgorithm;

impl ShardingAuditAlgorithm for DmlShardingConditionsAuditAlgorithm {
    fn algorithm_type(&self) -> &str {
        TYPE
    }

    fn check(&self, context: &AuditContext<'_>) -> Result<(), String> {
        let statement = context.statement;
        let rule = context.rule;
        if !matches!(
            statement.operation(),
            SqlOperation::Select | SqlOperation::Update | SqlOperation::Delete
        ) {
            return Ok(());
        }
        let tables = statement.table_names();
        if rule.is_all_broadcast_tables(&tables) {
            return Ok(());
        }
        let sharding_tables = rule.get_sharding_logic_table_names(&tables);
        if sharding_tables.is_empty() {
            return Ok(());
        }

        let has_condition = statement.where_columns().iter().any(|column| {
            candidate_tables(column, context, &sharding_tables)
                .into_iter()
                .any(|table| rule.is_sharding_column(&column.name, table))
        });
        if has_condition {
            Ok(())
        } else {
            tracing::debug!(tables = ?sharding_tables, "statement has no sharding condition");
            Err(format!(
                "{:?} statement without sharding conditions on {} is not allowed",
                statement.operation(),
                sharding_tables.join(", ")
            ))
        }
    }
}

/// Tables a column may belong to: its resolved owner, else every sharding
/// table of the statement.
fn candidate_tables<'a>(column: &ColumnRef, context: &AuditContext<'a>, sharding_tables: &'a [String]) -> Vec<&'a str> {
    match column.owner.as_deref() {
        Some(owner) => context.statement.resolve_owner(owner).into_iter().collect(),
        None => sharding_tables.iter().map(String::as_str).collect(),
    }
}
