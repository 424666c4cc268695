//! SQL statement analysis for join binding checks and auditing.

use sqlparser::ast::{
    BinaryOperator, Expr, FromTable, Ident, JoinConstraint, JoinOperator, ObjectName, Statement,
    TableFactor, TableWithJoins,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::ShardingError;

/// Parses SQL and extracts what the rule needs to know about a statement.
pub struct SqlAnalyzer {
    dialect: GenericDialect,
}

impl Clone for SqlAnalyzer {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl Default for SqlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlAnalyzer {
    pub fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, ShardingError> {
        Parser::parse_sql(&self.dialect, sql).map_err(|e| ShardingError::SqlParse(e.to_string()))
    }

    /// Parse exactly one statement and analyze it.
    pub fn analyze_sql(&self, sql: &str) -> Result<SqlStatementContext, ShardingError> {
        let statements = self.parse(sql)?;
        match statements.as_slice() {
            [statement] => Ok(self.analyze(statement)),
            [] => Err(ShardingError::SqlParse("empty statement".to_string())),
            _ => Err(ShardingError::SqlParse(format!(
                "expected one statement, found {}",
                statements.len()
            ))),
        }
    }

    pub fn analyze(&self, statement: &Statement) -> SqlStatementContext {
        let mut context = SqlStatementContext::new(SqlOperation::Other);
        match statement {
            Statement::Query(query) => {
                context.operation = SqlOperation::Select;
                if let Some(select) = query.body.as_select() {
                    context.contains_join = select.from.len() > 1
                        || select.from.iter().any(|table| !table.joins.is_empty());
                    for table_with_joins in &select.from {
                        self.visit_table_with_joins(table_with_joins, &mut context);
                    }
                    context.where_clause = select.selection.clone();
                }
            }
            Statement::Insert(insert) => {
                context.operation = SqlOperation::Insert;
                context.tables.push(TableReference {
                    name: unqualified(&insert.table.to_string()),
                    alias: None,
                });
            }
            Statement::Update(update) => {
                context.operation = SqlOperation::Update;
                self.visit_table_with_joins(&update.table, &mut context);
                context.where_clause = update.selection.clone();
            }
            Statement::Delete(delete) => {
                context.operation = SqlOperation::Delete;
                let tables = match &delete.from {
                    FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
                };
                for table_with_joins in tables {
                    self.visit_table_with_joins(table_with_joins, &mut context);
                }
                context.where_clause = delete.selection.clone();
            }
            _ => {}
        }
        context
    }

    fn visit_table_with_joins(&self, table_with_joins: &TableWithJoins, context: &mut SqlStatementContext) {
        self.visit_table_factor(&table_with_joins.relation, context);
        for join in &table_with_joins.joins {
            self.visit_table_factor(&join.relation, context);
            if let Some(JoinConstraint::On(condition)) = join_constraint(&join.join_operator) {
                context.join_conditions.push(condition.clone());
            }
        }
    }

    fn visit_table_factor(&self, table_factor: &TableFactor, context: &mut SqlStatementContext) {
        if let TableFactor::Table { name, alias, .. } = table_factor {
            context.tables.push(TableReference {
                name: table_name(name),
                alias: alias.as_ref().map(|a| a.name.value.clone()),
            });
        }
    }
}

fn join_constraint(operator: &JoinOperator) -> Option<&JoinConstraint> {
    match operator {
        JoinOperator::Join(constraint)
        | JoinOperator::Inner(constraint)
        | JoinOperator::Left(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::Right(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint) => Some(constraint),
        _ => None,
    }
}

fn table_name(name: &ObjectName) -> String {
    unqualified(&name.to_string())
}

/// Last dot-separated part of a possibly qualified name, unquoted.
fn unqualified(name: &str) -> String {
    name.rsplit('.')
        .next()
        .unwrap_or(name)
        .trim_matches(|ch| ch == '"' || ch == '`' || ch == '[' || ch == ']')
        .to_string()
}

/// A table referenced by a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub name: String,
    pub alias: Option<String>,
}

/// Types of SQL operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperation {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

/// A column as written in SQL, with its optional owner qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub owner: Option<String>,
    pub name: String,
}

impl ColumnRef {
    fn from_expr(expr: &Expr) -> Option<Self> {
        match expr {
            Expr::Identifier(ident) => Some(Self {
                owner: None,
                name: ident.value.clone(),
            }),
            Expr::CompoundIdentifier(idents) => {
                let (name, qualifiers) = idents.split_last()?;
                Some(Self {
                    owner: qualifiers.last().map(|owner: &Ident| owner.value.clone()),
                    name: name.value.clone(),
                })
            }
            Expr::Nested(inner) => Self::from_expr(inner),
            _ => None,
        }
    }
}

/// `left = right` between two columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEquality {
    pub left: ColumnRef,
    pub right: ColumnRef,
}

/// What the rule inspects in a parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatementContext {
    operation: SqlOperation,
    tables: Vec<TableReference>,
    contains_join: bool,
    join_conditions: Vec<Expr>,
    where_clause: Option<Expr>,
}

impl SqlStatementContext {
    fn new(operation: SqlOperation) -> Self {
        Self {
            operation,
            tables: Vec::new(),
            contains_join: false,
            join_conditions: Vec::new(),
            where_clause: None,
        }
    }

    pub fn operation(&self) -> SqlOperation {
        self.operation
    }

    pub fn tables(&self) -> &[TableReference] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }

    pub fn contains_join(&self) -> bool {
        self.contains_join
    }

    pub fn where_clause(&self) -> Option<&Expr> {
        self.where_clause.as_ref()
    }

    /// Join `ON` conditions followed by the `WHERE` clause.
    pub fn where_segments(&self) -> impl Iterator<Item = &Expr> {
        self.join_conditions.iter().chain(self.where_clause.iter())
    }

    /// Resolves an owner qualifier (alias or table name) to a table name.
    pub fn resolve_owner(&self, owner: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|table| {
                table
                    .alias
                    .as_deref()
                    .is_some_and(|alias| alias.eq_ignore_ascii_case(owner))
            })
            .or_else(|| {
                self.tables
                    .iter()
                    .find(|table| table.name.eq_ignore_ascii_case(owner))
            })
            .map(|table| table.name.as_str())
    }

    /// Column-to-column equalities of all AND-connected predicates.
    ///
    /// Returns `None` when any segment contains an OR, since such predicates
    /// do not guarantee the equality holds for every row.
    pub fn column_equalities(&self) -> Option<Vec<ColumnEquality>> {
        let mut conjuncts = Vec::new();
        for segment in self.where_segments() {
            if !collect_conjuncts(segment, &mut conjuncts) {
                return None;
            }
        }
        Some(
            conjuncts
                .into_iter()
                .filter_map(|conjunct| match conjunct {
                    Expr::BinaryOp {
                        left,
                        op: BinaryOperator::Eq,
                        right,
                    } => Some(ColumnEquality {
                        left: ColumnRef::from_expr(left)?,
                        right: ColumnRef::from_expr(right)?,
                    }),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Every column referenced by the `WHERE` clause.
    pub fn where_columns(&self) -> Vec<ColumnRef> {
        let mut columns = Vec::new();
        if let Some(expr) = &self.where_clause {
            collect_columns(expr, &mut columns);
        }
        columns
    }
}

fn collect_conjuncts<'a>(expr: &'a Expr, conjuncts: &mut Vec<&'a Expr>) -> bool {
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => collect_conjuncts(left, conjuncts) && collect_conjuncts(right, conjuncts),
        Expr::BinaryOp {
            op: BinaryOperator::Or,
            ..
        } => false,
        Expr::Nested(inner) => collect_conjuncts(inner, conjuncts),
        other => {
            conjuncts.push(other);
            true
        }
    }
}

fn collect_columns(expr: &Expr, columns: &mut Vec<ColumnRef>) {
    if let Some(column) = ColumnRef::from_expr(expr) {
        columns.push(column);
        return;
    }
    match expr {
        Expr::BinaryOp { left, right, .. } => {
            collect_columns(left, columns);
            collect_columns(right, columns);
        }
        Expr::Nested(expr)
        | Expr::UnaryOp { expr, .. }
        | Expr::InList { expr, .. }
        | Expr::Between { expr, .. }
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr) => collect_columns(expr, columns),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analyze(sql: &str) -> SqlStatementContext {
        SqlAnalyzer::new().analyze_sql(sql).unwrap()
    }

    fn column(owner: Option<&str>, name: &str) -> ColumnRef {
        ColumnRef {
            owner: owner.map(str::to_string),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_simple_select() {
        let context = analyze("SELECT * FROM t_order WHERE order_id = 1");
        assert_eq!(context.operation(), SqlOperation::Select);
        assert_eq!(context.table_names(), vec!["t_order"]);
        assert!(!context.contains_join());
        assert_eq!(context.where_columns(), vec![column(None, "order_id")]);
    }

    #[test]
    fn test_join_with_aliases() {
        let context = analyze(
            "SELECT * FROM t_order o JOIN t_order_item i ON o.order_id = i.order_id WHERE o.user_id = 10",
        );
        assert!(context.contains_join());
        assert_eq!(context.table_names(), vec!["t_order", "t_order_item"]);
        assert_eq!(context.resolve_owner("I"), Some("t_order_item"));
        assert_eq!(context.resolve_owner("t_order"), Some("t_order"));
        assert_eq!(context.resolve_owner("x"), None);
        assert_eq!(
            context.column_equalities().unwrap(),
            vec![ColumnEquality {
                left: column(Some("o"), "order_id"),
                right: column(Some("i"), "order_id"),
            }]
        );
    }

    #[test]
    fn test_comma_join_counts_as_join() {
        let context = analyze("SELECT * FROM a, b WHERE a.id = b.id AND (a.x = 1)");
        assert!(context.contains_join());
        assert_eq!(context.column_equalities().unwrap().len(), 1);
    }

    #[test]
    fn test_or_is_not_decomposed() {
        let context = analyze("SELECT * FROM a JOIN b ON a.id = b.id WHERE a.x = 1 OR b.y = 2");
        assert_eq!(context.column_equalities(), None);
    }

    #[test]
    fn test_nested_or_is_not_decomposed() {
        let context = analyze("SELECT * FROM a JOIN b ON a.id = b.id AND (a.x = b.x OR a.y = b.y)");
        assert_eq!(context.column_equalities(), None);
    }

    #[test]
    fn test_qualified_table_name() {
        let context = analyze("SELECT * FROM db.t_order");
        assert_eq!(context.table_names(), vec!["t_order"]);
    }

    #[test]
    fn test_update_and_delete() {
        let update = analyze("UPDATE t_order SET status = 'x' WHERE order_id = 1 AND user_id IN (1, 2)");
        assert_eq!(update.operation(), SqlOperation::Update);
        assert_eq!(update.table_names(), vec!["t_order"]);
        assert_eq!(
            update.where_columns(),
            vec![column(None, "order_id"), column(None, "user_id")]
        );

        let delete = analyze("DELETE FROM t_order");
        assert_eq!(delete.operation(), SqlOperation::Delete);
        assert_eq!(delete.table_names(), vec!["t_order"]);
        assert!(delete.where_clause().is_none());
    }

    #[test]
    fn test_insert() {
        let context = analyze("INSERT INTO t_order (order_id) VALUES (1)");
        assert_eq!(context.operation(), SqlOperation::Insert);
        assert_eq!(context.table_names(), vec!["t_order"]);
    }

    #[test]
    fn test_parse_errors() {
        let analyzer = SqlAnalyzer::new();
        assert!(matches!(analyzer.analyze_sql("SELEC"), Err(ShardingError::SqlParse(_))));
        assert!(matches!(
            analyzer.analyze_sql("SELECT 1; SELECT 2"),
            Err(ShardingError::SqlParse(_))
        ));
    }
}
