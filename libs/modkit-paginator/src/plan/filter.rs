//! Filter compilation: field path + value → ANDed predicates.

use indexmap::IndexMap;
use sea_orm::Value;
use sea_orm::sea_query::{Condition, Expr, SelectStatement, SimpleExpr};

use crate::config::CompareOp;
use crate::plan::relation::ColumnRef;
use crate::request::Filter;

/// One compiled filter predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `table.column <op> value`
    Column {
        column: ColumnRef,
        op: CompareOp,
        value: Value,
    },
    /// `<raw sql expression> <op> value`, value still bound as a parameter.
    Raw {
        expr: String,
        op: CompareOp,
        value: Value,
    },
}

impl Predicate {
    fn to_expr(&self) -> SimpleExpr {
        let (lhs, op, value) = match self {
            Predicate::Column { column, op, value } => (column.expr(), op, value),
            Predicate::Raw { expr, op, value } => (Expr::cust(expr.clone()), op, value),
        };
        Expr::expr(lhs).binary(op.bin_oper(), value.clone())
    }
}

/// The compiled, implicitly ANDed filter of one paginate call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    /// Compile the requested values.
    ///
    /// `real_columns` maps every allowed field path to its column (raw filters map
    /// to a `ColumnRef::Raw`), `comparisons` maps [`ColumnRef::key`] or, for raw
    /// filters, the field path to its operator. Fields without a real column are
    /// skipped.
    pub(crate) fn compile(
        filter: &Filter,
        real_columns: &IndexMap<String, ColumnRef>,
        comparisons: &IndexMap<String, CompareOp>,
    ) -> Self {
        let predicates = filter
            .iter()
            .filter_map(|(path, value)| {
                let column = real_columns.get(path)?;
                let predicate = match column {
                    ColumnRef::Raw(expr) => Predicate::Raw {
                        expr: expr.clone(),
                        op: comparisons.get(path).copied().unwrap_or(CompareOp::Eq),
                        value: value.clone(),
                    },
                    ColumnRef::Qualified { .. } => Predicate::Column {
                        column: column.clone(),
                        op: comparisons
                            .get(&column.key())
                            .copied()
                            .unwrap_or(CompareOp::Eq),
                        value: value.clone(),
                    },
                };
                Some(predicate)
            })
            .collect();
        Self { predicates }
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    #[must_use]
    pub fn condition(&self) -> Condition {
        self.predicates
            .iter()
            .fold(Condition::all(), |cond, p| cond.add(p.to_expr()))
    }

    /// AND every predicate onto `query`.
    pub fn apply(&self, query: &mut SelectStatement) {
        if !self.predicates.is_empty() {
            query.cond_where(self.condition());
        }
    }
}
