//! Per-call query plan.
//!
//! A [`QueryPlan`] is built once at the start of every paginate call from the
//! model descriptor, the effective configuration and the requested filter. It is
//! immutable afterwards and renders the three statements of a page fetch:
//!
//! 1. count: number of distinct base keys matching the joined, filtered query
//! 2. keys: the distinct base keys of the page, sorted, with LIMIT/OFFSET
//! 3. hydrate: full base rows for exactly those keys
//!
//! LIMIT/OFFSET is applied to the key selection, never to the hydration, because
//! to-many joins repeat base rows.

pub mod filter;
pub mod joins;
pub mod relation;
pub mod sort;

use indexmap::IndexMap;
use sea_orm::Value;
use sea_orm::sea_query::{Alias, Asterisk, Expr, Func, Query, SelectStatement};

use crate::config::{CompareOp, PaginatorConfig};
use crate::error::Result;
use crate::model::ModelDescriptor;
use crate::request::Filter;

pub use filter::{FilterSet, Predicate};
pub use joins::{JoinDescriptor, JoinPlanner};
pub use relation::ColumnRef;
pub use sort::{SortDir, SortSpec, parse_sort_token};

use relation::resolve_path;

/// Column alias of the count statement.
pub const TOTAL_ALIAS: &str = "total";

const MATCHED_ALIAS: &str = "matched";

#[derive(Clone, Debug)]
pub struct QueryPlan {
    table: String,
    primary_key: String,
    joins: JoinPlanner,
    real_columns: IndexMap<String, ColumnRef>,
    comparisons: IndexMap<String, CompareOp>,
    filters: FilterSet,
    sort: SortSpec,
}

impl QueryPlan {
    /// Resolve every configured path, compile the filter and the sort.
    ///
    /// # Errors
    /// Returns a configuration error (`UnknownRelation`, `UnsupportedPath`,
    /// `UnsupportedRelationKind`) if a `filter_by` or `sort_by` path cannot be
    /// resolved against the model.
    pub fn build(
        model: &ModelDescriptor,
        config: &PaginatorConfig,
        filter: &Filter,
    ) -> Result<Self> {
        let mut joins = JoinPlanner::default();
        let mut real_columns = IndexMap::new();
        let mut comparisons = IndexMap::new();

        for path in &config.filter_by {
            let op = config.comp.operator_for(path);
            let column = if let Some(raw) = config.raw_filters.get(path) {
                comparisons.entry(path.clone()).or_insert(op);
                ColumnRef::Raw(raw.clone())
            } else {
                let resolved = resolve_path(model, path)?;
                if let Some(join) = resolved.join {
                    joins.register(join);
                }
                comparisons.entry(resolved.column.key()).or_insert(op);
                resolved.column
            };
            real_columns.insert(path.clone(), column);
        }

        let filters = FilterSet::compile(filter, &real_columns, &comparisons);
        let sort = resolve_sort(model, &config.sort_by, &real_columns, &mut joins)?;

        tracing::debug!(
            model = %model.name(),
            joins = joins.len(),
            predicates = filters.predicates().len(),
            sort = %sort.column.key(),
            "Built pagination plan"
        );

        Ok(Self {
            table: model.table().to_owned(),
            primary_key: model.primary_key().to_owned(),
            joins,
            real_columns,
            comparisons,
            filters,
            sort,
        })
    }

    #[must_use]
    pub fn joins(&self) -> &JoinPlanner {
        &self.joins
    }

    #[must_use]
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    #[must_use]
    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    /// Field path → resolved column.
    #[must_use]
    pub fn real_columns(&self) -> &IndexMap<String, ColumnRef> {
        &self.real_columns
    }

    /// Column key (or raw filter path) → operator.
    #[must_use]
    pub fn comparisons(&self) -> &IndexMap<String, CompareOp> {
        &self.comparisons
    }

    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn pk_column(&self) -> (Alias, Alias) {
        (Alias::new(&self.table), Alias::new(&self.primary_key))
    }

    /// Base table with joins and filters.
    fn base_query(&self) -> SelectStatement {
        let mut query = Query::select();
        query.from(Alias::new(&self.table));
        self.joins.attach(&mut query);
        self.filters.apply(&mut query);
        query
    }

    /// Distinct matching base keys, one row per entity.
    fn matched_keys(&self) -> SelectStatement {
        let mut query = self.base_query();
        query
            .column(self.pk_column())
            .group_by_col(self.pk_column());
        query
    }

    #[must_use]
    pub fn count_statement(&self) -> SelectStatement {
        Query::select()
            .expr_as(Func::count(Expr::col(Asterisk)), Alias::new(TOTAL_ALIAS))
            .from_subquery(self.matched_keys(), Alias::new(MATCHED_ALIAS))
            .to_owned()
    }

    /// Keys of one page. Rows are grouped per entity, so a joined sort column is
    /// reduced with `MIN`; the primary key breaks ties in the same direction.
    #[must_use]
    pub fn key_statement(&self, limit: u64, offset: u64) -> SelectStatement {
        let order = self.sort.direction.order();
        let mut query = self.matched_keys();
        query
            .order_by_expr(Func::min(self.sort.column.expr()).into(), order.clone())
            .order_by(self.pk_column(), order)
            .limit(limit)
            .offset(offset);
        query
    }

    /// Full base rows for `keys`, with the joins, filters and sort of the plan.
    /// Joined rows may repeat an entity; callers de-duplicate.
    #[must_use]
    pub fn hydrate_statement(&self, keys: &[Value]) -> SelectStatement {
        let order = self.sort.direction.order();
        let mut query = self.base_query();
        query
            .column((Alias::new(&self.table), Asterisk))
            .cond_where(Expr::col(self.pk_column()).is_in(keys.iter().cloned()))
            .order_by_expr(self.sort.column.expr(), order.clone())
            .order_by(self.pk_column(), order);
        query
    }
}

fn resolve_sort(
    model: &ModelDescriptor,
    token: &str,
    real_columns: &IndexMap<String, ColumnRef>,
    joins: &mut JoinPlanner,
) -> Result<SortSpec> {
    let (field, direction) = parse_sort_token(token);
    let column = if field.is_empty() {
        ColumnRef::qualified(model.table(), model.primary_key())
    } else if let Some(column) = real_columns.get(field) {
        column.clone()
    } else {
        let resolved = resolve_path(model, field)?;
        if let Some(join) = resolved.join {
            joins.register(join);
        }
        resolved.column
    };
    Ok(SortSpec { column, direction })
}
