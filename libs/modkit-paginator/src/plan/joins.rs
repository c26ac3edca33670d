//! Join planning: one descriptor per target table, attached as LEFT JOINs.

use indexmap::IndexMap;
use sea_orm::sea_query::{Alias, Expr, SelectStatement};

/// Everything needed to join a relation's target table onto the base table.
///
/// For a many-to-many relation the path is
/// `base.local_key = join.foreign_key` then `join.other_key = target.target_key`.
/// For a to-one relation `join_table` is the base table itself and the single
/// condition is `base.other_key = target.target_key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinDescriptor {
    pub base_table: String,
    pub join_table: String,
    pub local_key: String,
    pub foreign_key: String,
    pub other_key: String,
    pub target_table: String,
    pub target_key: String,
}

impl JoinDescriptor {
    /// `true` when no intermediate join table is needed.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.join_table == self.base_table
    }

    fn attach(&self, query: &mut SelectStatement) {
        let base = Alias::new(&self.base_table);
        let target = Alias::new(&self.target_table);
        if self.is_direct() {
            query.left_join(
                target.clone(),
                Expr::col((base, Alias::new(&self.other_key)))
                    .equals((target, Alias::new(&self.target_key))),
            );
        } else {
            let join = Alias::new(&self.join_table);
            query
                .left_join(
                    join.clone(),
                    Expr::col((base, Alias::new(&self.local_key)))
                        .equals((join.clone(), Alias::new(&self.foreign_key))),
                )
                .left_join(
                    target.clone(),
                    Expr::col((join, Alias::new(&self.other_key)))
                        .equals((target, Alias::new(&self.target_key))),
                );
        }
    }
}

/// Join descriptors keyed by target table, in discovery order.
#[derive(Clone, Debug, Default)]
pub struct JoinPlanner {
    joins: IndexMap<String, JoinDescriptor>,
}

impl JoinPlanner {
    /// Register a descriptor; a target table already present keeps its first
    /// descriptor.
    pub fn register(&mut self, descriptor: JoinDescriptor) {
        self.joins
            .entry(descriptor.target_table.clone())
            .or_insert(descriptor);
    }

    /// Attach every registered join to `query`.
    pub fn attach(&self, query: &mut SelectStatement) {
        for descriptor in self.joins.values() {
            descriptor.attach(query);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.joins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &JoinDescriptor> {
        self.joins.values()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Query, SqliteQueryBuilder};

    fn languages() -> JoinDescriptor {
        JoinDescriptor {
            base_table: "person".to_owned(),
            join_table: "person_speaks_language".to_owned(),
            local_key: "id".to_owned(),
            foreign_key: "person_id".to_owned(),
            other_key: "language_id".to_owned(),
            target_table: "language".to_owned(),
            target_key: "id".to_owned(),
        }
    }

    fn domain() -> JoinDescriptor {
        JoinDescriptor {
            base_table: "person".to_owned(),
            join_table: "person".to_owned(),
            local_key: "domain_id".to_owned(),
            foreign_key: "domain_id".to_owned(),
            other_key: "domain_id".to_owned(),
            target_table: "domain".to_owned(),
            target_key: "id".to_owned(),
        }
    }

    fn render(planner: &JoinPlanner) -> String {
        let mut query = Query::select();
        query.column((Alias::new("person"), Alias::new("id")));
        query.from(Alias::new("person"));
        planner.attach(&mut query);
        query.to_string(SqliteQueryBuilder)
    }

    #[test]
    fn many_to_many_attaches_two_left_joins() {
        let mut planner = JoinPlanner::default();
        planner.register(languages());

        let sql = render(&planner);

        assert!(sql.contains(
            r#"LEFT JOIN "person_speaks_language" ON "person"."id" = "person_speaks_language"."person_id""#
        ));
        assert!(sql.contains(
            r#"LEFT JOIN "language" ON "person_speaks_language"."language_id" = "language"."id""#
        ));
    }

    #[test]
    fn to_one_attaches_single_left_join() {
        let mut planner = JoinPlanner::default();
        planner.register(domain());

        let sql = render(&planner);

        assert_eq!(sql.matches("LEFT JOIN").count(), 1);
        assert!(sql.contains(r#"LEFT JOIN "domain" ON "person"."domain_id" = "domain"."id""#));
    }

    #[test]
    fn same_target_is_registered_once() {
        let mut planner = JoinPlanner::default();
        planner.register(languages());
        planner.register(languages());
        planner.register(domain());

        assert_eq!(planner.len(), 2);
        assert_eq!(render(&planner).matches("LEFT JOIN").count(), 3);
    }

    #[test]
    fn attaching_twice_yields_identical_joins() {
        let mut planner = JoinPlanner::default();
        planner.register(domain());
        planner.register(languages());

        assert_eq!(render(&planner), render(&planner));
        let targets: Vec<_> = planner.iter().map(|j| j.target_table.as_str()).collect();
        assert_eq!(targets, vec!["domain", "language"]);
    }
}
