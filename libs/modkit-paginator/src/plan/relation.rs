//! Field path resolution: `column` or `relation.column`.

use sea_orm::sea_query::{Alias, Expr, SimpleExpr};

use crate::error::{PaginatorError, Result};
use crate::model::{ModelDescriptor, RelationKind, RelationMeta};
use crate::plan::joins::JoinDescriptor;

pub(crate) const PATH_SEPARATOR: char = '.';

/// Left-hand side of a comparison or sort key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnRef {
    /// `table.column`
    Qualified { table: String, column: String },
    /// Raw SQL expression, e.g. `json_extract(person.meta, '$.color')`.
    Raw(String),
}

impl ColumnRef {
    pub(crate) fn qualified(table: &str, column: &str) -> Self {
        ColumnRef::Qualified {
            table: table.to_owned(),
            column: column.to_owned(),
        }
    }

    pub(crate) fn expr(&self) -> SimpleExpr {
        match self {
            ColumnRef::Qualified { table, column } => {
                Expr::col((Alias::new(table), Alias::new(column))).into()
            }
            ColumnRef::Raw(sql) => Expr::cust(sql.clone()),
        }
    }

    /// `table.column` for qualified references, the expression text otherwise.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            ColumnRef::Qualified { table, column } => format!("{table}.{column}"),
            ColumnRef::Raw(sql) => sql.clone(),
        }
    }
}

/// A resolved field path and the join it needs, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedPath {
    pub column: ColumnRef,
    pub join: Option<JoinDescriptor>,
}

/// Resolve a field path against the model's declared relations.
///
/// # Errors
/// - `UnsupportedPath` when the path has more than one separator
/// - `UnknownRelation` when the relation is not declared on the model
/// - `UnsupportedRelationKind` for relations other than `BelongsTo`/`BelongsToMany`
pub(crate) fn resolve_path(model: &ModelDescriptor, path: &str) -> Result<ResolvedPath> {
    let Some((relation, field)) = path.split_once(PATH_SEPARATOR) else {
        return Ok(ResolvedPath {
            column: ColumnRef::qualified(model.table(), path),
            join: None,
        });
    };
    if field.contains(PATH_SEPARATOR) {
        return Err(PaginatorError::UnsupportedPath(path.to_owned()));
    }

    let meta = model.relation_meta(relation)?;
    let join = join_for(model, relation, meta)?;
    tracing::trace!(path, target = %join.target_table, "Resolved relation path");

    Ok(ResolvedPath {
        column: ColumnRef::qualified(&meta.target_table, field),
        join: Some(join),
    })
}

/// Join descriptor for a named relation.
pub(crate) fn join_for(
    model: &ModelDescriptor,
    relation: &str,
    meta: &RelationMeta,
) -> Result<JoinDescriptor> {
    match (meta.kind, meta.join_table.as_deref(), meta.other_key.as_deref()) {
        (RelationKind::BelongsToMany, Some(join_table), Some(other_key)) => Ok(JoinDescriptor {
            base_table: model.table().to_owned(),
            join_table: join_table.to_owned(),
            local_key: model.primary_key().to_owned(),
            foreign_key: meta.foreign_key.clone(),
            other_key: other_key.to_owned(),
            target_table: meta.target_table.clone(),
            target_key: meta.target_key.clone(),
        }),
        (RelationKind::BelongsTo, _, _) => Ok(JoinDescriptor {
            base_table: model.table().to_owned(),
            join_table: model.table().to_owned(),
            local_key: meta.foreign_key.clone(),
            foreign_key: meta.foreign_key.clone(),
            other_key: meta.foreign_key.clone(),
            target_table: meta.target_table.clone(),
            target_key: meta.target_key.clone(),
        }),
        (kind, _, _) => Err(PaginatorError::UnsupportedRelationKind {
            relation: relation.to_owned(),
            kind,
        }),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn person() -> ModelDescriptor {
        ModelDescriptor::new("Person", "person")
            .relation(
                "languages",
                RelationMeta::belongs_to_many(
                    "language",
                    "person_speaks_language",
                    "person_id",
                    "language_id",
                ),
            )
            .relation("domain", RelationMeta::belongs_to("domain", "domain_id"))
            .relation("posts", RelationMeta::has_many("post", "person_id"))
    }

    #[test]
    fn bare_field_is_qualified_with_base_table() {
        let resolved = resolve_path(&person(), "lastname").unwrap();

        assert_eq!(resolved.column, ColumnRef::qualified("person", "lastname"));
        assert!(resolved.join.is_none());
    }

    #[test]
    fn many_to_many_path_goes_through_join_table() {
        let resolved = resolve_path(&person(), "languages.name").unwrap();

        assert_eq!(resolved.column.key(), "language.name");
        let join = resolved.join.unwrap();
        assert_eq!(join.join_table, "person_speaks_language");
        assert_eq!(join.local_key, "id");
        assert_eq!(join.foreign_key, "person_id");
        assert_eq!(join.other_key, "language_id");
        assert_eq!(join.target_table, "language");
        assert_eq!(join.target_key, "id");
        assert!(!join.is_direct());
    }

    #[test]
    fn belongs_to_path_joins_from_base_table() {
        let resolved = resolve_path(&person(), "domain.name").unwrap();

        assert_eq!(resolved.column.key(), "domain.name");
        let join = resolved.join.unwrap();
        assert!(join.is_direct());
        assert_eq!(join.other_key, "domain_id");
    }

    #[test]
    fn nested_path_is_rejected() {
        let err = resolve_path(&person(), "languages.country.name").unwrap_err();
        assert!(matches!(err, PaginatorError::UnsupportedPath(p) if p == "languages.country.name"));
    }

    #[test]
    fn undeclared_relation_is_rejected() {
        let err = resolve_path(&person(), "pets.name").unwrap_err();
        assert!(matches!(err, PaginatorError::UnknownRelation { relation, .. } if relation == "pets"));
    }

    #[test]
    fn has_many_relation_is_unsupported() {
        let err = resolve_path(&person(), "posts.title").unwrap_err();
        assert!(matches!(
            err,
            PaginatorError::UnsupportedRelationKind { kind: RelationKind::HasMany, .. }
        ));
    }
}
