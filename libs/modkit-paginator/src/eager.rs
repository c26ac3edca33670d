//! Eager loading of relations into hydrated rows.

use std::collections::HashMap;

use sea_orm::sea_query::{Alias, Asterisk, Expr, Order, Query, SelectStatement};
use sea_orm::{ConnectionTrait, JsonValue, Value};

use crate::error::{PaginatorError, Result};
use crate::model::{KeyType, ModelDescriptor, RelationKind, RelationMeta};
use crate::rows::{self, KeyValue};

/// Column alias carrying the owning base key in many-to-many loads.
const OWNER_ALIAS: &str = "__paginator_owner";

/// A relation requested through `with_related`, validated before any query runs.
#[derive(Clone, Debug)]
pub struct EagerRelation {
    name: String,
    meta: RelationMeta,
}

/// Validate the requested relation names.
pub fn plan(model: &ModelDescriptor, names: &[String]) -> Result<Vec<EagerRelation>> {
    let mut relations: Vec<EagerRelation> = Vec::with_capacity(names.len());
    for name in names {
        if relations.iter().any(|r| &r.name == name) {
            continue;
        }
        let meta = model.relation_meta(name)?;
        match meta.kind {
            RelationKind::BelongsTo | RelationKind::BelongsToMany => {}
            kind => {
                return Err(PaginatorError::UnsupportedRelationKind {
                    relation: name.clone(),
                    kind,
                });
            }
        }
        relations.push(EagerRelation {
            name: name.clone(),
            meta: meta.clone(),
        });
    }
    Ok(relations)
}

impl EagerRelation {
    fn many_to_many_statement(&self, keys: &[Value]) -> Result<SelectStatement> {
        let (Some(join_table), Some(other_key)) =
            (self.meta.join_table.as_deref(), self.meta.other_key.as_deref())
        else {
            return Err(PaginatorError::UnsupportedRelationKind {
                relation: self.name.clone(),
                kind: self.meta.kind,
            });
        };
        let target = Alias::new(&self.meta.target_table);
        let join = Alias::new(join_table);
        Ok(Query::select()
            .column((target.clone(), Asterisk))
            .expr_as(
                Expr::col((join.clone(), Alias::new(&self.meta.foreign_key))),
                Alias::new(OWNER_ALIAS),
            )
            .from(target.clone())
            .inner_join(
                join.clone(),
                Expr::col((join.clone(), Alias::new(other_key)))
                    .equals((target.clone(), Alias::new(&self.meta.target_key))),
            )
            .cond_where(
                Expr::col((join, Alias::new(&self.meta.foreign_key)))
                    .is_in(keys.iter().cloned()),
            )
            .order_by((target, Alias::new(&self.meta.target_key)), Order::Asc)
            .to_owned())
    }

    fn belongs_to_statement(&self, keys: &[Value]) -> SelectStatement {
        let target = Alias::new(&self.meta.target_table);
        Query::select()
            .column((target.clone(), Asterisk))
            .from(target.clone())
            .cond_where(
                Expr::col((target, Alias::new(&self.meta.target_key))).is_in(keys.iter().cloned()),
            )
            .to_owned()
    }

    async fn load<C>(
        &self,
        conn: &C,
        owner_key: KeyType,
        page: &mut [(KeyValue, JsonValue)],
    ) -> Result<()>
    where
        C: ConnectionTrait,
    {
        let backend = conn.get_database_backend();
        match self.meta.kind {
            RelationKind::BelongsToMany => {
                let keys: Vec<Value> = page.iter().map(|(k, _)| k.to_value()).collect();
                let mut grouped: HashMap<KeyValue, Vec<JsonValue>> = HashMap::new();
                if !keys.is_empty() {
                    let stmt = backend.build(&self.many_to_many_statement(&keys)?);
                    for result in conn.query_all(stmt).await? {
                        let (owner, mut related) = rows::keyed_row(&result, OWNER_ALIAS, owner_key)?;
                        let owner = owner.ok_or_else(|| {
                            PaginatorError::Decode(format!(
                                "missing owner key in relation {}",
                                self.name
                            ))
                        })?;
                        if let Some(object) = related.as_object_mut() {
                            object.remove(OWNER_ALIAS);
                        }
                        grouped.entry(owner).or_default().push(related);
                    }
                }
                for (key, row) in page.iter_mut() {
                    let related = grouped.get(key).cloned().unwrap_or_default();
                    rows::attach(row, &self.name, JsonValue::Array(related));
                }
                tracing::debug!(relation = %self.name, groups = grouped.len(), "Eager-loaded many-to-many relation");
            }
            RelationKind::BelongsTo => {
                let target_type = self.meta.target_key_type;
                let keys = rows::column_keys(
                    page.iter().map(|(_, row)| row),
                    &self.meta.foreign_key,
                    target_type,
                )?;
                let mut by_key: HashMap<KeyValue, JsonValue> = HashMap::new();
                if !keys.is_empty() {
                    let bound: Vec<Value> = keys.iter().map(KeyValue::to_value).collect();
                    let stmt = backend.build(&self.belongs_to_statement(&bound));
                    for result in conn.query_all(stmt).await? {
                        if let (Some(key), related) =
                            rows::keyed_row(&result, &self.meta.target_key, target_type)?
                        {
                            by_key.insert(key, related);
                        }
                    }
                }
                for (_, row) in page.iter_mut() {
                    let related = match row.get(&self.meta.foreign_key) {
                        Some(fk) => KeyValue::from_json(fk, target_type)?
                            .and_then(|k| by_key.get(&k).cloned())
                            .unwrap_or(JsonValue::Null),
                        None => JsonValue::Null,
                    };
                    rows::attach(row, &self.name, related);
                }
                tracing::debug!(relation = %self.name, matched = by_key.len(), "Eager-loaded belongs-to relation");
            }
            kind => {
                return Err(PaginatorError::UnsupportedRelationKind {
                    relation: self.name.clone(),
                    kind,
                });
            }
        }
        Ok(())
    }
}

/// Load every planned relation into the page rows, one query per relation.
/// `owner_key` is the type of the base primary key.
pub async fn load_all<C>(
    conn: &C,
    owner_key: KeyType,
    relations: &[EagerRelation],
    page: &mut [(KeyValue, JsonValue)],
) -> Result<()>
where
    C: ConnectionTrait,
{
    if page.is_empty() {
        return Ok(());
    }
    for relation in relations {
        relation.load(conn, owner_key, page).await?;
    }
    Ok(())
}
