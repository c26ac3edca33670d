//! Model descriptors consumed by the paginator.
//!
//! The paginator never owns the schema. It reads a small, closed description of
//! each model: the backing table, its primary key and the relations that dotted
//! filter paths (`languages.name`) may traverse. Descriptors are collected once in
//! a [`ModelRegistry`] and looked up by model name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sea_orm::{
    ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn,
};

use crate::error::{PaginatorError, Result};

/// Kind of a declared relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Many-to-one: the base table holds the foreign key.
    BelongsTo,
    /// Many-to-many through a join table.
    BelongsToMany,
    /// One-to-one owned by the target table.
    HasOne,
    /// One-to-many owned by the target table.
    HasMany,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::BelongsTo => write!(f, "belongs_to"),
            RelationKind::BelongsToMany => write!(f, "belongs_to_many"),
            RelationKind::HasOne => write!(f, "has_one"),
            RelationKind::HasMany => write!(f, "has_many"),
        }
    }
}

/// Storage type of a key column. Selected keys are decoded and re-bound with
/// this type, so a `uuid` column is never compared against text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Any integer column, decoded as `i64`.
    #[default]
    Integer,
    /// `char`, `varchar` or `text` columns.
    Text,
    Uuid,
}

impl KeyType {
    /// Key type of a `SeaORM` column; unknown types are treated as text.
    #[must_use]
    pub fn of_column(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned => KeyType::Integer,
            ColumnType::Uuid => KeyType::Uuid,
            _ => KeyType::Text,
        }
    }
}

/// Join metadata of one relation.
///
/// Column meaning depends on `kind`:
/// - `BelongsTo`: `foreign_key` lives on the base table and points at
///   `target_table.target_key`.
/// - `BelongsToMany`: `join_table.foreign_key` points at the base primary key and
///   `join_table.other_key` points at `target_table.target_key`.
/// - `HasOne` / `HasMany`: `target_table.foreign_key` points at the base primary key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationMeta {
    pub kind: RelationKind,
    pub target_table: String,
    pub target_key: String,
    pub join_table: Option<String>,
    pub foreign_key: String,
    pub other_key: Option<String>,
    /// Type of `target_key`, used to bind `belongs_to` lookups.
    pub target_key_type: KeyType,
}

impl RelationMeta {
    fn new(kind: RelationKind, target_table: &str, foreign_key: &str) -> Self {
        Self {
            kind,
            target_table: target_table.to_owned(),
            target_key: "id".to_owned(),
            join_table: None,
            foreign_key: foreign_key.to_owned(),
            other_key: None,
            target_key_type: KeyType::Integer,
        }
    }

    #[must_use]
    pub fn belongs_to(target_table: &str, foreign_key: &str) -> Self {
        Self::new(RelationKind::BelongsTo, target_table, foreign_key)
    }

    #[must_use]
    pub fn belongs_to_many(
        target_table: &str,
        join_table: &str,
        foreign_key: &str,
        other_key: &str,
    ) -> Self {
        Self {
            join_table: Some(join_table.to_owned()),
            other_key: Some(other_key.to_owned()),
            ..Self::new(RelationKind::BelongsToMany, target_table, foreign_key)
        }
    }

    #[must_use]
    pub fn has_one(target_table: &str, foreign_key: &str) -> Self {
        Self::new(RelationKind::HasOne, target_table, foreign_key)
    }

    #[must_use]
    pub fn has_many(target_table: &str, foreign_key: &str) -> Self {
        Self::new(RelationKind::HasMany, target_table, foreign_key)
    }

    /// Override the target primary key (defaults to `id`).
    #[must_use]
    pub fn with_target_key(mut self, target_key: &str) -> Self {
        self.target_key = target_key.to_owned();
        self
    }

    #[must_use]
    pub fn with_target_key_type(mut self, key_type: KeyType) -> Self {
        self.target_key_type = key_type;
        self
    }
}

/// Table, primary key and relations of one model.
#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    name: String,
    table: String,
    primary_key: String,
    key_type: KeyType,
    relations: HashMap<String, RelationMeta>,
}

impl ModelDescriptor {
    #[must_use]
    pub fn new(name: &str, table: &str) -> Self {
        Self {
            name: name.to_owned(),
            table: table.to_owned(),
            primary_key: "id".to_owned(),
            key_type: KeyType::Integer,
            relations: HashMap::new(),
        }
    }

    /// Build a descriptor from a `SeaORM` entity: table name, the first
    /// primary-key column and its key type. Relations still have to be declared with
    /// [`ModelDescriptor::relation`].
    #[must_use]
    pub fn for_entity<E>(name: &str) -> Self
    where
        E: EntityTrait,
    {
        let entity = E::default();
        let mut descriptor = Self::new(name, entity.table_name());
        if let Some(pk) = E::PrimaryKey::iter().next() {
            let column = pk.into_column();
            descriptor.primary_key = column.as_str().to_owned();
            descriptor.key_type = KeyType::of_column(column.def().get_column_type());
        }
        descriptor
    }

    #[must_use]
    pub fn with_primary_key(mut self, primary_key: &str) -> Self {
        self.primary_key = primary_key.to_owned();
        self
    }

    #[must_use]
    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Declare a named relation.
    #[must_use]
    pub fn relation(mut self, name: &str, meta: RelationMeta) -> Self {
        self.relations.insert(name.to_owned(), meta);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Look up a declared relation.
    ///
    /// # Errors
    /// Returns `PaginatorError::UnknownRelation` if no relation has that name.
    pub fn relation_meta(&self, relation: &str) -> Result<&RelationMeta> {
        self.relations
            .get(relation)
            .ok_or_else(|| PaginatorError::UnknownRelation {
                model: self.name.clone(),
                relation: relation.to_owned(),
            })
    }
}

/// Registered models, keyed by model name.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ModelDescriptor>>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, descriptor: ModelDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn register(&mut self, descriptor: ModelDescriptor) {
        self.models
            .insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    /// Resolve a model by name.
    ///
    /// # Errors
    /// Returns `PaginatorError::UnknownModel` if the model is not registered.
    pub fn get(&self, name: &str) -> Result<Arc<ModelDescriptor>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| PaginatorError::UnknownModel(name.to_owned()))
    }
}
