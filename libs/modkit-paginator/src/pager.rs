//! Offset pagination over a registered model.
//!
//! A [`Paginator`] is bound to one connection and one model. Every call to
//! [`Paginator::paginate`] rebuilds its effective configuration and query plan,
//! then runs:
//!
//! 1. the count and key-selection statements, concurrently
//! 2. hydration of the selected keys
//! 3. one statement per eager-loaded relation
//!
//! ```rust,no_run
//! use modkit_paginator::{FetchOptions, Filter, ModelDescriptor, ModelRegistry};
//! use modkit_paginator::{Paginator, PaginatorConfig, RelationMeta};
//!
//! # async fn run(conn: &sea_orm::DatabaseConnection) -> modkit_paginator::Result<()> {
//! let registry = ModelRegistry::new().with(
//!     ModelDescriptor::new("Person", "person").relation(
//!         "languages",
//!         RelationMeta::belongs_to_many("language", "person_speaks_language", "person_id", "language_id"),
//!     ),
//! );
//! let config = PaginatorConfig::default()
//!     .filter_by(["gender", "languages.name"])
//!     .sort_by("-lastname")
//!     .limit(10);
//!
//! let mut pager = Paginator::with_config(conn, &registry, "Person", config)?;
//! let page = pager
//!     .paginate(
//!         &Filter::new().with("gender", "female"),
//!         &FetchOptions::new().with_related("languages"),
//!     )
//!     .await?;
//!
//! let mut headers = http::HeaderMap::new();
//! page.set_headers(&mut headers)?;
//! println!("{} of {}", page.data().len(), page.total());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use sea_orm::{ConnectionTrait, JsonValue, Statement, Value};

use crate::config::PaginatorConfig;
use crate::eager;
use crate::error::{PaginatorError, Result};
use crate::headers::HeaderSink;
use crate::model::{KeyType, ModelDescriptor, ModelRegistry};
use crate::plan::{QueryPlan, TOTAL_ALIAS};
use crate::request::{FetchOptions, Filter, coerce_limit, coerce_offset};
use crate::rows::{self, KeyValue};

/// Paginates one model over one connection.
///
/// `paginate` takes `&mut self`: use one instance per concurrent request.
pub struct Paginator<'a, C: ConnectionTrait> {
    conn: &'a C,
    model: Arc<ModelDescriptor>,
    base: PaginatorConfig,
    effective: PaginatorConfig,
    total: u64,
    data: Vec<JsonValue>,
}

impl<'a, C: ConnectionTrait> Paginator<'a, C> {
    /// Paginator with the default configuration.
    ///
    /// # Errors
    /// Returns `PaginatorError::UnknownModel` if `model` is not registered.
    pub fn new(conn: &'a C, registry: &ModelRegistry, model: &str) -> Result<Self> {
        Self::with_config(conn, registry, model, PaginatorConfig::default())
    }

    /// # Errors
    /// Returns `PaginatorError::UnknownModel` if `model` is not registered.
    pub fn with_config(
        conn: &'a C,
        registry: &ModelRegistry,
        model: &str,
        config: PaginatorConfig,
    ) -> Result<Self> {
        let model = registry.get(model)?;
        Ok(Self {
            conn,
            model,
            effective: config.clone(),
            base: config,
            total: 0,
            data: Vec::new(),
        })
    }

    /// Fetch one page.
    ///
    /// Filter keys not listed in `filter_by` are ignored. Per-call `limit`,
    /// `offset` and `sort_by` in `options` override the base configuration.
    ///
    /// # Errors
    /// Configuration errors (`UnknownRelation`, `UnsupportedPath`,
    /// `UnsupportedRelationKind`) are returned before any statement runs.
    /// Database failures are returned as `PaginatorError::Db`, undecodable
    /// counts or keys as `PaginatorError::Decode`.
    pub async fn paginate(&mut self, filter: &Filter, options: &FetchOptions) -> Result<&Self> {
        self.reset(options);

        let projected = filter.project(&self.effective.filter_by);
        let dropped: Vec<&str> = filter
            .iter()
            .map(|(k, _)| k)
            .filter(|k| projected.get(k).is_none())
            .collect();
        if !dropped.is_empty() {
            tracing::debug!(model = %self.model.name(), ?dropped, "Ignoring filter keys outside filter_by");
        }

        let plan = QueryPlan::build(&self.model, &self.effective, &projected)?;
        let related = eager::plan(&self.model, &options.with_related)?;

        let backend = self.conn.get_database_backend();
        let count_stmt = backend.build(&plan.count_statement());
        let key_stmt = backend.build(&plan.key_statement(self.effective.limit, self.effective.offset));

        let (total, keys) = tokio::try_join!(
            count(self.conn, count_stmt),
            fetch_keys(self.conn, key_stmt, plan.primary_key(), self.model.key_type())
        )?;
        tracing::debug!(
            model = %self.model.name(),
            total,
            keys = keys.len(),
            limit = self.effective.limit,
            offset = self.effective.offset,
            "Selected page keys"
        );

        let mut page = if keys.is_empty() {
            Vec::new()
        } else {
            let bound: Vec<Value> = keys.iter().map(KeyValue::to_value).collect();
            let hydrate_stmt = backend.build(&plan.hydrate_statement(&bound));
            let hydrated = fetch_keyed_rows(
                self.conn,
                hydrate_stmt,
                plan.primary_key(),
                self.model.key_type(),
            )
            .await?;
            let fetched = hydrated.len();
            let page = rows::dedup_in_key_order(hydrated, &keys);
            tracing::debug!(
                model = %self.model.name(),
                fetched,
                distinct = page.len(),
                "Hydrated page rows"
            );
            page
        };

        eager::load_all(self.conn, self.model.key_type(), &related, &mut page).await?;
        let data = page.into_iter().map(|(_, row)| row).collect();

        self.total = total;
        self.data = data;
        Ok(&*self)
    }

    fn reset(&mut self, options: &FetchOptions) {
        let mut effective = self.base.clone();
        effective.limit = coerce_limit(
            options.limit.as_deref(),
            self.base.limit,
            self.base.max_limit,
        );
        effective.offset = coerce_offset(options.offset.as_deref(), self.base.offset);
        if let Some(sort) = options.sort_by.as_deref().filter(|s| !s.trim().is_empty()) {
            sort.clone_into(&mut effective.sort_by);
        }
        self.effective = effective;
        self.total = 0;
        self.data.clear();
    }

    /// Number of matching entities, irrespective of limit and offset.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.effective.limit
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.effective.offset
    }

    /// Rows of the current page, one per entity, in sort order.
    #[must_use]
    pub fn data(&self) -> &[JsonValue] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<JsonValue> {
        self.data
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The configuration in effect for the last call.
    #[must_use]
    pub fn config(&self) -> &PaginatorConfig {
        &self.effective
    }

    /// Write the total, limit and offset headers under their configured names.
    ///
    /// `http` header maps and responses are left untouched when any of the
    /// three is rejected.
    ///
    /// # Errors
    /// Returns `PaginatorError::InvalidResponseTarget` if `sink` rejects a header.
    pub fn set_headers<S>(&self, sink: &mut S) -> Result<()>
    where
        S: HeaderSink + ?Sized,
    {
        let names = &self.effective.headers;
        let total = self.total.to_string();
        let limit = self.effective.limit.to_string();
        let offset = self.effective.offset.to_string();
        sink.set_all(&[
            (names.total.as_str(), total.as_str()),
            (names.limit.as_str(), limit.as_str()),
            (names.offset.as_str(), offset.as_str()),
        ])
    }
}

async fn count<C: ConnectionTrait>(conn: &C, stmt: Statement) -> Result<u64> {
    let Some(row) = conn.query_one(stmt).await? else {
        return Ok(0);
    };
    let total: i64 = row.try_get("", TOTAL_ALIAS)?;
    u64::try_from(total).map_err(|_| PaginatorError::Decode(format!("negative count {total}")))
}

async fn fetch_keys<C: ConnectionTrait>(
    conn: &C,
    stmt: Statement,
    primary_key: &str,
    key_type: KeyType,
) -> Result<Vec<KeyValue>> {
    let mut keys = Vec::new();
    for row in conn.query_all(stmt).await? {
        if let Some(key) = KeyValue::decode(&row, primary_key, key_type)? {
            keys.push(key);
        }
    }
    Ok(keys)
}

async fn fetch_keyed_rows<C: ConnectionTrait>(
    conn: &C,
    stmt: Statement,
    primary_key: &str,
    key_type: KeyType,
) -> Result<Vec<(KeyValue, JsonValue)>> {
    let mut keyed = Vec::new();
    for row in conn.query_all(stmt).await? {
        if let (Some(key), json) = rows::keyed_row(&row, primary_key, key_type)? {
            keyed.push((key, json));
        }
    }
    Ok(keyed)
}
