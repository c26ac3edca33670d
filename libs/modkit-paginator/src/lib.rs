#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `ModKit` offset pagination over `SeaORM` connections.
//!
//! The paginator addresses models by name through a [`ModelRegistry`], accepts
//! filters on bare columns and on one level of declared relations
//! (`languages.name`), and returns one page of rows plus the total number of
//! matching entities.
//!
//! To-many joins repeat base rows, so a page is fetched in phases:
//! distinct keys are counted and selected with `LIMIT`/`OFFSET` first, then the
//! full rows for exactly those keys are hydrated and de-duplicated.
//!
//! # Features
//! - `sqlite` (default), `pg`, `mysql`: enable the matching `SQLx` backend of `SeaORM`
//!
//! # Example
//! ```rust,no_run
//! use modkit_paginator::{FetchOptions, ModelDescriptor, ModelRegistry, PageRequest};
//! use modkit_paginator::{Paginator, PaginatorConfig, RelationMeta};
//!
//! # async fn run(conn: &sea_orm::DatabaseConnection) -> modkit_paginator::Result<()> {
//! let registry = ModelRegistry::new().with(
//!     ModelDescriptor::new("Person", "person")
//!         .relation("domain", RelationMeta::belongs_to("domain", "domain_id")),
//! );
//! let config = PaginatorConfig::default().filter_by(["gender", "domain.name"]);
//!
//! let request = PageRequest::from_query_str(
//!     "gender=female&domain.name=example.org&limit=10&sort=-lastname",
//!     &config.query_strings,
//! )?;
//!
//! let mut pager = Paginator::with_config(conn, &registry, "Person", config)?;
//! let options = FetchOptions { with_related: vec!["domain".to_owned()], ..request.options };
//! let page = pager.paginate(&request.filter, &options).await?;
//! assert!(page.data().len() <= 10);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod headers;
pub mod model;
pub mod pager;
pub mod plan;
pub mod request;

mod eager;
mod rows;

pub use config::{CompareOp, Comparison, HeaderNames, PaginatorConfig, QueryStringNames};
pub use error::{PaginatorError, Result};
pub use headers::HeaderSink;
pub use model::{KeyType, ModelDescriptor, ModelRegistry, RelationKind, RelationMeta};
pub use pager::Paginator;
pub use plan::{QueryPlan, SortDir};
pub use request::{FetchOptions, Filter, PageRequest};
