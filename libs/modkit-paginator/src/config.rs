//! Paginator configuration.
//!
//! The configuration is plain serde data so it can live next to the rest of a
//! module's settings. [`PaginatorConfig::from_figment`] extracts it from a
//! `figment::Figment`; [`PaginatorConfig::load`] layers a YAML file and
//! `PAGINATOR__*` environment variables on top of the defaults.
//!
//! ```yaml
//! limit: 10
//! max_limit: 500
//! filter_by: [gender, languages.name, meta.color]
//! sort_by: -lastname
//! comp:
//!   like: [languages.name]
//! raw_filters:
//!   meta.color: "json_extract(person.meta, '$.color')"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use indexmap::IndexMap;
use sea_orm::sea_query::BinOper;
use serde::{Deserialize, Serialize};

use crate::error::{PaginatorError, Result};

pub const DEFAULT_LIMIT: u64 = 25;
pub const DEFAULT_OFFSET: u64 = 0;
/// Upper bound on the page size, request-supplied or configured.
pub const DEFAULT_MAX_LIMIT: u64 = 1000;

/// Comparison operator applied between a filter column and its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl CompareOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Like => "like",
            CompareOp::NotLike => "not like",
        }
    }

    pub(crate) fn bin_oper(self) -> BinOper {
        match self {
            CompareOp::Eq => BinOper::Equal,
            CompareOp::Ne => BinOper::NotEqual,
            CompareOp::Lt => BinOper::SmallerThan,
            CompareOp::Lte => BinOper::SmallerThanOrEqual,
            CompareOp::Gt => BinOper::GreaterThan,
            CompareOp::Gte => BinOper::GreaterThanOrEqual,
            CompareOp::Like => BinOper::Like,
            CompareOp::NotLike => BinOper::NotLike,
        }
    }
}

impl FromStr for CompareOp {
    type Err = PaginatorError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(match normalized.to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => CompareOp::Eq,
            "!=" | "<>" | "ne" => CompareOp::Ne,
            "<" | "lt" => CompareOp::Lt,
            "<=" | "le" => CompareOp::Lte,
            ">" | "gt" => CompareOp::Gt,
            ">=" | "ge" => CompareOp::Gte,
            "like" => CompareOp::Like,
            "not like" => CompareOp::NotLike,
            _ => return Err(PaginatorError::UnsupportedOperator(s.to_owned())),
        })
    }
}

impl TryFrom<String> for CompareOp {
    type Error = PaginatorError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CompareOp> for String {
    fn from(op: CompareOp) -> Self {
        op.as_str().to_owned()
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator assignment for filter fields.
///
/// Either one operator for every field, or an ordered map operator → field paths.
/// With the map form the first operator listing a field wins; unlisted fields
/// compare with `=`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Comparison {
    All(CompareOp),
    PerField(IndexMap<CompareOp, Vec<String>>),
}

impl Default for Comparison {
    fn default() -> Self {
        Comparison::All(CompareOp::Eq)
    }
}

impl Comparison {
    /// Operator for a filter field path.
    #[must_use]
    pub fn operator_for(&self, field: &str) -> CompareOp {
        match self {
            Comparison::All(op) => *op,
            Comparison::PerField(map) => map
                .iter()
                .find(|(_, fields)| fields.iter().any(|f| f == field))
                .map_or(CompareOp::Eq, |(op, _)| *op),
        }
    }
}

/// Response header names for the page metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderNames {
    pub total: String,
    pub limit: String,
    pub offset: String,
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            total: "X-Total".to_owned(),
            limit: "X-Limit".to_owned(),
            offset: "X-Offset".to_owned(),
        }
    }
}

/// Query-string parameter names that carry page controls instead of filters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryStringNames {
    pub limit: String,
    pub offset: String,
    pub sort: String,
}

impl Default for QueryStringNames {
    fn default() -> Self {
        Self {
            limit: "limit".to_owned(),
            offset: "offset".to_owned(),
            sort: "sort".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginatorConfig {
    pub headers: HeaderNames,
    pub query_strings: QueryStringNames,
    pub limit: u64,
    pub offset: u64,
    /// Larger limits are clamped down to this value.
    pub max_limit: u64,
    /// Allowed filter paths: `column` or `relation.column`.
    pub filter_by: Vec<String>,
    /// Sort path, `-` prefix for descending. Empty sorts by the primary key.
    pub sort_by: String,
    pub comp: Comparison,
    /// Filter paths compared against a raw SQL expression instead of a column.
    pub raw_filters: IndexMap<String, String>,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            headers: HeaderNames::default(),
            query_strings: QueryStringNames::default(),
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
            max_limit: DEFAULT_MAX_LIMIT,
            filter_by: Vec::new(),
            sort_by: String::new(),
            comp: Comparison::default(),
            raw_filters: IndexMap::new(),
        }
    }
}

impl PaginatorConfig {
    #[must_use]
    pub fn filter_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_by = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn sort_by(mut self, sort: &str) -> Self {
        sort.clone_into(&mut self.sort_by);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn max_limit(mut self, max_limit: u64) -> Self {
        self.max_limit = max_limit;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn comp(mut self, comp: Comparison) -> Self {
        self.comp = comp;
        self
    }

    #[must_use]
    pub fn raw_filter(mut self, field: &str, expr: &str) -> Self {
        self.raw_filters.insert(field.to_owned(), expr.to_owned());
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderNames) -> Self {
        self.headers = headers;
        self
    }

    /// Extract the configuration found under `key` (or at the root when `key` is
    /// empty), falling back to defaults for absent fields.
    ///
    /// # Errors
    /// Returns `PaginatorError::Config` if the figment data does not match the
    /// configuration shape (unknown operator, unknown field, wrong type).
    pub fn from_figment(figment: &Figment, key: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(PaginatorConfig::default()))
            .merge(if key.is_empty() {
                figment.clone()
            } else {
                figment.focus(key)
            });
        let cfg: PaginatorConfig = figment.extract()?;
        tracing::debug!(
            filter_by = ?cfg.filter_by,
            sort_by = %cfg.sort_by,
            limit = cfg.limit,
            max_limit = cfg.max_limit,
            "Loaded paginator configuration"
        );
        Ok(cfg)
    }

    /// Load from a YAML file, overridden by `PAGINATOR__*` environment variables
    /// (`PAGINATOR__LIMIT=50`, `PAGINATOR__HEADERS__TOTAL=X-Count`).
    ///
    /// # Errors
    /// Returns `PaginatorError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let figment = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("PAGINATOR__").split("__"));
        Self::from_figment(&figment, "")
    }
}
