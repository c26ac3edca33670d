//! Per-call inputs: filter values and fetch options.

use indexmap::IndexMap;
use sea_orm::Value;

use crate::config::QueryStringNames;
use crate::error::{PaginatorError, Result};

/// Requested filter values keyed by field path, in insertion order.
///
/// Keys that are not listed in the configured `filter_by` are ignored by the
/// paginator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    values: IndexMap<String, Value>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<V: Into<Value>>(mut self, field: &str, value: V) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert<V: Into<Value>>(&mut self, field: &str, value: V) {
        self.values.insert(field.to_owned(), value.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only the listed field paths.
    #[must_use]
    pub fn project(&self, allowed: &[String]) -> Filter {
        let values = self
            .values
            .iter()
            .filter(|(k, _)| allowed.iter().any(|a| a == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Filter { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Filter {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Per-call options.
///
/// `limit` and `offset` are kept in their raw textual form; they are coerced
/// to integers when the call starts and fall back to the configured values
/// when missing or not numeric.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Relations to eager-load into every row of the page.
    pub with_related: Vec<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort_by: Option<String>,
}

impl FetchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_related(mut self, relation: &str) -> Self {
        self.with_related.push(relation.to_owned());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: impl ToString) -> Self {
        self.limit = Some(limit.to_string());
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: impl ToString) -> Self {
        self.offset = Some(offset.to_string());
        self
    }

    #[must_use]
    pub fn sort_by(mut self, sort: &str) -> Self {
        self.sort_by = Some(sort.to_owned());
        self
    }
}

/// A decoded request query string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageRequest {
    pub filter: Filter,
    pub options: FetchOptions,
}

impl PageRequest {
    /// Decode `limit=10&offset=20&sort=-lastname&gender=female`.
    ///
    /// Parameters named by `names` become fetch options, everything else becomes
    /// a string filter value. A repeated parameter keeps its last value.
    ///
    /// # Errors
    /// Returns `PaginatorError::Decode` if the query string is not valid
    /// `application/x-www-form-urlencoded` data.
    pub fn from_query_str(query: &str, names: &QueryStringNames) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| PaginatorError::Decode(format!("query string: {e}")))?;

        let mut request = PageRequest::default();
        for (key, value) in pairs {
            if key == names.limit {
                request.options.limit = Some(value);
            } else if key == names.offset {
                request.options.offset = Some(value);
            } else if key == names.sort {
                request.options.sort_by = Some(value);
            } else {
                request.filter.insert(&key, value);
            }
        }
        Ok(request)
    }
}

/// Largest offset a statement can bind; LIMIT/OFFSET travel as signed 64-bit.
pub(crate) const MAX_OFFSET: u64 = i64::MAX.unsigned_abs();

/// Integer coercion with `parseInt` semantics: optional surrounding whitespace,
/// leading decimal digits, trailing garbage ignored. Anything without leading
/// digits yields `None`; digit runs past `u64::MAX` saturate.
pub(crate) fn parse_leading_u64(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    Some(trimmed[..end].parse().unwrap_or(u64::MAX))
}

/// Clamp a page size to `1..=max`.
pub(crate) fn clamp_limit(limit: u64, max: u64) -> u64 {
    let max = max.clamp(1, MAX_OFFSET);
    limit.clamp(1, max)
}

/// Coerce a raw limit; zero is not a valid page size.
pub(crate) fn coerce_limit(raw: Option<&str>, default: u64, max: u64) -> u64 {
    let limit = raw
        .and_then(parse_leading_u64)
        .filter(|l| *l > 0)
        .unwrap_or(default);
    clamp_limit(limit, max)
}

pub(crate) fn coerce_offset(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(parse_leading_u64)
        .unwrap_or(default)
        .min(MAX_OFFSET)
}
