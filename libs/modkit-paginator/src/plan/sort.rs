//! Sort token parsing: `lastname`, `-lastname`, `languages.name`.

use sea_orm::sea_query::Order;

use crate::plan::relation::ColumnRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub(crate) fn order(self) -> Order {
        match self {
            SortDir::Asc => Order::Asc,
            SortDir::Desc => Order::Desc,
        }
    }
}

/// Split a sort token into its bare field and direction.
#[must_use]
pub fn parse_sort_token(token: &str) -> (&str, SortDir) {
    let token = token.trim();
    match token.strip_prefix('-') {
        Some(field) => (field, SortDir::Desc),
        None => (token, SortDir::Asc),
    }
}

/// Resolved sort key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub column: ColumnRef,
    pub direction: SortDir,
}
