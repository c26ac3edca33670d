//! Error type shared by every paginator component.

use thiserror::Error;

use crate::model::RelationKind;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, PaginatorError>;

/// Typed error for paginator construction, planning and execution.
///
/// Configuration problems (`UnknownModel`, `UnknownRelation`,
/// `UnsupportedRelationKind`, `UnsupportedPath`, `UnsupportedOperator`, `Config`)
/// are always reported before the first database round trip.
#[derive(Debug, Error)]
pub enum PaginatorError {
    #[error("model \"{0}\" is not registered")]
    UnknownModel(String),

    #[error("relation \"{relation}\" does not exist in {model}")]
    UnknownRelation { model: String, relation: String },

    #[error("relation \"{relation}\" of kind {kind} is not supported by the paginator")]
    UnsupportedRelationKind {
        relation: String,
        kind: RelationKind,
    },

    #[error("nested relation paths are not supported: {0}")]
    UnsupportedPath(String),

    #[error("unsupported comparison operator: {0}")]
    UnsupportedOperator(String),

    #[error("invalid response target: {0}")]
    InvalidResponseTarget(String),

    #[error("invalid paginator configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("cannot decode query result: {0}")]
    Decode(String),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

impl PaginatorError {
    /// `true` when the error comes from the paginator configuration rather
    /// than from the database or the response target.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownModel(_)
                | Self::UnknownRelation { .. }
                | Self::UnsupportedRelationKind { .. }
                | Self::UnsupportedPath(_)
                | Self::UnsupportedOperator(_)
                | Self::Config(_)
        )
    }
}

impl From<figment::Error> for PaginatorError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}
