//! Error taxonomy shared by the domain model and the HTTP layer.
//!
//! Every variant here corresponds to one of the typed kinds the workflow
//! service surfaces to callers; `ptero-api` maps each to an HTTP status.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("workflow with name '{0}' already exists")]
    NonUniqueName(String),

    #[error("missing required inputs: {0:?}")]
    MissingInputs(Vec<String>),

    #[error("links target the same (destination, property) more than once: {0:?}")]
    InvalidLinks(Vec<(String, String)>),

    #[error("{kind} {id} was not found")]
    NoSuchEntity { kind: &'static str, id: String },

    #[error("illegal execution state transition: {0}")]
    UpdateError(String),

    #[error("database integrity violation: {0}")]
    UnknownIntegrity(String),
}

impl Error {
    pub fn no_such(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Error::NoSuchEntity {
            kind,
            id: id.to_string(),
        }
    }
}
