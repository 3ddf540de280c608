use crate::config::ConfigError;
use crate::connect::ConnectError;
use crate::email::EmailError;
use crate::fields::FieldConfigError;
use crate::pagination::PaginationError;
use crate::scalars::ScalarError;
use crate::store::StoreError;
use crate::walker::WalkError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error(transparent)]
    FieldConfig(#[from] FieldConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error(transparent)]
    Scalar(#[from] ScalarError),
    #[error("schema error: {0}")]
    Schema(String),
}

impl From<async_graphql::dynamic::SchemaError> for Error {
    fn from(e: async_graphql::dynamic::SchemaError) -> Self { Error::Schema(e.0) }
}
