use thiserror::Error;

use crate::{database::DatabaseError, geometry::GeometryError};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("failed to encode segment geometry: {0}")]
    Geometry(#[from] GeometryError),
}

impl From<sqlx::Error> for ConvertError {
    fn from(err: sqlx::Error) -> Self {
        ConvertError::Database(err.into())
    }
}
