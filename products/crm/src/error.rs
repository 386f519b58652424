use platform_api::ApiError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

pub type DealResult<T> = Result<T, DealError>;

#[derive(Debug, Error)]
pub enum DealError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("deal {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl DealError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DealError::Validation(message.into())
    }
}

impl From<DealError> for ApiError {
    fn from(err: DealError) -> Self {
        match err {
            DealError::Validation(_) => ApiError::InvalidInput {
                code: "VALIDATION",
                message: err.to_string(),
            },
            DealError::InvalidStatus(_) => ApiError::InvalidInput {
                code: "INVALID_STATUS",
                message: err.to_string(),
            },
            DealError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DealError::Db(source) => ApiError::internal(source.into()),
        }
    }
}
