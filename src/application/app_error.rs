use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Daily limit reached")]
    DailyLimitReached,

    #[error("User already has an active subscription")]
    AlreadySubscribed,

    #[error("Not found")]
    NotFound,

    #[error("Upstream provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    InvalidSignature,
    InvalidCredentials,
    InvalidInput,
    DailyLimitReached,
    AlreadySubscribed,
    NotFound,
    ProviderError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::DailyLimitReached => "DAILY_LIMIT_REACHED",
            ErrorCode::AlreadySubscribed => "ALREADY_SUBSCRIBED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::InvalidSignature => ErrorCode::InvalidSignature,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::DailyLimitReached => ErrorCode::DailyLimitReached,
            AppError::AlreadySubscribed => ErrorCode::AlreadySubscribed,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::Provider(_) => ErrorCode::ProviderError,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the webhook sender should retry a delivery that failed with this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Internal(_) | AppError::Provider(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
