use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type LeaveResult<T> = Result<T, LeaveError>;

/// Failures that escape the leave engine.
///
/// Business-rule rejections (insufficient balance, missing balance row) are not
/// errors; they come back as data from the service.
#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("employee {0} not found")]
    EmployeeNotFound(u64),

    #[error("leave request {0} not found")]
    LeaveRequestNotFound(u64),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(String),

    /// A stored value no longer parses into its domain type.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl LeaveError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Storage(_) | Self::Corrupt(_)
        )
    }
}

impl From<strum::ParseError> for LeaveError {
    fn from(e: strum::ParseError) -> Self {
        Self::Corrupt(e.to_string())
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::EmployeeNotFound(_) | Self::LeaveRequestNotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Storage(_) | Self::Corrupt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_internal() {
            tracing::error!(error = %self, "Leave operation failed");
            return HttpResponse::build(self.status_code()).json(json!({
                "message": "Internal Server Error"
            }));
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(
            LeaveError::invalid("days must be positive").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LeaveError::EmployeeNotFound(9).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LeaveError::Storage("lock poisoned".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_stay_out_of_the_response() {
        let resp = LeaveError::Corrupt("bad leave type".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
