use auth_identity::IdentityError;
use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use clinical_records::RecordError;
use error_common::codes::{
    authentication, authorization, registration, resource, system, validation,
};
use error_common::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Always `false`
    pub success: bool,
    pub message: String,
    pub error_type: String,
    pub error_code: String,
    /// Correlates the response with the server log line
    pub error_id: String,
}

/// Success envelope: `{ success, message?, data?, count?, token? }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        message: None,
        data: Some(data),
        count: None,
        token: None,
    }
}

/// List payload with `count` set to the number of items
pub fn api_list<T>(items: Vec<T>) -> ApiResponse<Vec<T>> {
    let count = items.len();
    ApiResponse {
        count: Some(count),
        ..api_success(items)
    }
}

pub fn api_message(message: impl Into<String>) -> ApiResponse<()> {
    ApiResponse {
        success: true,
        message: Some(message.into()),
        data: None,
        count: None,
        token: None,
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String },

    /// Body that is not JSON or does not fit the expected shape
    #[error("{message}")]
    MalformedBody { message: String },

    #[error("{message}")]
    DuplicatePrincipal { message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{message}")]
    Unauthorized { message: String, code: &'static str },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String, code: &'static str },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>, code: &'static str) -> Self {
        Self::Unauthorized {
            message: message.into(),
            code,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::internal_with_code(message, system::INTERNAL)
    }

    pub fn internal_with_code(message: impl Into<String>, code: &'static str) -> Self {
        Self::Internal {
            message: message.into(),
            code,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. }
            | ApiError::MalformedBody { .. }
            | ApiError::DuplicatePrincipal { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } | ApiError::MalformedBody { .. } => "validation_error",
            ApiError::DuplicatePrincipal { .. } => "duplicate_principal",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "identifier_collision",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        let code = match self {
            ApiError::Validation { .. } => validation::INVALID_INPUT,
            ApiError::MalformedBody { .. } => validation::MALFORMED_BODY,
            ApiError::DuplicatePrincipal { .. } => registration::DUPLICATE_PRINCIPAL,
            ApiError::InvalidCredentials => authentication::INVALID_CREDENTIALS,
            ApiError::Unauthorized { code, .. } => *code,
            ApiError::Forbidden { .. } => authorization::ROLE_NOT_ALLOWED,
            ApiError::NotFound { .. } => resource::NOT_FOUND,
            ApiError::Conflict { .. } => registration::IDENTIFIER_COLLISION,
            ApiError::Internal { code, .. } => *code,
        };
        ErrorCode::new(code)
    }

    /// Text safe to return to the caller. Internal detail stays in the log.
    fn public_message(&self) -> String {
        match self {
            ApiError::Internal { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                "Request rejected"
            );
        }

        let body = ApiErrorResponse {
            success: false,
            message: self.public_message(),
            error_type: self.error_type().to_string(),
            error_code: self.error_code().to_string(),
            error_id,
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(message) => ApiError::Validation { message },
            IdentityError::DuplicatePrincipal(message) => ApiError::DuplicatePrincipal { message },
            IdentityError::InvalidCredentials => ApiError::InvalidCredentials,
            IdentityError::InvalidToken => {
                ApiError::unauthorized("Invalid or expired token", authentication::TOKEN_INVALID)
            }
            IdentityError::PrincipalNotFound => {
                ApiError::unauthorized("Principal not found", authentication::PRINCIPAL_NOT_FOUND)
            }
            exhausted @ IdentityError::IdentifierExhausted { .. } => {
                ApiError::internal_with_code(exhausted.to_string(), registration::IDENTIFIER_EXHAUSTED)
            }
            store @ IdentityError::Store(_) => {
                ApiError::internal_with_code(store.to_string(), system::STORAGE)
            }
            other @ (IdentityError::Hashing(_) | IdentityError::Token(_)) => {
                ApiError::internal(other.to_string())
            }
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Validation(message) => ApiError::Validation { message },
            RecordError::NotFound(resource) => ApiError::not_found(resource),
            collision @ RecordError::IdentifierCollision { .. } => ApiError::Conflict {
                message: collision.to_string(),
            },
            exhausted @ RecordError::IdentifierExhausted { .. } => {
                ApiError::internal_with_code(exhausted.to_string(), registration::IDENTIFIER_EXHAUSTED)
            }
            store @ RecordError::Store(_) => {
                ApiError::internal_with_code(store.to_string(), system::STORAGE)
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::validation(auth_identity::describe_validation(&errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody {
            message: rejection.body_text(),
        }
    }
}

/// `Json` whose rejection is rendered through [`ApiError`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

pub type ApiResult<T> = Result<T, ApiError>;
