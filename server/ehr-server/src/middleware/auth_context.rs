//! Access gate
//!
//! [`require_auth`] turns a bearer token into an [`AuthContext`] stored in the
//! request extensions. The role guards ([`patients_only`], [`doctors_only`],
//! [`any_principal`]) run after it and compare the resolved role with the
//! route whitelist. Handlers take [`AuthContext`] as an extractor.

use async_trait::async_trait;
use auth_identity::{Doctor, Patient, Principal, Role};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use error_common::codes::authentication;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::EhrServer;

pub const PATIENTS: &[Role] = &[Role::Patient];
pub const DOCTORS: &[Role] = &[Role::Doctor];
pub const ANY_PRINCIPAL: &[Role] = &[Role::Patient, Role::Doctor];

/// The authenticated principal of the current request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,
    pub role: Role,
}

impl AuthContext {
    pub fn new(principal: Principal) -> Self {
        let role = principal.role();
        Self { principal, role }
    }

    pub fn principal_id(&self) -> Uuid {
        self.principal.id()
    }

    pub fn patient(&self) -> Option<&Patient> {
        match &self.principal {
            Principal::Patient(patient) => Some(patient),
            Principal::Doctor(_) => None,
        }
    }

    pub fn doctor(&self) -> Option<&Doctor> {
        match &self.principal {
            Principal::Doctor(doctor) => Some(doctor),
            Principal::Patient(_) => None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required", authentication::TOKEN_MISSING))
    }
}

/// Pull the bearer token out of the `Authorization` header
pub fn extract_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::unauthorized("Missing Authorization header", authentication::TOKEN_MISSING)
        })?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::unauthorized(
                "Invalid Authorization header format. Expected: Bearer <token>",
                authentication::TOKEN_MISSING,
            )
        })
}

/// Verify the token and resolve the principal it names
pub async fn require_auth(
    State(server): State<EhrServer>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())?;

    let verified = server.tokens.verify(token).map_err(|_| {
        ApiError::unauthorized("Invalid or expired token", authentication::TOKEN_INVALID)
    })?;

    let principal = server
        .identity
        .find_principal(verified.role, verified.subject_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                subject_id = %verified.subject_id,
                role = %verified.role,
                "Token names a principal that no longer exists"
            );
            ApiError::unauthorized("Principal not found", authentication::PRINCIPAL_NOT_FOUND)
        })?;

    request.extensions_mut().insert(AuthContext::new(principal));
    Ok(next.run(request).await)
}

/// Reject principals whose role is not in `allowed`
pub async fn require_role(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.role)
        .ok_or_else(|| ApiError::unauthorized("Authentication required", authentication::TOKEN_MISSING))?;

    if !allowed.contains(&role) {
        tracing::warn!(role = %role, path = %request.uri().path(), "Role rejected");
        return Err(ApiError::forbidden(format!(
            "Role '{role}' is not authorized to access this resource"
        )));
    }

    Ok(next.run(request).await)
}

pub async fn patients_only(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(PATIENTS, request, next).await
}

pub async fn doctors_only(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(DOCTORS, request, next).await
}

pub async fn any_principal(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(ANY_PRINCIPAL, request, next).await
}
