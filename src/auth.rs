use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const ROLE_ADMIN: &str = "admin";

/// Claims carried by the storefront's access tokens. Token issuance lives in
/// the identity service; this crate only verifies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a UUID string
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Verifies bearer tokens against the shared HMAC secret.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    ServiceError::Unauthorized("token has expired".to_string())
                }
                _ => ServiceError::Unauthorized("invalid bearer token".to_string()),
            }
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            ServiceError::Unauthorized("token subject is not a valid user id".to_string())
        })?;

        Ok(AuthUser {
            id: user_id,
            roles: data.claims.roles,
        })
    }
}

/// Verified caller identity, extracted from the `Authorization` header.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtVerifier: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = JwtVerifier::from_ref(state);
        let token = bearer_token(parts)?;
        verifier.verify(token)
    }
}

/// Admin gate. Wraps `AuthUser` and rejects callers without the admin role
/// before the handler body runs.
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtVerifier: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ServiceError::Forbidden("admin role required".to_string()));
        }
        Ok(Self(user))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ServiceError> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ServiceError::Unauthorized("missing Authorization header".to_string()))?;
    let raw = header_value
        .to_str()
        .map_err(|_| ServiceError::Unauthorized("malformed Authorization header".to_string()))?;
    raw.strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("expected a bearer token".to_string()))
}
