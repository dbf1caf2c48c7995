use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carpool_core::{AuthorizationGate, Capability};
use carpool_shared::{Principal, Role};

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    fn principal(&self) -> Option<Principal> {
        let user_id = Uuid::parse_str(&self.sub).ok()?;
        let role = Role::parse(&self.role)?;
        Some(Principal::new(user_id, role))
    }
}

pub fn issue_token(auth: &AuthConfig, principal: &Principal) -> Result<String, AppError> {
    let claims = Claims {
        sub: principal.user_id.to_string(),
        role: principal.role.as_str().to_owned(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::Anyhow(anyhow::anyhow!("Token encoding failed: {}", e)))
}

/// Resolves the bearer token to a [`Principal`] and stores it in the request
/// extensions. Role checks are left to the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))?;

    let principal = token_data
        .claims
        .principal()
        .ok_or_else(|| AppError::Authentication("Malformed token claims".to_string()))?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Rejects callers whose role lacks `capability` before any core call is made.
pub fn require_capability(principal: &Principal, capability: Capability) -> Result<(), AppError> {
    if AuthorizationGate::has_capability(principal, capability) {
        return Ok(());
    }
    tracing::warn!(user_id = %principal.user_id, role = %principal.role, ?capability, "role check failed");
    Err(AppError::forbidden(&format!(
        "Role {} is not allowed to perform this action",
        principal.role
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            secret: "test-secret".into(),
            expiration: 60,
        }
    }

    #[test]
    fn test_issued_token_round_trips_to_principal() {
        let principal = Principal::new(Uuid::new_v4(), Role::Driver);
        let token = issue_token(&config(), &principal).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.role, "DRIVER");
        assert_eq!(data.claims.principal(), Some(principal));
    }

    #[test]
    fn test_claims_with_unknown_role_are_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: "ADMIN".into(),
            exp: 0,
        };
        assert!(claims.principal().is_none());
    }

    #[test]
    fn test_require_capability_by_role() {
        let passenger = Principal::new(Uuid::new_v4(), Role::Passenger);
        assert!(require_capability(&passenger, Capability::RequestBookings).is_ok());
        assert!(matches!(
            require_capability(&passenger, Capability::OfferRides),
            Err(AppError::Core(carpool_core::CoreError::Forbidden(_)))
        ));
    }
}
