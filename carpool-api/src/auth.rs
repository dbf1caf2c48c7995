use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use carpool_core::repository::UserRepository;
use carpool_core::CoreError;
use carpool_shared::{Principal, Role, User};

use crate::error::AppError;
use crate::middleware::issue_token;
use crate::password::{hash_password, verify_password};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub user: User,
}

/// Routes reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

impl RegisterRequest {
    fn validate(&self) -> Result<Role, AppError> {
        let username = self.username.trim().chars().count();
        if !(3..=50).contains(&username) {
            return Err(AppError::validation("Username must be between 3 and 50 characters"));
        }
        let email = self.email.trim();
        if !email.contains('@') || email.chars().count() > 100 {
            return Err(AppError::validation("Email must be a valid address"));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("Password is required"));
        }
        Role::parse(&self.role)
            .ok_or_else(|| AppError::validation("Role must be DRIVER or PASSENGER"))
    }
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let role = req.validate()?;
    let password = req.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)??;
    let user = User::new(
        req.username.trim().to_string(),
        req.email.trim().to_string(),
        password_hash,
        role,
    );
    state.users.create_user(&user).await?;

    info!(user_id = %user.id, %role, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let found = state.users.find_by_username(req.username.trim()).await?;
    let user = match found {
        Some(user) => {
            let password = req.password.clone();
            let stored = user.password_hash.clone();
            let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
                .await
                .map_err(anyhow::Error::from)?;
            verified.then_some(user)
        }
        None => None,
    }
    .ok_or_else(|| {
        warn!(username = %req.username, "login rejected");
        AppError::Authentication("Invalid username or password".to_string())
    })?;

    let token = issue_token(&state.auth, &user.principal())?;
    Ok(Json(AuthResponse {
        token,
        token_type: "Bearer",
        user,
    }))
}

async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<User>, AppError> {
    let user = state
        .users
        .get_user(principal.user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", principal.user_id))?;
    Ok(Json(user))
}
