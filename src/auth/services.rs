use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::LoginRequest, jwt::JwtKeys, password::verify_password},
    error::{AppError, AppResult},
    users::repo::UserStore,
};

/// Credential check and token issuance.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    /// Unknown email and wrong password fail identically.
    #[instrument(skip(self, login), fields(email = %login.email))]
    pub async fn authenticate_user(&self, login: LoginRequest) -> AppResult<String> {
        let Some(user) = self.store.find_by_email(&login.email).await? else {
            warn!("login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let hash = user.password_hash.clone();
        let password = login.password;
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.keys.issue(&user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }
}
