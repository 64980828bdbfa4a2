use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use super::token;
use crate::cache::{ProfileCache, SessionCache};
use crate::error::{AppError, Result};
use crate::users::{password::verify_password, UserRecord, UserStore};

/// Credential checks and the session token lifecycle.
///
/// A token is valid while the session cache maps it to a username. Expiry
/// (cache TTL) and logout (delete) both make it look never issued.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionCache,
    profiles: ProfileCache,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: SessionCache, profiles: ProfileCache) -> Self {
        Self {
            users,
            sessions,
            profiles,
        }
    }

    /// Verifies the password and mints a fresh token. Earlier tokens of the
    /// same user stay valid.
    #[instrument(skip(self, raw_password))]
    pub async fn login(&self, username: &str, raw_password: &str) -> Result<(UserRecord, String)> {
        let user = match self.users.find_by_username(username).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(username, "login unknown username");
                return Err(AppError::NotFound);
            }
            Err(e) => {
                error!(error = %e, username, "login find_by_username failed");
                return Err(e.into());
            }
        };

        let ok = verify_password(raw_password, &user.salt, &user.password_hash).map_err(|e| {
            error!(error = %e, username, "login verify_password failed");
            AppError::from(e)
        })?;
        if !ok {
            warn!(username, "login invalid password");
            return Err(AppError::InvalidCredential);
        }

        let token = token::generate(&user.username);
        if let Err(e) = self.sessions.set(&token, &user.username).await {
            error!(error = %e, username, "login set session failed");
            return Err(e.into());
        }

        if let Err(e) = self.profiles.set(&user).await {
            warn!(error = %e, username, "login prime profile cache failed");
        }

        info!(username, "user logged in");
        Ok((user, token))
    }

    /// Resolves `token` to its username. The single authorization check for
    /// every protected operation.
    #[instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> Result<String> {
        match self.sessions.get(token).await {
            Ok(Some(username)) => Ok(username),
            Ok(None) => {
                debug!("token not in session cache");
                Err(AppError::Unauthenticated)
            }
            Err(e) => {
                error!(error = %e, "session cache lookup failed");
                Err(e.into())
            }
        }
    }

    /// Revokes a currently valid token.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<()> {
        let username = self.resolve(token).await?;
        if let Err(e) = self.sessions.del(token).await {
            error!(error = %e, username, "logout delete session failed");
            return Err(e.into());
        }
        info!(username, "user logged out");
        Ok(())
    }
}
